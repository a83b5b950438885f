// Configuration: storage layout, user settings and process environment

use crate::db::KeyValueStorage;
use crate::utils::{KeydeckError, Result, DEFAULT_PASSPHRASE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

/// Encrypted credential array
pub const APIS_KEY: &str = "ai-apis-encrypted";
/// Plaintext settings JSON
pub const SETTINGS_KEY: &str = "ai-settings";
pub const THEME_KEY: &str = "ai-theme";
pub const USER_PREFERENCES_KEY: &str = "ai-user-preferences";

/// Prefix of dated backup snapshots (`ai-backup-YYYY-MM-DD`)
pub const BACKUP_PREFIX: &str = "ai-backup-";

/// Format version written into snapshots and bundles
pub const SCHEMA_VERSION: &str = "2.0.0";

/// Managed keys with the alias used inside snapshots and bundles
pub const MANAGED_KEYS: [(&str, &str); 4] = [
    ("APIS", APIS_KEY),
    ("SETTINGS", SETTINGS_KEY),
    ("THEME", THEME_KEY),
    ("USER_PREFERENCES", USER_PREFERENCES_KEY),
];

/// Resolve a snapshot alias to its storage key
pub fn storage_key_for_alias(alias: &str) -> Option<&'static str> {
    MANAGED_KEYS
        .iter()
        .find(|(a, _)| *a == alias)
        .map(|(_, key)| *key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_MAX_BACKUPS: usize = 10;

/// User settings, persisted in plaintext under [`SETTINGS_KEY`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub theme: Theme,
    pub sync_enabled: bool,
    #[serde(rename = "syncInterval")]
    pub sync_interval_secs: u64,
    pub auto_save: bool,
    pub max_backups: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            sync_enabled: false,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            auto_save: true,
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }
}

impl Settings {
    /// Read settings field by field; anything unusable keeps its default
    pub fn from_value(value: &Value) -> Self {
        let mut settings = Settings::default();
        let Some(map) = value.as_object() else {
            return settings;
        };

        if let Some(theme) = map.get("theme").and_then(Value::as_str).and_then(Theme::parse) {
            settings.theme = theme;
        }
        if let Some(enabled) = map.get("syncEnabled").and_then(Value::as_bool) {
            settings.sync_enabled = enabled;
        }
        if let Some(secs) = positive_u64(map, &["syncInterval", "syncIntervalSeconds"]) {
            settings.sync_interval_secs = secs;
        }
        if let Some(auto_save) = map.get("autoSave").and_then(Value::as_bool) {
            settings.auto_save = auto_save;
        }
        if let Some(max) = positive_u64(map, &["maxBackups"]) {
            settings.max_backups = max as usize;
        }

        settings
    }

    /// Load from storage; a missing or unreadable entry yields defaults
    pub fn load(storage: &dyn KeyValueStorage) -> Result<Self> {
        let Some(raw) = storage.get(SETTINGS_KEY)? else {
            return Ok(Settings::default());
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => Ok(Settings::from_value(&value)),
            Err(e) => {
                log::warn!("Settings are not valid JSON, using defaults: {}", e);
                Ok(Settings::default())
            }
        }
    }

    pub fn save(&self, storage: &dyn KeyValueStorage) -> Result<()> {
        let raw = serde_json::to_string(self)?;
        storage.set(SETTINGS_KEY, &raw)
    }

    /// Apply one `key = value` pair coming from the command line
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "theme" => {
                self.theme = Theme::parse(value)
                    .ok_or_else(|| KeydeckError::validation("theme", "expected light or dark"))?;
            }
            "syncEnabled" => self.sync_enabled = parse_bool("syncEnabled", value)?,
            "syncInterval" | "syncIntervalSeconds" => {
                self.sync_interval_secs = parse_positive("syncInterval", value)?;
            }
            "autoSave" => self.auto_save = parse_bool("autoSave", value)?,
            "maxBackups" => self.max_backups = parse_positive("maxBackups", value)? as usize,
            other => {
                return Err(KeydeckError::InvalidArgument(format!(
                    "Unknown setting: {}. Available: theme, syncEnabled, syncInterval, autoSave, maxBackups",
                    other
                )))
            }
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    /// Settings as `(key, value)` display pairs
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("theme", format!("{:?}", self.theme).to_lowercase()),
            ("syncEnabled", self.sync_enabled.to_string()),
            ("syncInterval", self.sync_interval_secs.to_string()),
            ("autoSave", self.auto_save.to_string()),
            ("maxBackups", self.max_backups.to_string()),
        ]
    }
}

fn positive_u64(map: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find_map(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .filter(|n| *n > 0)
}

fn parse_bool(field: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(KeydeckError::validation(field, "expected true or false")),
    }
}

fn parse_positive(field: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| KeydeckError::validation(field, "expected a positive integer"))
}

/// Process-level configuration read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub passphrase: String,
    pub db_path: PathBuf,
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let passphrase = std::env::var("KEYDECK_ENCRYPTION_KEY")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_PASSPHRASE.to_string());

        let db_path = std::env::var("KEYDECK_DB")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let http_timeout = std::env::var("KEYDECK_HTTP_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Self {
            passphrase,
            db_path,
            http_timeout,
        }
    }
}

/// Database directory and file paths
pub fn db_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".keydeck")
}

pub fn default_db_path() -> PathBuf {
    db_dir().join("keydeck.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStorage;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let settings = Settings::from_value(&json!({ "theme": "dark" }));
        assert_eq!(
            settings,
            Settings {
                theme: Theme::Dark,
                ..Settings::default()
            }
        );
    }

    #[test]
    fn test_unknown_and_invalid_values_are_ignored() {
        let settings = Settings::from_value(&json!({
            "theme": "neon",
            "syncEnabled": "maybe",
            "syncInterval": 0,
            "maxBackups": -3,
            "fontSize": 14
        }));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_interval_alias_is_accepted() {
        let settings = Settings::from_value(&json!({ "syncIntervalSeconds": 45, "syncEnabled": true }));
        assert_eq!(settings.sync_interval_secs, 45);
        assert!(settings.sync_enabled);
    }

    #[test]
    fn test_load_save_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(Settings::load(&storage).unwrap(), Settings::default());

        let mut settings = Settings::default();
        settings.set("maxBackups", "3").unwrap();
        settings.set("syncEnabled", "true").unwrap();
        settings.save(&storage).unwrap();

        let raw = storage.get(SETTINGS_KEY).unwrap().unwrap();
        assert!(raw.contains("\"syncInterval\":30"));
        assert_eq!(Settings::load(&storage).unwrap(), settings);
    }

    #[test]
    fn test_corrupt_settings_load_defaults() {
        let storage = MemoryStorage::new();
        storage.set(SETTINGS_KEY, "{not json").unwrap();
        assert_eq!(Settings::load(&storage).unwrap(), Settings::default());
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.set("maxBackups", "0"),
            Err(KeydeckError::Validation { .. })
        ));
        assert!(matches!(
            settings.set("theme", "blue"),
            Err(KeydeckError::Validation { .. })
        ));
        assert!(matches!(
            settings.set("colour", "red"),
            Err(KeydeckError::InvalidArgument(_))
        ));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_alias_lookup() {
        assert_eq!(storage_key_for_alias("APIS"), Some(APIS_KEY));
        assert_eq!(storage_key_for_alias("apis"), None);
    }
}
