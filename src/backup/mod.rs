// Backup snapshots, retention, and portable export bundles
//
// Snapshots and bundles carry raw stored values keyed by alias (APIS,
// SETTINGS, ...). Nothing is decrypted or re-validated on the way in or out.

use crate::config::{storage_key_for_alias, BACKUP_PREFIX, DEFAULT_MAX_BACKUPS, MANAGED_KEYS, SCHEMA_VERSION};
use crate::db::KeyValueStorage;
use crate::utils::{KeydeckError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Point-in-time capture of every managed key that has a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub data: BTreeMap<String, String>,
    pub timestamp: String,
    pub version: String,
}

impl BackupSnapshot {
    /// Parse and shape-check a stored snapshot
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| KeydeckError::validation("backup", format!("not valid JSON ({})", e)))?;
        let data = data_section(&value, "backup")?;

        Ok(Self {
            data,
            timestamp: string_field(&value, &["timestamp"]).unwrap_or_default(),
            version: string_field(&value, &["version"]).unwrap_or_default(),
        })
    }
}

/// File-based export format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub data: BTreeMap<String, String>,
    #[serde(alias = "timestamp")]
    pub export_date: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl ExportBundle {
    /// Parse and shape-check an uploaded bundle; `data` is mandatory
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| KeydeckError::validation("import", format!("not valid JSON ({})", e)))?;
        let data = data_section(&value, "import")?;

        Ok(Self {
            data,
            export_date: string_field(&value, &["exportDate", "timestamp"]).unwrap_or_default(),
            version: string_field(&value, &["version"]).unwrap_or_default(),
            size: value.get("size").and_then(Value::as_u64),
        })
    }
}

pub struct BackupManager {
    storage: Arc<dyn KeyValueStorage>,
    max_backups: usize,
}

impl BackupManager {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }

    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups.max(1);
        self
    }

    pub fn max_backups(&self) -> usize {
        self.max_backups
    }

    /// Snapshot the managed keys under today's backup key, then prune
    ///
    /// A second backup on the same day replaces the first.
    pub fn backup(&self) -> Result<BackupSnapshot> {
        let snapshot = BackupSnapshot {
            data: self.capture()?,
            timestamp: chrono::Utc::now().to_rfc3339(),
            version: SCHEMA_VERSION.to_string(),
        };

        let key = format!("{}{}", BACKUP_PREFIX, chrono::Utc::now().format("%Y-%m-%d"));
        self.storage.set(&key, &serde_json::to_string(&snapshot)?)?;
        log::info!("Backup written to {} ({} key(s))", key, snapshot.data.len());

        self.clean_old_backups()?;
        Ok(snapshot)
    }

    /// Write the snapshot's values back verbatim; returns how many were written
    pub fn restore(&self, snapshot: &BackupSnapshot) -> Result<usize> {
        let written = self.replay(&snapshot.data)?;
        log::info!("Restored {} key(s) from backup taken {}", written, snapshot.timestamp);
        Ok(written)
    }

    /// Delete the oldest backups beyond the retention cap
    pub fn clean_old_backups(&self) -> Result<Vec<String>> {
        let keys = self.list_backups()?;
        if keys.len() <= self.max_backups {
            return Ok(Vec::new());
        }

        let excess = keys.len() - self.max_backups;
        let mut removed = Vec::with_capacity(excess);
        for key in keys.into_iter().take(excess) {
            self.storage.remove(&key)?;
            log::debug!("Removed old backup {}", key);
            removed.push(key);
        }
        Ok(removed)
    }

    /// Backup keys, oldest first
    pub fn list_backups(&self) -> Result<Vec<String>> {
        let mut keys = self.storage.list_keys_with_prefix(BACKUP_PREFIX)?;
        keys.sort();
        Ok(keys)
    }

    /// Read one backup by its full key or by its date suffix
    pub fn load_backup(&self, key_or_date: &str) -> Result<BackupSnapshot> {
        let key = if key_or_date.starts_with(BACKUP_PREFIX) {
            key_or_date.to_string()
        } else {
            format!("{}{}", BACKUP_PREFIX, key_or_date)
        };

        let raw = self
            .storage
            .get(&key)?
            .ok_or_else(|| KeydeckError::InvalidArgument(format!("No backup named {}", key)))?;
        BackupSnapshot::from_json(&raw)
    }

    /// Bundle every managed key for download
    pub fn export(&self) -> Result<ExportBundle> {
        let data = self.capture()?;
        let size = data.values().map(|v| v.len() as u64).sum();
        Ok(ExportBundle {
            data,
            export_date: chrono::Utc::now().to_rfc3339(),
            version: SCHEMA_VERSION.to_string(),
            size: Some(size),
        })
    }

    pub fn import(&self, bundle: &ExportBundle) -> Result<usize> {
        let written = self.replay(&bundle.data)?;
        log::info!("Imported {} key(s) (bundle version {})", written, bundle.version);
        Ok(written)
    }

    /// Write `ai-api-backup-{date}.json` into `dir`
    pub fn export_to_file(&self, dir: &Path) -> Result<PathBuf> {
        let bundle = self.export()?;
        fs::create_dir_all(dir)?;

        let path = dir.join(format!(
            "ai-api-backup-{}.json",
            chrono::Local::now().format("%Y-%m-%d")
        ));
        fs::write(&path, serde_json::to_string_pretty(&bundle)?)?;
        Ok(path)
    }

    pub fn import_from_file(&self, path: &Path) -> Result<usize> {
        let raw = fs::read_to_string(path)?;
        let bundle = ExportBundle::from_json(&raw)?;
        self.import(&bundle)
    }

    /// Total bytes held by the managed keys
    pub fn storage_size(&self) -> Result<usize> {
        Ok(self.capture()?.values().map(String::len).sum())
    }

    /// Remove every managed key; backups stay
    pub fn clear_managed(&self) -> Result<usize> {
        let mut removed = 0;
        for (_, key) in MANAGED_KEYS {
            if self.storage.remove(key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn capture(&self) -> Result<BTreeMap<String, String>> {
        let mut data = BTreeMap::new();
        for (alias, key) in MANAGED_KEYS {
            if let Some(value) = self.storage.get(key)? {
                data.insert(alias.to_string(), value);
            }
        }
        Ok(data)
    }

    fn replay(&self, data: &BTreeMap<String, String>) -> Result<usize> {
        let mut written = 0;
        for (alias, value) in data {
            match storage_key_for_alias(alias) {
                Some(key) => {
                    self.storage.set(key, value)?;
                    written += 1;
                }
                None => log::warn!("Skipping unknown key {} during restore", alias),
            }
        }
        Ok(written)
    }
}

fn data_section(value: &Value, field: &str) -> Result<BTreeMap<String, String>> {
    let Some(data) = value.get("data").and_then(Value::as_object) else {
        return Err(KeydeckError::validation(field, "missing data object"));
    };

    data.iter()
        .map(|(alias, raw)| match raw.as_str() {
            Some(s) => Ok((alias.clone(), s.to_string())),
            None => Err(KeydeckError::validation(
                field,
                format!("value for {} is not a string", alias),
            )),
        })
        .collect()
}

fn string_field(value: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| value.get(*name).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{APIS_KEY, SETTINGS_KEY};
    use crate::db::MemoryStorage;
    use crate::secrets::testing::{draft, test_codec, StubTransport};
    use crate::secrets::CredentialStore;
    use pretty_assertions::assert_eq;

    fn manager() -> (Arc<MemoryStorage>, BackupManager) {
        let storage = Arc::new(MemoryStorage::new());
        (storage.clone(), BackupManager::new(storage))
    }

    #[test]
    fn test_restore_recovers_corrupted_store() {
        let storage = Arc::new(MemoryStorage::new());
        let store = CredentialStore::new(storage.clone(), test_codec(), Arc::new(StubTransport::ok()));
        store.add(draft("A", "https://a", "k1")).unwrap();
        store.add(draft("B", "https://b", "k2")).unwrap();
        let before = store.records().unwrap();

        let backups = BackupManager::new(storage.clone());
        let snapshot = backups.backup().unwrap();
        storage.set(APIS_KEY, "garbage").unwrap();

        let report = store.load().unwrap();
        assert_eq!(report.count, 0);
        assert!(report.warning.is_some());

        backups.restore(&snapshot).unwrap();
        let report = store.load().unwrap();

        assert_eq!(report.warning, None);
        assert_eq!(store.records().unwrap(), before);
    }

    #[test]
    fn test_backup_captures_only_present_keys() {
        let (storage, backups) = manager();
        storage.set(SETTINGS_KEY, r#"{"theme":"dark"}"#).unwrap();

        let snapshot = backups.backup().unwrap();

        assert_eq!(snapshot.version, SCHEMA_VERSION);
        assert_eq!(snapshot.data.len(), 1);
        assert_eq!(snapshot.data["SETTINGS"], r#"{"theme":"dark"}"#);

        let keys = backups.list_backups().unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(backups.load_backup(&keys[0]).unwrap(), snapshot);
    }

    #[test]
    fn test_retention_keeps_newest() {
        let (storage, backups) = manager();
        let backups = backups.with_max_backups(3);
        for day in 1..=5 {
            storage
                .set(
                    &format!("{}2024-01-0{}", BACKUP_PREFIX, day),
                    r#"{"data":{},"timestamp":"","version":"2.0.0"}"#,
                )
                .unwrap();
        }

        let removed = backups.clean_old_backups().unwrap();

        assert_eq!(removed, vec!["ai-backup-2024-01-01", "ai-backup-2024-01-02"]);
        assert_eq!(
            backups.list_backups().unwrap(),
            vec!["ai-backup-2024-01-03", "ai-backup-2024-01-04", "ai-backup-2024-01-05"]
        );
        assert!(backups.load_backup("2024-01-05").is_ok());
    }

    #[test]
    fn test_restore_skips_unknown_aliases() {
        let (storage, backups) = manager();
        let snapshot = BackupSnapshot {
            data: BTreeMap::from([
                ("THEME".to_string(), "dark".to_string()),
                ("LEGACY".to_string(), "x".to_string()),
            ]),
            timestamp: String::new(),
            version: SCHEMA_VERSION.to_string(),
        };

        assert_eq!(backups.restore(&snapshot).unwrap(), 1);
        assert_eq!(storage.get("ai-theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(storage.get("LEGACY").unwrap(), None);
    }

    #[test]
    fn test_bundle_shape_is_checked() {
        assert!(matches!(
            ExportBundle::from_json(r#"{"version":"2.0.0"}"#),
            Err(KeydeckError::Validation { .. })
        ));
        assert!(matches!(
            ExportBundle::from_json(r#"{"data":{"APIS":42}}"#),
            Err(KeydeckError::Validation { .. })
        ));
        assert!(ExportBundle::from_json("not json").is_err());

        let bundle = ExportBundle::from_json(
            r#"{"data":{"APIS":"abc"},"timestamp":"2024-01-01T00:00:00Z","version":"1.0.0"}"#,
        )
        .unwrap();
        assert_eq!(bundle.export_date, "2024-01-01T00:00:00Z");
        assert_eq!(bundle.size, None);
    }

    #[test]
    fn test_export_import_through_file() {
        let (storage, backups) = manager();
        storage.set(APIS_KEY, "sealed").unwrap();
        storage.set(SETTINGS_KEY, "{}").unwrap();
        let dir = tempfile::tempdir().unwrap();

        let path = backups.export_to_file(dir.path()).unwrap();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("ai-api-backup-"));

        assert_eq!(backups.clear_managed().unwrap(), 2);
        assert_eq!(backups.storage_size().unwrap(), 0);

        let (other, target) = manager();
        assert_eq!(target.import_from_file(&path).unwrap(), 2);
        assert_eq!(other.get(APIS_KEY).unwrap().as_deref(), Some("sealed"));
        assert_eq!(target.storage_size().unwrap(), "sealed".len() + 2);
    }

    #[test]
    fn test_clear_leaves_backups() {
        let (storage, backups) = manager();
        storage.set(APIS_KEY, "sealed").unwrap();
        backups.backup().unwrap();

        backups.clear_managed().unwrap();

        assert_eq!(storage.get(APIS_KEY).unwrap(), None);
        assert_eq!(backups.list_backups().unwrap().len(), 1);
    }
}
