// Persistent key-value storage
//
// Everything above this layer sees a flat string -> string store. The SQLite
// table is the durable medium; MemoryStorage backs tests and dry runs.

use crate::utils::{KeydeckError, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Flat key-value medium
///
/// `set` must either store the value or return `StorageWrite`; it never
/// drops data silently.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Returns whether a value was removed
    fn remove(&self, key: &str) -> Result<bool>;

    /// Keys starting with `prefix`, in ascending order
    fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

/// SQLite-backed storage
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
    quota_bytes: Option<usize>,
}

impl SqliteStorage {
    /// Open (or create) the database file
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
            quota_bytes: None,
        };
        storage.init_schema()?;

        Ok(storage)
    }

    pub fn open_in_memory() -> Result<Self> {
        let storage = Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
            path: None,
            quota_bytes: None,
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Reject writes that would push the stored payload above `bytes`
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| KeydeckError::Unknown(e.to_string()))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        if self.path.is_some() {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }

        conn.execute(
            "CREATE TABLE IF NOT EXISTS storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }
}

impl KeyValueStorage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM storage WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;

        if let Some(quota) = self.quota_bytes {
            let others: i64 = conn
                .query_row(
                    "SELECT COALESCE(SUM(LENGTH(CAST(value AS BLOB))), 0) FROM storage WHERE key != ?1",
                    params![key],
                    |row| row.get(0),
                )
                .map_err(|e| KeydeckError::StorageWrite(e.to_string()))?;
            let projected = others.max(0) as usize + value.len();
            if projected > quota {
                return Err(KeydeckError::StorageWrite(format!(
                    "quota exceeded writing '{}' ({} of {} bytes)",
                    key, projected, quota
                )));
            }
        }

        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR REPLACE INTO storage (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, now],
        )
        .map_err(|e| KeydeckError::StorageWrite(e.to_string()))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let conn = self.lock()?;
        let rows_affected = conn.execute("DELETE FROM storage WHERE key = ?1", params![key])?;
        Ok(rows_affected > 0)
    }

    fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT key FROM storage WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )?;

        let key_iter = stmt.query_map(params![prefix], |row| row.get(0))?;

        let mut keys = Vec::new();
        for key in key_iter {
            keys.push(key?);
        }

        Ok(keys)
    }
}

/// In-memory storage
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
    quota_bytes: Mutex<Option<usize>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the byte quota; `None` removes it
    pub fn set_quota(&self, bytes: Option<usize>) {
        if let Ok(mut quota) = self.quota_bytes.lock() {
            *quota = bytes;
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| KeydeckError::Unknown(e.to_string()))
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let quota = *self
            .quota_bytes
            .lock()
            .map_err(|e| KeydeckError::Unknown(e.to_string()))?;
        let mut entries = self.lock()?;

        if let Some(quota) = quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            if others + value.len() > quota {
                return Err(KeydeckError::StorageWrite(format!(
                    "quota exceeded writing '{}'",
                    key
                )));
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.lock()?.remove(key).is_some())
    }

    fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .lock()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Open the on-disk storage at `path`
pub fn open_storage(path: &Path) -> Result<Arc<dyn KeyValueStorage>> {
    Ok(Arc::new(SqliteStorage::open(path)?))
}
