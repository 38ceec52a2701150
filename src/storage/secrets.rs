//! Secret store
//!
//! Stores credentials in a SQLite database (secrets.db in the data dir),
//! one row per named secret. Values are stored as given; encryption is the
//! host's concern.

use crate::config::Config;
use crate::errors::PersistenceError;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};

/// File name of the secret database inside the data directory
pub const SECRETS_DB: &str = "secrets.db";

/// Durable key -> value table with upsert semantics
pub struct SecretStore {
    path: Option<PathBuf>,
    conn: Connection,
}

impl SecretStore {
    /// Open (or create) the secret database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path).map_err(|source| PersistenceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Opened secret store at {}", path.display());

        Self::init(Some(path.to_path_buf()), conn)
    }

    /// Open an existing secret database without write access
    ///
    /// Reads work as usual; `put` and `delete` fail with a
    /// `PersistenceError`.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|source| PersistenceError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!("Opened secret store read-only at {}", path.display());

        Ok(Self {
            path: Some(path.to_path_buf()),
            conn,
        })
    }

    /// Open `secrets.db` inside a data directory
    pub fn open_in(data_dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        Self::open(data_dir.as_ref().join(SECRETS_DB))
    }

    /// Open the store in the configured data directory
    pub fn open_default(config: &Config) -> anyhow::Result<Self> {
        let data_dir = config.data_dir()?;
        Ok(Self::open_in(data_dir)?)
    }

    /// Open the configured store for lookups only
    ///
    /// A database that does not exist yet is created writable.
    pub fn open_default_read_only(config: &Config) -> anyhow::Result<Self> {
        let path = config.data_dir()?.join(SECRETS_DB);
        if path.exists() {
            Ok(Self::open_read_only(path)?)
        } else {
            Ok(Self::open(path)?)
        }
    }

    /// Open a private in-memory store
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory().map_err(|source| PersistenceError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::init(None, conn)
    }

    fn init(path: Option<PathBuf>, conn: Connection) -> Result<Self, PersistenceError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS secrets (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT
            )",
            [],
        )?;
        Ok(Self { path, conn })
    }

    /// Path of the backing database, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Look up a secret; a missing key is not an error
    pub fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let value: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT value FROM secrets WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.flatten())
    }

    /// Insert or replace a secret
    ///
    /// Runs in autocommit mode, so the value is durable once this returns.
    pub fn put(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT INTO secrets (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        tracing::debug!("Stored secret '{}'", key);
        Ok(())
    }

    /// Remove a secret; returns whether a row existed
    pub fn delete(&self, key: &str) -> Result<bool, PersistenceError> {
        let removed = self
            .conn
            .execute("DELETE FROM secrets WHERE key = ?1", params![key])?;
        if removed > 0 {
            tracing::debug!("Deleted secret '{}'", key);
        }
        Ok(removed > 0)
    }

    /// All stored keys, sorted
    pub fn keys(&self) -> Result<Vec<String>, PersistenceError> {
        let mut stmt = self.conn.prepare("SELECT key FROM secrets ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<String>, _>>()?)
    }
}

impl std::fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_key() {
        let store = SecretStore::open_in_memory().unwrap();
        assert_eq!(store.get("GEMINI_API_KEY").unwrap(), None);
    }

    #[test]
    fn test_put_is_upsert() {
        let store = SecretStore::open_in_memory().unwrap();
        store.put("K", "v1").unwrap();
        store.put("K", "v2").unwrap();

        assert_eq!(store.get("K").unwrap().as_deref(), Some("v2"));
        assert_eq!(store.keys().unwrap(), vec!["K".to_string()]);
    }

    #[test]
    fn test_delete() {
        let store = SecretStore::open_in_memory().unwrap();
        store.put("K", "v").unwrap();
        assert!(store.delete("K").unwrap());
        assert!(!store.delete("K").unwrap());
        assert_eq!(store.get("K").unwrap(), None);
    }

    #[test]
    fn test_reopen_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SECRETS_DB);

        {
            let store = SecretStore::open(&path).unwrap();
            store.put("A_API_KEY", "a1").unwrap();
        }

        // Schema creation is idempotent across opens
        let store = SecretStore::open(&path).unwrap();
        assert_eq!(store.get("A_API_KEY").unwrap().as_deref(), Some("a1"));
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[test]
    fn test_read_only_store_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SECRETS_DB);
        SecretStore::open(&path).unwrap().put("K", "v").unwrap();

        let store = SecretStore::open_read_only(&path).unwrap();
        assert_eq!(store.get("K").unwrap().as_deref(), Some("v"));
        assert!(matches!(store.put("K", "w"), Err(PersistenceError::Query(_))));
        assert!(matches!(store.delete("K"), Err(PersistenceError::Query(_))));
        assert_eq!(store.get("K").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_read_only_open_of_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = SecretStore::open_read_only(dir.path().join(SECRETS_DB)).unwrap_err();
        assert!(matches!(err, PersistenceError::Open { .. }));
    }

    #[test]
    fn test_null_value_reads_as_absent() {
        let store = SecretStore::open_in_memory().unwrap();
        store
            .conn
            .execute("INSERT INTO secrets (key, value) VALUES ('K', NULL)", [])
            .unwrap();
        assert_eq!(store.get("K").unwrap(), None);
    }
}
