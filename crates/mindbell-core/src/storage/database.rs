//! SQLite-backed key-value store.
//!
//! Holds the single persisted wakeup record. Values are stored as text so the
//! table can carry other small bits of state without a schema change.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use super::data_dir;
use crate::error::{DatabaseError, Result};
use crate::wakeup::KeyValueStore;

/// SQLite database for the key-value store.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/mindbell.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("mindbell.db");
        Self::open_at(&path)
    }

    /// Open the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a key. Removing an absent key is not an error.
    pub fn kv_delete(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

// Backend failures are logged and degrade to the store's sentinel values.
impl KeyValueStore for Database {
    fn write_int(&mut self, key: &str, value: i64) {
        if let Err(e) = self.kv_set(key, &value.to_string()) {
            warn!(key, value, error = %e, "kv write failed");
        }
    }

    fn read_int(&self, key: &str) -> i64 {
        match self.kv_get(key) {
            Ok(Some(raw)) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(key, raw = %raw, "kv value is not an integer; treating as absent");
                0
            }),
            Ok(None) => 0,
            Err(e) => {
                warn!(key, error = %e, "kv read failed; treating as absent");
                0
            }
        }
    }

    fn delete(&mut self, key: &str) {
        if let Err(e) = self.kv_delete(key) {
            warn!(key, error = %e, "kv delete failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_delete("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn int_slot_follows_leaf_contract() {
        let mut db = Database::open_memory().unwrap();
        assert_eq!(db.read_int("wakeup_id"), 0);
        db.write_int("wakeup_id", 42);
        assert_eq!(db.read_int("wakeup_id"), 42);
        db.delete("wakeup_id");
        db.delete("wakeup_id");
        assert_eq!(db.read_int("wakeup_id"), 0);
    }

    #[test]
    fn garbage_value_reads_as_absent() {
        let db = Database::open_memory().unwrap();
        db.kv_set("wakeup_id", "not-a-number").unwrap();
        assert_eq!(db.read_int("wakeup_id"), 0);
    }

    #[test]
    fn record_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mindbell.db");
        {
            let mut db = Database::open_at(&path).unwrap();
            db.write_int("wakeup_id", 9);
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.read_int("wakeup_id"), 9);
    }
}
