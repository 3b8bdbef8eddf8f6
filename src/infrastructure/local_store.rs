use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Well-known keys persisted by the client. The `technozlife:` prefix matches
/// the namespace the hosted web dashboard uses, so exported data stays
/// interchangeable.
pub mod keys {
    pub const MOCK_SEED: &str = "technozlife:mockSeed";
    pub const DEVICES: &str = "technozlife:devices";
    pub const HABITS: &str = "technozlife:habits";
    pub const HABIT_ENTRIES: &str = "technozlife:habitEntries";
    pub const AI_JOBS: &str = "technozlife:aiJobs";
    pub const COOKIE_CONSENT: &str = "cookie_consent";
}

/// Key-value client storage. Every read/write is synchronous and atomic at
/// the call level.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, InfraError>;
    fn put(&self, key: &str, value: &str) -> Result<(), InfraError>;
    fn remove(&self, key: &str) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteLocalStore {
    db_path: PathBuf,
}

impl SqliteLocalStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }

    fn normalized_key(key: &str) -> Result<&str, InfraError> {
        let normalized = key.trim();
        if normalized.is_empty() {
            return Err(InfraError::InvalidConfig(
                "storage key must not be empty".to_string(),
            ));
        }
        Ok(normalized)
    }
}

impl LocalStore for SqliteLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let key = Self::normalized_key(key)?;
        let connection = self.connect()?;
        let value: Option<String> = connection
            .query_row(
                "SELECT value FROM local_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let key = Self::normalized_key(key)?;
        let now: DateTime<Utc> = Utc::now();
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO local_store (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value, now.to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), InfraError> {
        let key = Self::normalized_key(key)?;
        let connection = self.connect()?;
        connection.execute("DELETE FROM local_store WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryLocalStore {
    entries: Mutex<HashMap<String, String>>,
}

impl LocalStore for InMemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let entries = self
            .entries
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("local store lock poisoned: {error}")))?;
        Ok(entries.get(key.trim()).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("local store lock poisoned: {error}")))?;
        entries.insert(key.trim().to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), InfraError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("local store lock poisoned: {error}")))?;
        entries.remove(key.trim());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::initialize_database;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_DB: AtomicUsize = AtomicUsize::new(0);

    struct TempDatabase {
        path: PathBuf,
    }

    impl TempDatabase {
        fn new() -> Self {
            let sequence = NEXT_TEMP_DB.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "technozlife-store-tests-{}-{}.sqlite",
                std::process::id(),
                sequence
            ));
            initialize_database(&path).expect("initialize test database");
            Self { path }
        }
    }

    impl Drop for TempDatabase {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    #[test]
    fn sqlite_store_roundtrips_and_overwrites() {
        let database = TempDatabase::new();
        let store = SqliteLocalStore::new(&database.path);

        assert!(store.get(keys::MOCK_SEED).expect("read empty").is_none());
        store.put(keys::MOCK_SEED, "{\"days\":28}").expect("write seed");
        assert_eq!(
            store.get(keys::MOCK_SEED).expect("read seed").as_deref(),
            Some("{\"days\":28}")
        );

        store.put(keys::MOCK_SEED, "{\"days\":7}").expect("overwrite seed");
        assert_eq!(
            store.get(keys::MOCK_SEED).expect("read overwritten").as_deref(),
            Some("{\"days\":7}")
        );

        store.remove(keys::MOCK_SEED).expect("remove seed");
        assert!(store.get(keys::MOCK_SEED).expect("read removed").is_none());
    }

    #[test]
    fn sqlite_store_rejects_blank_key() {
        let database = TempDatabase::new();
        let store = SqliteLocalStore::new(&database.path);
        assert!(store.put("  ", "value").is_err());
    }

    #[test]
    fn in_memory_store_roundtrips() {
        let store = InMemoryLocalStore::default();
        store.put(keys::COOKIE_CONSENT, "accepted").expect("write consent");
        assert_eq!(
            store.get(keys::COOKIE_CONSENT).expect("read consent").as_deref(),
            Some("accepted")
        );
        store.remove(keys::COOKIE_CONSENT).expect("remove consent");
        assert!(store.get(keys::COOKIE_CONSENT).expect("read removed").is_none());
    }
}
