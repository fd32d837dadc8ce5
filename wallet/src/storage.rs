//! Persisted Local State
//!
//! A small key-value port the keystore and ledger write through. Values are
//! JSON documents stored under fixed well-known keys:
//! - `accounts`: encrypted account records
//! - `transactions`: the active transaction list
//! - `deletedTransactions`: soft-deleted transactions
//!
//! [`FileStore`] keeps one file per key in the wallet data directory;
//! [`MemoryStore`] is the in-process substitute used by tests.

use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};
use tracing::debug;

use crate::error::{Result, WalletError};

/// Key holding the account list.
pub const ACCOUNTS_KEY: &str = "accounts";

/// Key holding the active transaction list.
pub const TRANSACTIONS_KEY: &str = "transactions";

/// Key holding the deleted transaction list.
pub const DELETED_TRANSACTIONS_KEY: &str = "deletedTransactions";

/// Key holding transfers submitted but not yet recorded.
pub const SUBMITTED_TRANSACTIONS_KEY: &str = "submittedTransactions";

/// Key-value storage port.
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// All keys currently holding a value.
    fn list_keys(&self) -> Result<Vec<String>>;
}

/// Load a JSON list stored under `key`; a missing key is an empty list.
pub fn load_list<T: DeserializeOwned>(store: &dyn Storage, key: &str) -> Result<Vec<T>> {
    match store.get(key)? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}

/// Store `items` as a JSON list under `key`.
pub fn save_list<T: Serialize>(store: &dyn Storage, key: &str, items: &[T]) -> Result<()> {
    let json = serde_json::to_string(items)?;
    store.put(key, &json)
}

/// Volatile storage backed by a map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| WalletError::Storage("memory store poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| WalletError::Storage("memory store poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| WalletError::Storage("memory store poisoned".to_string()))?;
        Ok(entries.keys().cloned().collect())
    }
}

/// Durable storage: one `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Directory holding the store's files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(WalletError::Storage(format!("Invalid storage key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl Storage for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| WalletError::Storage(format!("Failed to read {}: {}", path.display(), e)))?;
        Ok(Some(content))
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;

        // Write to temp file first, then rename over the old value
        let temp_path = path.with_extension("tmp");

        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&temp_path)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&temp_path, value)?;
        }

        fs::rename(&temp_path, &path)?;
        debug!("Saved {} ({} bytes)", key, value.len());
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("accounts").unwrap(), None);

        store.put("accounts", "[]").unwrap();
        store.put("transactions", "[1]").unwrap();
        assert_eq!(store.get("accounts").unwrap().as_deref(), Some("[]"));
        assert_eq!(store.list_keys().unwrap(), vec!["accounts", "transactions"]);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("wallet");

        {
            let store = FileStore::open(&data_dir).unwrap();
            save_list(&store, TRANSACTIONS_KEY, &["a".to_string(), "b".to_string()]).unwrap();
        }

        let reopened = FileStore::open(&data_dir).unwrap();
        let items: Vec<String> = load_list(&reopened, TRANSACTIONS_KEY).unwrap();
        assert_eq!(items, vec!["a", "b"]);
        assert_eq!(reopened.list_keys().unwrap(), vec![TRANSACTIONS_KEY]);
        assert!(!data_dir.join("transactions.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        store.put(ACCOUNTS_KEY, "[]").unwrap();

        let mode = fs::metadata(temp_dir.path().join("accounts.json"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        assert!(store.put("../escape", "x").is_err());
        assert!(store.get("").is_err());
    }

    #[test]
    fn test_missing_list_is_empty() {
        let store = MemoryStore::new();
        let items: Vec<u32> = load_list(&store, DELETED_TRANSACTIONS_KEY).unwrap();
        assert!(items.is_empty());
    }
}
