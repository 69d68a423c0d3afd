//! Key-value persistence for the wallet keys.
//!
//! The secret key is stored bs58-encoded under `account-secret-key`, the
//! public key under `account-public-key`.

use crate::error::StoreError;
use sandwallet_constants::{PUBLIC_KEY_STORAGE_KEY, SECRET_KEY_STORAGE_KEY};
use sandwallet_types::{Account, AccountRequest};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-local store, used by tests and `--mock` runs without a store file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a single JSON object on disk, rewritten on every `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| StoreError::serialization(&path, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        debug!(path = %path.display(), "Store opened");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = lock(&self.entries);
        entries.insert(key.to_string(), value.to_string());
        let content = serde_json::to_string_pretty(&*entries)
            .map_err(|e| StoreError::serialization(&self.path, e))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        fs::write(&self.path, content).map_err(|e| StoreError::io(&self.path, e))
    }
}

/// Build the `ACCOUNT_GET` payload from persisted keys.
///
/// Read failures are logged and treated as "nothing stored". A secret that
/// is not valid bs58 is forwarded as an empty byte string so the sandbox
/// reports it as corrupted instead of silently generating a new account.
pub fn stored_account_request(store: &dyn KeyValueStore) -> AccountRequest {
    let read = |key: &str| {
        store.get(key).unwrap_or_else(|e| {
            warn!(key, error = %e, "Failed to read persisted key");
            None
        })
    };
    let secret_key = read(SECRET_KEY_STORAGE_KEY).map(|encoded| {
        bs58::decode(&encoded).into_vec().unwrap_or_else(|e| {
            warn!(error = %e, "Persisted secret key is not valid bs58");
            Vec::new()
        })
    });
    AccountRequest {
        secret_key,
        public_key: read(PUBLIC_KEY_STORAGE_KEY),
    }
}

/// Write-through of a freshly derived account. Failures are logged only.
pub fn persist_account(store: &dyn KeyValueStore, account: &Account) {
    let secret = bs58::encode(&account.secret_key).into_string();
    for (key, value) in [
        (SECRET_KEY_STORAGE_KEY, secret.as_str()),
        (PUBLIC_KEY_STORAGE_KEY, account.public_key.as_str()),
    ] {
        if let Err(e) = store.set(key, value) {
            warn!(key, error = %e, "Failed to persist account key");
        }
    }
    debug!(public_key = %account.public_key, "Account persisted");
}
