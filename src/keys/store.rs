//! Trading key persistence
//!
//! The on-chain registration only stores a one-way id of the trading key,
//! so the secret has to be kept locally. The chain tracks trading keys per
//! `(account, orderly key)`, and so does `CredentialStore`: a key saved
//! under one Orderly key is never handed out for another. Implementations
//! must never log the secret.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroize;

use super::trading::TradingKeyPair;
use crate::error::{SdkError, SdkResult};

/// Load/save/clear of the trading key registered under an Orderly key
pub trait CredentialStore: Send + Sync {
    fn load(&self, account_id: &str, orderly_key: &str) -> SdkResult<Option<TradingKeyPair>>;
    fn save(&self, account_id: &str, orderly_key: &str, key: &TradingKeyPair) -> SdkResult<()>;
    fn clear(&self, account_id: &str, orderly_key: &str) -> SdkResult<()>;
}

impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    fn load(&self, account_id: &str, orderly_key: &str) -> SdkResult<Option<TradingKeyPair>> {
        (**self).load(account_id, orderly_key)
    }

    fn save(&self, account_id: &str, orderly_key: &str, key: &TradingKeyPair) -> SdkResult<()> {
        (**self).save(account_id, orderly_key, key)
    }

    fn clear(&self, account_id: &str, orderly_key: &str) -> SdkResult<()> {
        (**self).clear(account_id, orderly_key)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Default)]
pub struct MemoryCredentialStore {
    keys: Mutex<HashMap<(String, String), TradingKeyPair>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn slot(account_id: &str, orderly_key: &str) -> (String, String) {
    (account_id.to_string(), orderly_key.to_string())
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self, account_id: &str, orderly_key: &str) -> SdkResult<Option<TradingKeyPair>> {
        let keys = self.keys.lock().unwrap_or_else(|p| p.into_inner());
        Ok(keys.get(&slot(account_id, orderly_key)).cloned())
    }

    fn save(&self, account_id: &str, orderly_key: &str, key: &TradingKeyPair) -> SdkResult<()> {
        let mut keys = self.keys.lock().unwrap_or_else(|p| p.into_inner());
        keys.insert(slot(account_id, orderly_key), key.clone());
        Ok(())
    }

    fn clear(&self, account_id: &str, orderly_key: &str) -> SdkResult<()> {
        let mut keys = self.keys.lock().unwrap_or_else(|p| p.into_inner());
        keys.remove(&slot(account_id, orderly_key));
        Ok(())
    }
}

impl fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.keys.lock().map(|k| k.len()).unwrap_or(0);
        f.debug_struct("MemoryCredentialStore")
            .field("entries", &count)
            .finish()
    }
}

// ============================================================================
// File store
// ============================================================================

/// On-disk record, one JSON file per account and Orderly key
#[derive(Serialize, Deserialize)]
struct StoredTradingKey {
    account_id: String,
    orderly_key: String,
    public_key: String,
    normalized_key_id: String,
    secret_hex: String,
}

impl Drop for StoredTradingKey {
    fn drop(&mut self) {
        self.secret_hex.zeroize();
    }
}

/// JSON file per account and Orderly key under a directory; files are 0600 on unix
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

fn file_safe(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl FileCredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, account_id: &str, orderly_key: &str) -> SdkResult<PathBuf> {
        if account_id.trim().is_empty() {
            return Err(SdkError::MissingCredential("account_id is empty".into()));
        }
        if orderly_key.trim().is_empty() {
            return Err(SdkError::MissingCredential("orderly key is empty".into()));
        }
        Ok(self.dir.join(format!(
            "{}__{}.trading-key.json",
            file_safe(account_id),
            file_safe(orderly_key)
        )))
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, account_id: &str, orderly_key: &str) -> SdkResult<Option<TradingKeyPair>> {
        let path = self.path_for(account_id, orderly_key)?;
        if !path.exists() {
            return Ok(None);
        }

        let mut raw = fs::read_to_string(&path)?;
        let parsed: Result<StoredTradingKey, _> = serde_json::from_str(&raw);
        raw.zeroize();
        let record = parsed?;

        if record.account_id != account_id || record.orderly_key != orderly_key {
            return Err(SdkError::MalformedKey(format!(
                "credential file {} belongs to '{}' / '{}'",
                path.display(),
                record.account_id,
                record.orderly_key
            )));
        }

        let key = TradingKeyPair::from_secret_hex(&record.secret_hex)?;
        if key.normalized_key_id() != record.normalized_key_id {
            return Err(SdkError::MalformedKey(format!(
                "credential file {} is corrupt (key id mismatch)",
                path.display()
            )));
        }

        debug!(account_id = %account_id, path = %path.display(), "Loaded trading key");
        Ok(Some(key))
    }

    fn save(&self, account_id: &str, orderly_key: &str, key: &TradingKeyPair) -> SdkResult<()> {
        let path = self.path_for(account_id, orderly_key)?;
        fs::create_dir_all(&self.dir)?;

        let record = StoredTradingKey {
            account_id: account_id.to_string(),
            orderly_key: orderly_key.to_string(),
            public_key: key.public_key().to_string(),
            normalized_key_id: key.normalized_key_id().to_string(),
            secret_hex: key.secret_hex().to_string(),
        };
        let mut json = serde_json::to_string_pretty(&record)?;

        let tmp_path = path.with_extension("json.tmp");
        let written = write_private(&tmp_path, json.as_bytes());
        json.zeroize();
        written?;
        fs::rename(&tmp_path, &path)?;

        debug!(account_id = %account_id, path = %path.display(), "Persisted trading key");
        Ok(())
    }

    fn clear(&self, account_id: &str, orderly_key: &str) -> SdkResult<()> {
        let path = self.path_for(account_id, orderly_key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}
