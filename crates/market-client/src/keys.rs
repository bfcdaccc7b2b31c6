//! API key persistence and least-used rotation.

use crate::error::KeyError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[cfg(test)]
mod tests;

/// Rate limit assigned to keys added without an explicit one.
pub const DEFAULT_RATE_LIMIT: u32 = 30;

/// Number of characters left visible at each end of a masked key.
const MASK_VISIBLE: usize = 5;

/// A single upstream API key with its usage counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Secret value sent to the upstream.
    pub key: String,
    /// Advisory request ceiling per rotation period.
    pub rate_limit: u32,
    /// Selections since the last reset.
    pub used: u64,
}

impl Credential {
    /// Creates an unused credential.
    #[must_use]
    pub fn new(key: impl Into<String>, rate_limit: u32) -> Self {
        Self {
            key: key.into(),
            rate_limit,
            used: 0,
        }
    }
}

/// The persisted key file: `{ keys: [...], lastRotation: ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSet {
    /// Keys in insertion order.
    pub keys: Vec<Credential>,
    /// Time of the last usage reset.
    pub last_rotation: DateTime<Utc>,
}

impl CredentialSet {
    /// An empty set stamped with the current time.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            keys: Vec::new(),
            last_rotation: Utc::now(),
        }
    }

    /// A set holding only the given key with the default rate limit.
    #[must_use]
    pub fn with_default(key: impl Into<String>) -> Self {
        Self {
            keys: vec![Credential::new(key, DEFAULT_RATE_LIMIT)],
            last_rotation: Utc::now(),
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|c| c.key == key)
    }

    /// Index of the least-used key; ties go to the earliest entry.
    fn least_used(&self) -> Option<usize> {
        self.keys
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| c.used)
            .map(|(index, _)| index)
    }
}

impl Default for CredentialSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// A credential safe to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskedCredential {
    /// Masked key, e.g. `abcde...vwxyz`.
    pub key: String,
    /// Advisory request ceiling.
    pub rate_limit: u32,
    /// Selections since the last reset.
    pub used: u64,
}

impl From<&Credential> for MaskedCredential {
    fn from(credential: &Credential) -> Self {
        Self {
            key: mask_key(&credential.key),
            rate_limit: credential.rate_limit,
            used: credential.used,
        }
    }
}

/// Masks a secret, keeping the first and last five characters.
///
/// Keys too short for that keep a quarter of their length on each side, so at
/// least half of any key stays hidden.
#[must_use]
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let visible = if chars.len() > 2 * MASK_VISIBLE {
        MASK_VISIBLE
    } else {
        chars.len() / 4
    };
    let head: String = chars[..visible].iter().collect();
    let tail: String = chars[chars.len() - visible..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Persistence for the credential set.
///
/// `load` never fails: implementations return an empty set when the backing
/// storage is unreadable, so callers see "no keys" rather than a crash.
pub trait KeyStore: Send + Sync {
    /// Loads the current credential set.
    fn load(&self) -> CredentialSet;

    /// Replaces the persisted credential set.
    ///
    /// # Errors
    /// Returns error if the set cannot be written.
    fn save(&self, set: &CredentialSet) -> Result<(), KeyError>;
}

/// Key store backed by a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
    default_key: Option<String>,
}

impl FileKeyStore {
    /// Creates a store at `path`.
    ///
    /// When the file does not exist yet, the first `load` writes a set holding
    /// `default_key` (or an empty set when there is none).
    pub fn new(path: impl Into<PathBuf>, default_key: Option<String>) -> Self {
        Self {
            path: path.into(),
            default_key: default_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Location of the key file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn bootstrap(&self) -> CredentialSet {
        let set = match &self.default_key {
            Some(key) => CredentialSet::with_default(key.clone()),
            None => {
                warn!("No default API key configured; starting with an empty key set");
                CredentialSet::empty()
            }
        };

        match self.save(&set) {
            Ok(()) => info!("Created default API keys file at {}", self.path.display()),
            Err(e) => warn!("Failed to create API keys file: {}", e),
        }

        set
    }
}

impl KeyStore for FileKeyStore {
    fn load(&self) -> CredentialSet {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return self.bootstrap(),
            Err(e) => {
                error!("Error loading API keys: {}", e);
                return CredentialSet::empty();
            }
        };

        match serde_json::from_str(&content) {
            Ok(set) => set,
            Err(e) => {
                error!("Error parsing API keys file {}: {}", self.path.display(), e);
                CredentialSet::empty()
            }
        }
    }

    fn save(&self, set: &CredentialSet) -> Result<(), KeyError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(set)?;
        // Write-then-rename so a reader never observes a half-written file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        debug!("Updated API keys file");
        Ok(())
    }
}

/// In-memory key store.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    set: Mutex<CredentialSet>,
}

impl MemoryKeyStore {
    /// Creates a store holding `set`.
    #[must_use]
    pub fn new(set: CredentialSet) -> Self {
        Self {
            set: Mutex::new(set),
        }
    }

    /// Creates a store holding `keys`, each with the default rate limit.
    #[must_use]
    pub fn with_keys(keys: &[&str]) -> Self {
        Self::new(CredentialSet {
            keys: keys
                .iter()
                .map(|k| Credential::new(*k, DEFAULT_RATE_LIMIT))
                .collect(),
            last_rotation: Utc::now(),
        })
    }

    /// Returns a copy of the stored set.
    #[must_use]
    pub fn snapshot(&self) -> CredentialSet {
        self.set.lock().clone()
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self) -> CredentialSet {
        self.set.lock().clone()
    }

    fn save(&self, set: &CredentialSet) -> Result<(), KeyError> {
        *self.set.lock() = set.clone();
        Ok(())
    }
}

/// Hands out the least-used key and maintains the usage counters.
///
/// Read-modify-write cycles are serialized inside one process. Several
/// processes sharing the same key file can still lose updates; the counters
/// only spread load, so that is tolerated.
pub struct KeyRotator {
    store: Arc<dyn KeyStore>,
    guard: Mutex<()>,
}

impl KeyRotator {
    /// Creates a rotator over `store`.
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self {
            store,
            guard: Mutex::new(()),
        }
    }

    /// Selects the least-used key, counts the use and persists it.
    ///
    /// The per-key rate limit is advisory: a key past its ceiling is still
    /// returned, with a warning.
    ///
    /// # Errors
    /// Returns [`KeyError::NoCredentials`] when no key is configured.
    pub fn select_key(&self) -> Result<String, KeyError> {
        let _guard = self.guard.lock();
        let mut set = self.store.load();

        let Some(index) = set.least_used() else {
            error!("No API keys available");
            return Err(KeyError::NoCredentials);
        };

        let credential = &mut set.keys[index];
        credential.used += 1;
        if credential.used > u64::from(credential.rate_limit) {
            warn!(
                key = %mask_key(&credential.key),
                used = credential.used,
                rate_limit = credential.rate_limit,
                "API key usage exceeds its advisory rate limit"
            );
        }
        let key = credential.key.clone();

        if let Err(e) = self.store.save(&set) {
            warn!("Failed to persist API key usage: {}", e);
        }

        Ok(key)
    }

    /// Zeroes every usage counter and stamps the reset time.
    ///
    /// # Errors
    /// Returns error if the updated set cannot be persisted.
    pub fn reset_usage(&self) -> Result<(), KeyError> {
        let _guard = self.guard.lock();
        let mut set = self.store.load();

        for credential in &mut set.keys {
            credential.used = 0;
        }
        set.last_rotation = Utc::now();

        self.store.save(&set)?;
        info!("Reset API key usage counts");
        Ok(())
    }

    /// Registers a new key with zero usage.
    ///
    /// # Errors
    /// Returns [`KeyError::Duplicate`] if the key already exists; the store is
    /// left untouched in that case.
    pub fn add_key(&self, key: &str, rate_limit: u32) -> Result<(), KeyError> {
        if key.trim().is_empty() {
            return Err(KeyError::EmptyKey);
        }

        let _guard = self.guard.lock();
        let mut set = self.store.load();

        if set.contains(key) {
            warn!("API key {} already exists", mask_key(key));
            return Err(KeyError::Duplicate(mask_key(key)));
        }

        set.keys.push(Credential::new(key, rate_limit));
        self.store.save(&set)?;
        info!("Added new API key {}", mask_key(key));
        Ok(())
    }

    /// Removes a key.
    ///
    /// # Errors
    /// Returns [`KeyError::NotFound`] if the key is unknown; the store is left
    /// untouched in that case.
    pub fn remove_key(&self, key: &str) -> Result<(), KeyError> {
        let _guard = self.guard.lock();
        let mut set = self.store.load();

        let before = set.keys.len();
        set.keys.retain(|c| c.key != key);
        if set.keys.len() == before {
            warn!("API key {} not found", mask_key(key));
            return Err(KeyError::NotFound(mask_key(key)));
        }

        self.store.save(&set)?;
        info!("Removed API key {}", mask_key(key));
        Ok(())
    }

    /// Lists all keys with their secrets masked.
    #[must_use]
    pub fn list_keys(&self) -> Vec<MaskedCredential> {
        self.store
            .load()
            .keys
            .iter()
            .map(MaskedCredential::from)
            .collect()
    }

    /// Time of the last usage reset.
    #[must_use]
    pub fn last_rotation(&self) -> DateTime<Utc> {
        self.store.load().last_rotation
    }

    /// Runs `op` on the blocking thread pool.
    ///
    /// Every operation reads and may rewrite the key file under a lock, so
    /// async callers go through here instead of stalling a runtime worker.
    ///
    /// # Errors
    /// Returns the error of `op`, or [`KeyError::Task`] if the task panicked.
    pub async fn spawn_blocking<T, F>(self: &Arc<Self>, op: F) -> Result<T, KeyError>
    where
        F: FnOnce(&KeyRotator) -> Result<T, KeyError> + Send + 'static,
        T: Send + 'static,
    {
        let rotator = Arc::clone(self);
        tokio::task::spawn_blocking(move || op(&rotator)).await?
    }
}

impl std::fmt::Debug for KeyRotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRotator").finish_non_exhaustive()
    }
}
