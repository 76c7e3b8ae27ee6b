//! Persistence adapters for the session.
//!
//! The session is persisted as two key-value entries: [`TOKEN_KEY`] holds the
//! raw credential and [`USER_KEY`] holds the serialized Identity. Adapters
//! store the raw strings; parsing and validation happen in the session
//! manager so a corrupt entry never prevents startup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

/// Key holding the raw credential string.
pub const TOKEN_KEY: &str = "token";

/// Key holding the serialized Identity record.
pub const USER_KEY: &str = "user";

/// Errors from a persistence adapter.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not a valid key-value document.
    #[error("Storage format error: {0}")]
    Format(#[from] serde_json::Error),

    /// The adapter's lock was poisoned by a panicking writer.
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Raw persisted entries, as last written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedSession {
    /// Contents of the [`TOKEN_KEY`] entry.
    pub token: Option<String>,
    /// Contents of the [`USER_KEY`] entry.
    pub user: Option<String>,
}

impl PersistedSession {
    fn from_entries(mut entries: BTreeMap<String, String>) -> Self {
        Self {
            token: entries.remove(TOKEN_KEY),
            user: entries.remove(USER_KEY),
        }
    }

    fn into_entries(self) -> BTreeMap<String, String> {
        let mut entries = BTreeMap::new();
        if let Some(token) = self.token {
            entries.insert(TOKEN_KEY.to_string(), token);
        }
        if let Some(user) = self.user {
            entries.insert(USER_KEY.to_string(), user);
        }
        entries
    }
}

/// Scoped persistence for the session's credential and identity.
///
/// Implementations must be usable from any thread. Calls are short and
/// synchronous so they can run inside the session's state update.
pub trait SessionStorage: Send + Sync {
    /// Read the persisted entries. Absent storage is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be read.
    fn load(&self) -> Result<PersistedSession, StorageError>;

    /// Replace both entries.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be written.
    fn save(&self, session: &PersistedSession) -> Result<(), StorageError>;

    /// Remove both entries.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be written.
    fn clear(&self) -> Result<(), StorageError>;
}

/// In-process storage. Does not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with the given entries.
    #[must_use]
    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            entries: Mutex::new(session.into_entries()),
        }
    }

    /// Raw value of one entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<PersistedSession, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(PersistedSession::from_entries(entries.clone()))
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        *entries = session.clone().into_entries();
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.remove(TOKEN_KEY);
        entries.remove(USER_KEY);
        Ok(())
    }
}

/// Storage backed by a JSON object on disk.
///
/// Writes go to a sibling temp file that is then renamed over the target, so
/// a reader sees either the old document or the new one.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage at `path`. The file and its parent directory are created on
    /// first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<PersistedSession, StorageError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PersistedSession::default());
            }
            Err(e) => return Err(e.into()),
        };

        let entries: BTreeMap<String, String> = serde_json::from_slice(&bytes)?;
        Ok(PersistedSession::from_entries(entries))
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        self.write_entries(&session.clone().into_entries())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
