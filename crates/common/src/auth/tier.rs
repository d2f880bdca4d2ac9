//! Storage tiers for token replicas
//!
//! A tier is a small string key/value store. The token store writes the same
//! token to a volatile tier (lost when the process ends) and a durable tier
//! (survives restarts).

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::debug;

/// Tier I/O failure
#[derive(Debug, Error)]
pub enum TierError {
    #[error("storage tier unavailable: {0}")]
    Unavailable(String),

    #[error("storage tier I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage tier contents are corrupt: {0}")]
    Corrupt(String),
}

/// String key/value store used as a token replica
pub trait StorageTier: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// # Errors
    /// Returns [`TierError`] when the backing store cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, TierError>;

    /// # Errors
    /// Returns [`TierError`] when the backing store cannot be written.
    fn write(&self, key: &str, value: &str) -> Result<(), TierError>;

    /// Removing a missing key is not an error.
    ///
    /// # Errors
    /// Returns [`TierError`] when the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), TierError>;
}

/// Process-local tier; the session ends with the process
#[derive(Debug, Default)]
pub struct MemoryTier {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl StorageTier for MemoryTier {
    fn name(&self) -> &str {
        "memory"
    }

    fn read(&self, key: &str) -> Result<Option<String>, TierError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), TierError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), TierError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Durable tier backed by a JSON object on disk
///
/// Every write replaces the file atomically through a temporary file in the
/// same directory, so a crash never leaves a half-written map behind.
#[derive(Debug)]
pub struct FileTier {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, TierError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&contents).map_err(|e| TierError::Corrupt(e.to_string()))
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<(), TierError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let bytes =
            serde_json::to_vec_pretty(entries).map_err(|e| TierError::Corrupt(e.to_string()))?;
        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| TierError::Io(e.error))?;

        debug!(path = %self.path.display(), keys = entries.len(), "Token file written");
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut HashMap<String, String>)) -> Result<(), TierError> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        apply(&mut entries);
        self.save(&entries)
    }
}

impl StorageTier for FileTier {
    fn name(&self) -> &str {
        "file"
    }

    fn read(&self, key: &str) -> Result<Option<String>, TierError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), TierError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), TierError> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}
