//! Durable storage backends for session state.
//!
//! The store persists a handful of string keys (token material, expiry,
//! principal id, serialized profile). Backends only need `get`/`set`/`remove`;
//! atomicity across keys is the [`CredentialStore`](super::CredentialStore)'s
//! job, not theirs.

use crate::error::StorageError;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

pub trait Storage: Send + Sync {
    /// # Errors
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    /// Returns an error if the value cannot be written durably.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is a no-op, not an error.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// File-backed storage: one JSON object per file, rewritten on every change.
///
/// The record is small (five keys), so a full read-modify-write per operation
/// is cheaper than keeping the file open and keeps crash states parseable.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn memory_storage_round_trip() -> Result<()> {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("access_token")?, None);

        storage.set("access_token", "token-abc")?;
        assert_eq!(storage.get("access_token")?, Some("token-abc".to_string()));

        storage.remove("access_token")?;
        assert_eq!(storage.get("access_token")?, None);
        Ok(())
    }

    #[test]
    fn memory_storage_remove_missing_key_is_noop() -> Result<()> {
        let storage = MemoryStorage::new();
        storage.remove("never-set")?;
        Ok(())
    }

    #[test]
    fn file_storage_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.json");
        let storage = FileStorage::new(&path);

        storage.set("access_token", "token-abc")?;
        storage.set("principal_id", "p-1")?;

        // A second handle re-reads from disk only.
        let reread = FileStorage::new(&path);
        assert_eq!(reread.get("access_token")?, Some("token-abc".to_string()));
        assert_eq!(reread.get("principal_id")?, Some("p-1".to_string()));

        reread.remove("access_token")?;
        assert_eq!(storage.get("access_token")?, None);
        assert_eq!(storage.get("principal_id")?, Some("p-1".to_string()));
        Ok(())
    }

    #[test]
    fn file_storage_missing_file_reads_empty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = FileStorage::new(dir.path().join("does-not-exist.json"));
        assert_eq!(storage.get("access_token")?, None);
        Ok(())
    }

    #[test]
    fn file_storage_creates_parent_directories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = FileStorage::new(dir.path().join("nested/state/session.json"));
        storage.set("access_token", "token-abc")?;
        assert_eq!(storage.get("access_token")?, Some("token-abc".to_string()));
        Ok(())
    }
}
