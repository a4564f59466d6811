//! Local key/value storage for the client
//!
//! This module provides a small persistent store backed by a single JSON
//! document on disk. Each key maps to one JSON record, mirroring the way a
//! browser's local storage holds one serialized entry per key.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// File-backed key/value storage
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Arc<Mutex<()>>,
}

impl LocalStorage {
    /// Open the storage file, creating its parent directory if needed
    ///
    /// The file itself is created lazily on the first write.
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(StorageError::Configuration(
                "storage path must not be empty".to_string(),
            ));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!("Local storage opened at {}", path.display());
        Ok(Self {
            path,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store a value under `key`, replacing any previous value
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;
        entries.insert(key.to_string(), serde_json::to_value(value)?);
        self.write_entries(&entries).await?;
        debug!("Stored key {} in {}", key, self.path.display());
        Ok(())
    }

    /// Get the value stored under `key`
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        let mut entries = self.read_entries().await?;
        match entries.remove(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Delete `key`; deleting a missing key is not an error
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries).await?;
            debug!("Deleted key {} from {}", key, self.path.display());
        }
        Ok(())
    }

    async fn read_entries(&self) -> StorageResult<Map<String, Value>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        Ok(serde_json::from_str(&raw)?)
    }

    async fn write_entries(&self, entries: &Map<String, Value>) -> StorageResult<()> {
        let serialized = serde_json::to_string_pretty(entries)?;

        // Write to a sibling file first so a crash never leaves a torn document
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, serialized).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}
