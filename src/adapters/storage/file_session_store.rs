//! File-based Session Store Adapter
//!
//! Stores each document as JSON at `<base>/<session_id>/<name>.json`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::watch;

use super::watchers::Watchers;
use crate::ports::{Persisted, SessionStore, SessionStoreError, StorageKey};

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    base_path: PathBuf,
    watchers: Arc<Watchers>,
}

impl FileSessionStore {
    /// ```ignore
    /// let store = FileSessionStore::new("./data/sessions");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            watchers: Arc::new(Watchers::notifying()),
        }
    }

    fn session_dir(&self, key: &StorageKey) -> PathBuf {
        self.base_path.join(key.session_id.to_string())
    }

    fn file_path(&self, key: &StorageKey) -> PathBuf {
        self.session_dir(key).join(format!("{}.json", key.name))
    }

}

/// Best-effort read used to seed a new subscription.
async fn read_document(path: &Path) -> Option<Persisted> {
    let raw = fs::read_to_string(path).await.ok()?;
    serde_json::from_str(&raw).ok()
}

fn io_error(e: std::io::Error) -> SessionStoreError {
    SessionStoreError::Io(e.to_string())
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn read(&self, key: &StorageKey) -> Result<Option<Persisted>, SessionStoreError> {
        let raw = match fs::read_to_string(self.file_path(key)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(e)),
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| SessionStoreError::Deserialization(e.to_string()))
    }

    async fn write(&self, key: &StorageKey, value: Persisted) -> Result<(), SessionStoreError> {
        fs::create_dir_all(self.session_dir(key)).await.map_err(io_error)?;

        let json = serde_json::to_string_pretty(&value)
            .map_err(|e| SessionStoreError::Serialization(e.to_string()))?;

        // Write-then-rename so readers never see a half-written document
        let path = self.file_path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await.map_err(io_error)?;
        fs::rename(&tmp, &path).await.map_err(io_error)?;

        self.watchers.publish(key, Some(value));
        Ok(())
    }

    async fn remove(&self, key: &StorageKey) -> Result<(), SessionStoreError> {
        match fs::remove_file(self.file_path(key)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(io_error(e)),
        }
        self.watchers.publish(key, None);
        Ok(())
    }

    /// The receiver starts at `None`; the document on disk, if any, arrives
    /// as the first change.
    fn subscribe(&self, key: &StorageKey) -> watch::Receiver<Option<Persisted>> {
        let (receiver, fresh) = self.watchers.subscribe(key);
        if fresh {
            let path = self.file_path(key);
            let watchers = self.watchers.clone();
            let key = key.clone();
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        let loaded = read_document(&path).await;
                        watchers.seed(&key, loaded);
                    });
                }
                Err(_) => tracing::warn!(key = %key, "no runtime, subscription not seeded from disk"),
            }
        }
        receiver
    }
}
