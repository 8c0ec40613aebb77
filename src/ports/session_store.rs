//! Session Store Port - durable key-value storage for per-session state.
//!
//! Each session owns two documents, the chat state under `chat-storage`
//! and the generated content cache under `generated-content-store`. Values
//! are stored in a versioned envelope `{state, version}` so layouts can
//! evolve.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::sync::watch;

use crate::domain::foundation::SessionId;

/// Envelope version written by this crate.
pub const STORAGE_VERSION: u32 = 0;

/// Port for durable session storage.
///
/// Implementations must be safe to share across tasks. Writes to one key
/// never touch another key.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the stored document, or `None` if the key was never written.
    async fn read(&self, key: &StorageKey) -> Result<Option<Persisted>, SessionStoreError>;

    /// Replaces the stored document and notifies subscribers.
    async fn write(&self, key: &StorageKey, value: Persisted) -> Result<(), SessionStoreError>;

    /// Deletes the document. Removing a missing key is not an error.
    async fn remove(&self, key: &StorageKey) -> Result<(), SessionStoreError>;

    /// Watches a key. The receiver holds the latest value, `None` once removed.
    fn subscribe(&self, key: &StorageKey) -> watch::Receiver<Option<Persisted>>;
}

/// Address of one stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    pub session_id: SessionId,
    pub name: String,
}

impl StorageKey {
    pub fn new(session_id: SessionId, name: impl Into<String>) -> Self {
        Self {
            session_id,
            name: name.into(),
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.session_id, self.name)
    }
}

/// Versioned stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persisted {
    pub state: Value,
    pub version: u32,
}

impl Persisted {
    pub fn encode<T: Serialize>(state: &T) -> Result<Self, SessionStoreError> {
        let state = serde_json::to_value(state)
            .map_err(|e| SessionStoreError::Serialization(e.to_string()))?;
        Ok(Self {
            state,
            version: STORAGE_VERSION,
        })
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, SessionStoreError> {
        if self.version > STORAGE_VERSION {
            return Err(SessionStoreError::UnsupportedVersion(self.version));
        }
        serde_json::from_value(self.state.clone())
            .map_err(|e| SessionStoreError::Deserialization(e.to_string()))
    }
}

/// Reads and decodes a typed document.
pub async fn load<T: DeserializeOwned>(
    store: &dyn SessionStore,
    key: &StorageKey,
) -> Result<Option<T>, SessionStoreError> {
    match store.read(key).await? {
        Some(persisted) => persisted.decode().map(Some),
        None => Ok(None),
    }
}

/// Encodes and writes a typed document.
pub async fn save<T: Serialize + Sync>(
    store: &dyn SessionStore,
    key: &StorageKey,
    state: &T,
) -> Result<(), SessionStoreError> {
    store.write(key, Persisted::encode(state)?).await
}

/// Errors that can occur during session storage operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("failed to serialize state: {0}")]
    Serialization(String),

    #[error("failed to deserialize state: {0}")]
    Deserialization(String),

    #[error("unsupported storage version {0}")]
    UnsupportedVersion(u32),

    #[error("IO error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_round_trips_typed_state() {
        let persisted = Persisted::encode(&json!({ "searchData": {} })).unwrap();
        assert_eq!(persisted.version, STORAGE_VERSION);
        let value: Value = persisted.decode().unwrap();
        assert_eq!(value, json!({ "searchData": {} }));
    }

    #[test]
    fn newer_versions_are_rejected() {
        let persisted = Persisted {
            state: json!({}),
            version: STORAGE_VERSION + 1,
        };
        let err = persisted.decode::<Value>().unwrap_err();
        assert!(matches!(err, SessionStoreError::UnsupportedVersion(_)));
    }

    #[test]
    fn key_display_includes_session_and_name() {
        let session = SessionId::new();
        let key = StorageKey::new(session, "chat-storage");
        assert_eq!(key.to_string(), format!("{}/chat-storage", session));
    }
}
