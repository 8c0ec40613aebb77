//! In-Memory Session Store Adapter
//!
//! Keeps every document in its watch channel. Useful for tests and for
//! single-process deployments.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

use super::watchers::Watchers;
use crate::ports::{Persisted, SessionStore, SessionStoreError, StorageKey};

#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    documents: Arc<Watchers>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn read(&self, key: &StorageKey) -> Result<Option<Persisted>, SessionStoreError> {
        Ok(self.documents.current(key).flatten())
    }

    async fn write(&self, key: &StorageKey, value: Persisted) -> Result<(), SessionStoreError> {
        self.documents.publish(key, Some(value));
        Ok(())
    }

    async fn remove(&self, key: &StorageKey) -> Result<(), SessionStoreError> {
        if self.documents.current(key).is_some() {
            self.documents.publish(key, None);
        }
        Ok(())
    }

    fn subscribe(&self, key: &StorageKey) -> watch::Receiver<Option<Persisted>> {
        self.documents.subscribe(key).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::SessionId;
    use crate::ports::{load, save};
    use serde_json::json;

    fn key(name: &str) -> StorageKey {
        StorageKey::new(SessionId::new(), name)
    }

    #[tokio::test]
    async fn read_missing_key_is_none() {
        let store = InMemorySessionStore::new();
        assert!(store.read(&key("chat-storage")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_then_read() {
        let store = InMemorySessionStore::new();
        let key = key("chat-storage");
        save(&store, &key, &json!({ "messages": [] })).await.unwrap();

        let loaded: serde_json::Value = load(&store, &key).await.unwrap().unwrap();
        assert_eq!(loaded, json!({ "messages": [] }));
    }

    #[tokio::test]
    async fn keys_are_isolated_per_session() {
        let store = InMemorySessionStore::new();
        let a = key("chat-storage");
        let b = key("chat-storage");
        save(&store, &a, &json!(1)).await.unwrap();
        assert!(store.read(&b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_clears_value() {
        let store = InMemorySessionStore::new();
        let key = key("generated-content-store");
        save(&store, &key, &json!({})).await.unwrap();
        store.remove(&key).await.unwrap();
        assert!(store.read(&key).await.unwrap().is_none());
        store.remove(&key).await.unwrap();
    }

    #[tokio::test]
    async fn subscribers_see_writes_and_removal() {
        let store = InMemorySessionStore::new();
        let key = key("chat-storage");
        let mut rx = store.subscribe(&key);
        assert!(rx.borrow().is_none());

        save(&store, &key, &json!({ "n": 1 })).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().unwrap().state, json!({ "n": 1 }));

        store.remove(&key).await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }
}
