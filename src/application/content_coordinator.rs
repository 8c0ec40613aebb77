//! Content coordinator - the client-side cache in front of content generation.
//!
//! Each request is keyed by its fingerprint in the session's
//! `generated-content-store`. A key is generated at most once at a time;
//! settled entries are served from the cache until the intention changes
//! in a way the widget cares about.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::domain::content::{
    ContentFingerprint, ContentRequest, ContentStatus, GeneratedContentEntry,
    GeneratedContentStore, GenerationResult, CONTENT_STORAGE_KEY,
};
use crate::domain::foundation::SessionId;
use crate::domain::schema::DISJOINT_PREFERENCE_FIELDS;
use crate::domain::snapshot::Snapshot;
use crate::ports::{load, save, SessionStore, SessionStoreError, StorageKey, WidgetBackend};

/// What a content request resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentOutcome {
    /// Fresh copy was generated and cached.
    Generated(String),
    /// A settled entry already existed for this request.
    Cached(GeneratedContentEntry),
    /// Another request for the same key is still running.
    InProgress,
    /// The intention carries no likes or priorities; an error entry was recorded.
    Skipped,
    /// Generation failed or the item was not a strong match. Nothing is shown.
    Failed,
}

impl ContentOutcome {
    /// Text to render, if any.
    pub fn content(&self) -> Option<&str> {
        match self {
            ContentOutcome::Generated(content) => Some(content),
            ContentOutcome::Cached(entry) => entry.content.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("content store error: {0}")]
    Storage(#[from] SessionStoreError),
}

pub struct ContentCoordinator {
    key: StorageKey,
    backend: Arc<dyn WidgetBackend>,
    store: Arc<dyn SessionStore>,
    /// Serializes read-modify-write cycles on the cache document.
    write_lock: Mutex<()>,
}

impl ContentCoordinator {
    pub fn new(
        session_id: SessionId,
        backend: Arc<dyn WidgetBackend>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            key: StorageKey::new(session_id, CONTENT_STORAGE_KEY),
            backend,
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Cached entry for a request, if any.
    pub async fn entry(&self, request: &ContentRequest) -> Result<Option<GeneratedContentEntry>, CoordinatorError> {
        let cache = self.load().await?;
        Ok(cache.get(&ContentFingerprint::of(request)).cloned())
    }

    /// Serves a request from the cache or generates it.
    #[tracing::instrument(skip_all, fields(name = %request.name))]
    pub async fn request(&self, request: ContentRequest) -> Result<ContentOutcome, CoordinatorError> {
        let key = ContentFingerprint::of(&request);

        {
            let _guard = self.write_lock.lock().await;
            let mut cache = self.load().await?;

            if let Some(entry) = cache.get(&key) {
                if entry.status == ContentStatus::Generating {
                    tracing::debug!(fingerprint = %key, "generation already running");
                    return Ok(ContentOutcome::InProgress);
                }
                if has_preferences(&request.customer_intention) {
                    return Ok(ContentOutcome::Cached(entry.clone()));
                }
            }

            if !has_preferences(&request.customer_intention) {
                tracing::debug!(fingerprint = %key, "no likes or priorities, skipping generation");
                cache.record_error(key);
                self.save(&cache).await?;
                return Ok(ContentOutcome::Skipped);
            }

            cache.start(key.clone());
            self.save(&cache).await?;
        }

        let result = self.backend.generate_content(request).await;

        let _guard = self.write_lock.lock().await;
        let mut cache = self.load().await?;
        let (settled, outcome) = match result {
            Ok(GenerationResult::StrongMatchFailure { .. }) => {
                (cache.fail(&key), ContentOutcome::Failed)
            }
            Ok(result) => match result.content().map(str::to_string) {
                Some(content) => (cache.complete(&key, content.clone()), ContentOutcome::Generated(content)),
                None => (cache.fail(&key), ContentOutcome::Failed),
            },
            Err(e) => {
                tracing::warn!(fingerprint = %key, error = %e, "content generation failed");
                (cache.fail(&key), ContentOutcome::Failed)
            }
        };

        if let Err(e) = settled {
            tracing::debug!(fingerprint = %key, error = %e, "entry changed while generating");
        }
        self.save(&cache).await?;
        Ok(outcome)
    }

    /// Regenerates when the widget follows intention changes and the
    /// likes, dislikes or priorities differ from `previous`.
    pub async fn refresh(
        &self,
        request: ContentRequest,
        previous: &Snapshot,
        update_on_intention_change: bool,
    ) -> Result<ContentOutcome, CoordinatorError> {
        if update_on_intention_change && preferences_changed(previous, &request.customer_intention) {
            let key = ContentFingerprint::of(&request);
            let _guard = self.write_lock.lock().await;
            let mut cache = self.load().await?;
            let settled = cache
                .get(&key)
                .map(|entry| entry.status != ContentStatus::Generating)
                .unwrap_or(false);
            if settled {
                tracing::debug!(fingerprint = %key, "intention changed, regenerating");
                cache.remove(&key);
                self.save(&cache).await?;
            }
        }
        self.request(request).await
    }

    /// Drops every cached entry.
    pub async fn clear(&self) -> Result<(), CoordinatorError> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(&self.key).await?;
        Ok(())
    }

    async fn load(&self) -> Result<GeneratedContentStore, CoordinatorError> {
        Ok(load(self.store.as_ref(), &self.key).await?.unwrap_or_default())
    }

    async fn save(&self, cache: &GeneratedContentStore) -> Result<(), CoordinatorError> {
        save(self.store.as_ref(), &self.key, cache).await?;
        Ok(())
    }
}

fn has_preferences(intention: &Snapshot) -> bool {
    intention.is_set("likes") || intention.is_set("priorities")
}

fn preferences_changed(previous: &Snapshot, current: &Snapshot) -> bool {
    DISJOINT_PREFERENCE_FIELDS
        .iter()
        .any(|field| previous.get(field) != current.get(field))
}
