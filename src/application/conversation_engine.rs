//! Conversation engine - drives one session's turns against a [`WidgetBackend`].
//!
//! A turn runs moderation first, then streams the reply while both
//! extractions run alongside it. Every turn owns a cancellation token; a new
//! message cancels the previous turn's token, which drops its in-flight
//! calls. All session writes go through one lock and are persisted to the
//! [`SessionStore`] under [`CHAT_STORAGE_KEY`], so subscribers see every
//! change, including each streamed token.

use std::sync::Arc;

use futures::StreamExt;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use crate::domain::conversation::{
    ChatMessage, ChatState, ExtractionPhase, SearchConfig, TurnPhase, CHAT_STORAGE_KEY,
    REFUSAL_TEXT, REPLY_FAILURE_TEXT,
};
use crate::domain::foundation::{SessionId, StateMachine, TurnId};
use crate::domain::sanitize::sanitize_user_text;
use crate::domain::schema::SearchSchema;
use crate::domain::snapshot::{merge, missing_required, required_satisfied, Snapshot};
use crate::ports::{
    load, save, BackendError, Persisted, SearchTrigger, SessionStore, SessionStoreError,
    StorageKey, TurnPayload, WidgetBackend,
};

/// Deployment settings applied when a session is opened.
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub search_config: SearchConfig,
    pub require_manual_search: bool,
}

/// Errors that can end a turn.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("moderation failed: {0}")]
    Moderation(BackendError),

    #[error("session storage error: {0}")]
    Storage(#[from] SessionStoreError),

    #[error("turn superseded")]
    Aborted,
}

impl EngineError {
    /// True for a superseded or discarded turn, which is not a failure.
    pub fn is_abort(&self) -> bool {
        matches!(self, EngineError::Aborted)
    }
}

/// How the assistant reply of a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    Completed,
    /// The stream failed; the fixed failure text was shown instead.
    Failed,
    /// Moderation flagged the message; the fixed refusal was shown.
    Refused,
    /// The turn was superseded mid-stream.
    Cancelled,
}

/// What the search-data merge of a turn led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
    /// Extraction failed or found nothing new.
    Unchanged,
    /// Data changed but required fields are still missing.
    Incomplete { missing: Vec<String> },
    /// All required fields are present; waiting for the user to confirm.
    AwaitingConfirmation,
    /// The downstream search was fired.
    Triggered,
    /// The downstream search could not be fired; the update flag stays set.
    TriggerFailed(String),
}

/// Result of one completed turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub turn: TurnId,
    pub reply: ReplyOutcome,
    pub search: SearchStatus,
    pub intention_updated: bool,
}

/// Phase of the current turn and of its extractions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStatus {
    pub turn: TurnPhase,
    pub extraction: ExtractionPhase,
}

struct ActiveTurn {
    id: TurnId,
    cancel: CancellationToken,
}

struct SessionState {
    chat: ChatState,
    active: Option<ActiveTurn>,
    status: EngineStatus,
}

impl SessionState {
    fn owns(&self, turn: TurnId) -> bool {
        self.active.as_ref().map(|a| a.id == turn).unwrap_or(false)
    }

    fn set_turn_phase(&mut self, next: TurnPhase) {
        self.status.turn = self.status.turn.transition_to(next).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "unexpected turn transition");
            next
        });
    }

    fn set_extraction_phase(&mut self, next: ExtractionPhase) {
        self.status.extraction = self.status.extraction.transition_to(next).unwrap_or(next);
    }
}

/// Single-writer engine for one chat session.
pub struct ConversationEngine {
    session_id: SessionId,
    key: StorageKey,
    backend: Arc<dyn WidgetBackend>,
    store: Arc<dyn SessionStore>,
    search: Arc<dyn SearchTrigger>,
    session: Mutex<SessionState>,
}

impl ConversationEngine {
    /// Opens a session, restoring persisted chat state when there is some.
    ///
    /// The deployment's search config and manual-search flag replace any
    /// stored values.
    pub async fn open(
        session_id: SessionId,
        settings: EngineSettings,
        backend: Arc<dyn WidgetBackend>,
        store: Arc<dyn SessionStore>,
        search: Arc<dyn SearchTrigger>,
    ) -> Result<Self, EngineError> {
        let key = StorageKey::new(session_id, CHAT_STORAGE_KEY);
        let mut chat: ChatState = load(store.as_ref(), &key).await?.unwrap_or_default();
        chat.search_config = settings.search_config;
        chat.require_manual_search = settings.require_manual_search;
        save(store.as_ref(), &key, &chat).await?;

        tracing::info!(session_id = %session_id, messages = chat.messages.len(), "session opened");

        Ok(Self {
            session_id,
            key,
            backend,
            store,
            search,
            session: Mutex::new(SessionState {
                chat,
                active: None,
                status: EngineStatus::default(),
            }),
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Current chat state, including a partial reply if one is streaming.
    pub async fn state(&self) -> ChatState {
        self.session.lock().await.chat.clone()
    }

    pub async fn status(&self) -> EngineStatus {
        self.session.lock().await.status
    }

    /// Watches the persisted chat state.
    pub fn subscribe(&self) -> watch::Receiver<Option<Persisted>> {
        self.store.subscribe(&self.key)
    }

    /// Runs one user turn to completion.
    ///
    /// Returns [`EngineError::Aborted`] when a later message (or
    /// [`ConversationEngine::cancel`]) supersedes this turn.
    #[tracing::instrument(skip_all, fields(session_id = %self.session_id))]
    pub async fn send(&self, text: &str) -> Result<TurnOutcome, EngineError> {
        let content = sanitize_user_text(text);
        if content.is_empty() {
            return Err(EngineError::EmptyMessage);
        }

        let turn = TurnId::new();
        let cancel = CancellationToken::new();
        {
            let mut session = self.session.lock().await;
            if let Some(previous) = session.active.take() {
                tracing::debug!(turn = %previous.id, "superseding turn");
                previous.cancel.cancel();
            }
            session.active = Some(ActiveTurn {
                id: turn,
                cancel: cancel.clone(),
            });
            session.set_turn_phase(TurnPhase::AwaitingModeration);
            session.chat.messages.push_user(content.clone());
            self.persist(&session).await?;
        }

        let verdict = tokio::select! {
            _ = cancel.cancelled() => return Err(EngineError::Aborted),
            verdict = self.backend.moderate(&content) => verdict,
        };

        let verdict = match verdict {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(error = %e, "moderation failed, turn stopped");
                self.end_turn(turn).await;
                return Err(EngineError::Moderation(e));
            }
        };

        if verdict.flagged {
            let mut session = self.session.lock().await;
            if !session.owns(turn) {
                return Err(EngineError::Aborted);
            }
            session.chat.messages.push_assistant(REFUSAL_TEXT);
            session.set_turn_phase(TurnPhase::Idle);
            session.active = None;
            self.persist(&session).await?;
            return Ok(TurnOutcome {
                turn,
                reply: ReplyOutcome::Refused,
                search: SearchStatus::Unchanged,
                intention_updated: false,
            });
        }

        let (payload, intention) = {
            let mut session = self.session.lock().await;
            if !session.owns(turn) {
                return Err(EngineError::Aborted);
            }
            let payload = TurnPayload {
                messages: session.chat.messages.messages().to_vec(),
                search_config: session.chat.search_config.clone(),
                current_data: session.chat.search_data.clone(),
            };
            let intention = session.chat.customer_intention.clone();
            session.chat.messages.begin_reply(turn);
            session.set_turn_phase(TurnPhase::AwaitingReply);
            session.set_extraction_phase(ExtractionPhase::AwaitingExtraction);
            self.persist(&session).await?;
            (payload, intention)
        };

        let messages = payload.messages.clone();
        let (reply, search, intention_updated) = tokio::try_join!(
            self.stream_reply(turn, &cancel, payload.clone()),
            self.extract_search_data(turn, &cancel, payload),
            self.extract_intention(turn, &cancel, messages, intention),
        )?;

        if cancel.is_cancelled() {
            return Err(EngineError::Aborted);
        }
        self.end_turn(turn).await;

        tracing::info!(turn = %turn, reply = ?reply, search = ?search, "turn complete");
        Ok(TurnOutcome {
            turn,
            reply,
            search,
            intention_updated,
        })
    }

    /// Cancels the running turn, if any.
    ///
    /// Streamed text is kept as the turn's reply; a turn cancelled before
    /// its first token gets an empty one.
    pub async fn cancel(&self) {
        let mut session = self.session.lock().await;
        if let Some(active) = session.active.take() {
            active.cancel.cancel();
            session.chat.messages.close_open_turn();
            session.set_turn_phase(TurnPhase::Idle);
            session.set_extraction_phase(ExtractionPhase::Idle);
            if let Err(e) = self.persist(&session).await {
                tracing::warn!(error = %e, "failed to persist cancelled turn");
            }
        }
    }

    /// Fires the downstream search after the user confirmed it.
    pub async fn confirm_search(&self) -> Result<SearchStatus, EngineError> {
        let mut session = self.session.lock().await;
        let status = self.try_trigger(&mut session).await;
        self.persist(&session).await?;
        Ok(status)
    }

    async fn stream_reply(
        &self,
        turn: TurnId,
        cancel: &CancellationToken,
        payload: TurnPayload,
    ) -> Result<ReplyOutcome, EngineError> {
        let opened = tokio::select! {
            _ = cancel.cancelled() => None,
            stream = self.backend.stream_chat(payload) => Some(stream),
        };

        let mut stream = match opened {
            None => return self.close_reply(turn, ReplyOutcome::Cancelled).await,
            Some(Ok(stream)) => stream,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "reply stream failed to open");
                return self.close_reply(turn, ReplyOutcome::Failed).await;
            }
        };

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return self.close_reply(turn, ReplyOutcome::Cancelled).await,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(delta)) => {
                    let mut session = self.session.lock().await;
                    if !session.chat.messages.append_token(turn, &delta) {
                        return Ok(ReplyOutcome::Cancelled);
                    }
                    self.persist(&session).await?;
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "reply stream failed");
                    return self.close_reply(turn, ReplyOutcome::Failed).await;
                }
                None => return self.close_reply(turn, ReplyOutcome::Completed).await,
            }
        }
    }

    async fn close_reply(&self, turn: TurnId, outcome: ReplyOutcome) -> Result<ReplyOutcome, EngineError> {
        let mut session = self.session.lock().await;
        let changed = match outcome {
            ReplyOutcome::Completed => session.chat.messages.finalize_reply(turn).is_some(),
            ReplyOutcome::Failed => session.chat.messages.fail_reply(turn, REPLY_FAILURE_TEXT),
            ReplyOutcome::Cancelled | ReplyOutcome::Refused => session.chat.messages.cancel_reply(turn),
        };
        if changed {
            self.persist(&session).await?;
        }
        Ok(outcome)
    }

    async fn extract_search_data(
        &self,
        turn: TurnId,
        cancel: &CancellationToken,
        payload: TurnPayload,
    ) -> Result<SearchStatus, EngineError> {
        let result = tokio::select! {
            _ = cancel.cancelled() => return Ok(SearchStatus::Unchanged),
            result = self.backend.search_data(payload) => result,
        };

        let candidate = match result {
            Ok(candidate) => candidate,
            Err(e) => {
                tracing::debug!(error = %e, "search data extraction failed, keeping snapshot");
                return Ok(SearchStatus::Unchanged);
            }
        };

        let mut session = self.session.lock().await;
        if !session.owns(turn) {
            return Ok(SearchStatus::Unchanged);
        }

        let schema = &session.chat.search_config.search_data;
        let next = merge(&session.chat.search_data, &candidate, schema);
        if next == session.chat.search_data {
            return Ok(SearchStatus::Unchanged);
        }
        session.chat.search_data = next;
        session.chat.is_search_data_updated = true;

        let status = if session.chat.require_manual_search {
            let schema = &session.chat.search_config.search_data;
            if required_satisfied(&session.chat.search_data, schema) {
                SearchStatus::AwaitingConfirmation
            } else {
                incomplete(&session.chat.search_data, schema)
            }
        } else {
            self.try_trigger(&mut session).await
        };

        self.persist(&session).await?;
        Ok(status)
    }

    async fn extract_intention(
        &self,
        turn: TurnId,
        cancel: &CancellationToken,
        messages: Vec<ChatMessage>,
        current: Snapshot,
    ) -> Result<bool, EngineError> {
        let result = tokio::select! {
            _ = cancel.cancelled() => return Ok(false),
            result = self.backend.customer_intention(messages, current) => result,
        };

        let next = match result {
            Ok(next) => next,
            Err(e) => {
                tracing::debug!(error = %e, "intention extraction failed, keeping snapshot");
                return Ok(false);
            }
        };

        let mut session = self.session.lock().await;
        if !session.owns(turn) || next == session.chat.customer_intention {
            return Ok(false);
        }
        session.chat.customer_intention = next;
        self.persist(&session).await?;
        Ok(true)
    }

    /// Fires the search when required fields are complete and clears the
    /// update flag on success.
    async fn try_trigger(&self, session: &mut SessionState) -> SearchStatus {
        let schema = &session.chat.search_config.search_data;
        if !required_satisfied(&session.chat.search_data, schema) {
            return incomplete(&session.chat.search_data, schema);
        }

        match self.search.trigger(self.session_id, &session.chat.search_data).await {
            Ok(()) => {
                session.chat.is_search_data_updated = false;
                tracing::info!(session_id = %self.session_id, "search triggered");
                SearchStatus::Triggered
            }
            Err(e) => {
                tracing::warn!(error = %e, "search trigger failed");
                SearchStatus::TriggerFailed(e.to_string())
            }
        }
    }

    async fn end_turn(&self, turn: TurnId) {
        let mut session = self.session.lock().await;
        if session.owns(turn) {
            session.active = None;
            session.set_turn_phase(TurnPhase::Idle);
            session.set_extraction_phase(ExtractionPhase::Idle);
        }
    }

    async fn persist(&self, session: &SessionState) -> Result<(), EngineError> {
        save(self.store.as_ref(), &self.key, &session.chat).await?;
        Ok(())
    }
}

fn incomplete(snapshot: &Snapshot, schema: &SearchSchema) -> SearchStatus {
    SearchStatus::Incomplete {
        missing: missing_required(snapshot, schema)
            .into_iter()
            .map(str::to_string)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockAIProvider, MockModerator};
    use crate::adapters::storage::InMemorySessionStore;
    use crate::application::extractor::{INTENTION_FORMAT, SEARCH_DATA_FORMAT};
    use crate::application::WidgetService;
    use crate::domain::content::MatchThreshold;
    use crate::domain::conversation::WidgetProfile;
    use crate::domain::schema::SchemaField;
    use crate::ports::SearchTriggerError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    struct MockSearchTrigger {
        calls: StdMutex<Vec<Snapshot>>,
        fail: bool,
    }

    impl MockSearchTrigger {
        fn new() -> Self {
            Self {
                calls: StdMutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: StdMutex::new(Vec::new()),
                fail: true,
            }
        }

        fn calls(&self) -> Vec<Snapshot> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchTrigger for MockSearchTrigger {
        async fn trigger(&self, _session_id: SessionId, snapshot: &Snapshot) -> Result<(), SearchTriggerError> {
            self.calls.lock().unwrap().push(snapshot.clone());
            if self.fail {
                return Err(SearchTriggerError::Failed("search service down".to_string()));
            }
            Ok(())
        }
    }

    fn search_config() -> SearchConfig {
        SearchConfig::new(
            SearchSchema::new()
                .with_field("location", SchemaField::string("City").required())
                .with_field("guests", SchemaField::number("Party size")),
        )
    }

    fn search_response(location: Option<&str>) -> String {
        json!({ "location": location, "guests": null }).to_string()
    }

    fn intention_response(likes: &[&str]) -> String {
        json!({
            "objective": null, "budget": null, "urgency_level": null, "pain_points": null,
            "likes": if likes.is_empty() { json!(null) } else { json!(likes) },
            "dislikes": null, "priorities": null, "retracted": null
        })
        .to_string()
    }

    /// Routes failing extraction responses so no turn falls back to the
    /// chat reply queue.
    fn quiet_extractions(mut ai: MockAIProvider, turns: usize) -> MockAIProvider {
        for _ in 0..turns {
            ai = ai
                .with_response_for(SEARCH_DATA_FORMAT, search_response(None))
                .with_response_for(INTENTION_FORMAT, intention_response(&[]));
        }
        ai
    }

    struct Harness {
        engine: ConversationEngine,
        ai: Arc<MockAIProvider>,
        moderator: Arc<MockModerator>,
        search: Arc<MockSearchTrigger>,
        store: Arc<InMemorySessionStore>,
    }

    async fn harness_with(
        ai: MockAIProvider,
        moderator: MockModerator,
        search: MockSearchTrigger,
        manual: bool,
    ) -> Harness {
        let ai = Arc::new(ai);
        let moderator = Arc::new(moderator);
        let search = Arc::new(search);
        let store = Arc::new(InMemorySessionStore::new());
        let backend = Arc::new(WidgetService::new(
            ai.clone(),
            moderator.clone(),
            WidgetProfile::default(),
            MatchThreshold::default(),
        ));
        let engine = ConversationEngine::open(
            SessionId::new(),
            EngineSettings {
                search_config: search_config(),
                require_manual_search: manual,
            },
            backend,
            store.clone(),
            search.clone(),
        )
        .await
        .unwrap();
        Harness {
            engine,
            ai,
            moderator,
            search,
            store,
        }
    }

    async fn harness(ai: MockAIProvider) -> Harness {
        harness_with(ai, MockModerator::new(), MockSearchTrigger::new(), false).await
    }

    mod turns {
        use super::*;

        #[tokio::test]
        async fn completed_turn_appends_reply_and_merges_snapshots() {
            let h = harness(
                MockAIProvider::new()
                    .with_response("Lisbon is lovely")
                    .with_response_for(SEARCH_DATA_FORMAT, search_response(Some("Lisbon")))
                    .with_response_for(INTENTION_FORMAT, intention_response(&["food"])),
            )
            .await;

            let outcome = h.engine.send("I want to go to Lisbon, I love food").await.unwrap();

            assert_eq!(outcome.reply, ReplyOutcome::Completed);
            assert_eq!(outcome.search, SearchStatus::Triggered);
            assert!(outcome.intention_updated);

            let state = h.engine.state().await;
            let messages = state.messages.messages();
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[1].content, "Lisbon is lovely");
            assert_eq!(state.search_data.get("location"), Some(&json!("Lisbon")));
            assert_eq!(state.customer_intention.get("likes"), Some(&json!(["food"])));
            assert_eq!(h.engine.status().await, EngineStatus::default());
        }

        #[tokio::test]
        async fn message_is_sanitized_before_use() {
            let h = harness(quiet_extractions(MockAIProvider::new(), 1)).await;

            h.engine.send("  <i>hello</i> ").await.unwrap();

            assert_eq!(h.moderator.calls(), vec!["hello".to_string()]);
            assert_eq!(h.engine.state().await.messages.messages()[0].content, "hello");
        }

        #[tokio::test]
        async fn blank_message_is_rejected() {
            let h = harness(MockAIProvider::new()).await;
            let err = h.engine.send("   ").await.unwrap_err();
            assert!(matches!(err, EngineError::EmptyMessage));
            assert!(h.engine.state().await.messages.is_empty());
        }

        #[tokio::test]
        async fn state_is_persisted() {
            let h = harness(quiet_extractions(MockAIProvider::new().with_response("Hi!"), 1)).await;

            h.engine.send("hello").await.unwrap();

            let key = StorageKey::new(h.engine.session_id(), CHAT_STORAGE_KEY);
            let stored: ChatState = load(h.store.as_ref(), &key).await.unwrap().unwrap();
            assert_eq!(stored, h.engine.state().await);
        }

        #[tokio::test]
        async fn reopening_restores_history() {
            let h = harness(quiet_extractions(MockAIProvider::new().with_response("Hi!"), 1)).await;
            h.engine.send("hello").await.unwrap();

            let reopened = ConversationEngine::open(
                h.engine.session_id(),
                EngineSettings {
                    search_config: search_config(),
                    require_manual_search: false,
                },
                Arc::new(WidgetService::new(
                    h.ai.clone(),
                    h.moderator.clone(),
                    WidgetProfile::default(),
                    MatchThreshold::default(),
                )),
                h.store.clone(),
                h.search.clone(),
            )
            .await
            .unwrap();

            assert_eq!(reopened.state().await.messages.len(), 2);
        }
    }

    mod failures {
        use super::*;
        use crate::adapters::ai::MockError;
        use std::time::Duration;

        #[tokio::test]
        async fn reply_failure_shows_fixed_text() {
            let ai = MockAIProvider::new().with_error(MockError::Unavailable {
                message: "down".to_string(),
            });
            let h = harness(quiet_extractions(ai, 1)).await;

            let outcome = h.engine.send("hello").await.unwrap();

            assert_eq!(outcome.reply, ReplyOutcome::Failed);
            let state = h.engine.state().await;
            assert_eq!(state.messages.messages()[1].content, REPLY_FAILURE_TEXT);
        }

        #[tokio::test]
        async fn extraction_failure_keeps_snapshot() {
            let h = harness(
                MockAIProvider::new()
                    .with_response_for(SEARCH_DATA_FORMAT, search_response(Some("Paris")))
                    .with_response_for(INTENTION_FORMAT, intention_response(&[]))
                    .with_response_for(SEARCH_DATA_FORMAT, "{ not json")
                    .with_response_for(INTENTION_FORMAT, "{ not json"),
            )
            .await;
            h.engine.send("Paris please").await.unwrap();

            let outcome = h.engine.send("and something else").await.unwrap();

            assert_eq!(outcome.search, SearchStatus::Unchanged);
            assert!(!outcome.intention_updated);
            assert_eq!(h.engine.state().await.search_data.get("location"), Some(&json!("Paris")));
        }

        #[tokio::test]
        async fn moderation_failure_stops_the_turn() {
            let h = harness_with(
                MockAIProvider::new(),
                MockModerator::new().failing(),
                MockSearchTrigger::new(),
                false,
            )
            .await;

            let err = h.engine.send("hello").await.unwrap_err();

            assert!(matches!(err, EngineError::Moderation(_)));
            assert!(!err.is_abort());
            assert_eq!(h.ai.call_count(), 0);
            assert_eq!(h.engine.status().await.turn, TurnPhase::Idle);
        }

        #[tokio::test]
        async fn cancel_during_moderation_still_closes_the_turn() {
            let h = Arc::new(
                harness_with(
                    MockAIProvider::new(),
                    MockModerator::new().with_delay(Duration::from_millis(100)),
                    MockSearchTrigger::new(),
                    false,
                )
                .await,
            );

            let running = {
                let h = h.clone();
                tokio::spawn(async move { h.engine.send("hello").await })
            };
            tokio::time::sleep(Duration::from_millis(20)).await;
            h.engine.cancel().await;

            assert!(running.await.unwrap().unwrap_err().is_abort());
            let state = h.engine.state().await;
            assert_eq!(state.messages.replies_per_user_turn(), vec![1]);
            assert_eq!(state.messages.messages()[1].content, "");
            assert_eq!(h.ai.call_count(), 0);
        }
    }

    mod moderation {
        use super::*;

        #[tokio::test]
        async fn flagged_message_gets_refusal_and_no_extraction() {
            let h = harness_with(
                MockAIProvider::new(),
                MockModerator::new().flagging("forbidden"),
                MockSearchTrigger::new(),
                false,
            )
            .await;

            let outcome = h.engine.send("something forbidden").await.unwrap();

            assert_eq!(outcome.reply, ReplyOutcome::Refused);
            assert_eq!(h.ai.call_count_for(SEARCH_DATA_FORMAT), 0);
            assert_eq!(h.ai.call_count_for(INTENTION_FORMAT), 0);
            assert_eq!(h.ai.call_count(), 0);
            let state = h.engine.state().await;
            assert_eq!(state.messages.messages()[1].content, REFUSAL_TEXT);
        }
    }

    mod search_gate {
        use super::*;

        #[tokio::test]
        async fn incomplete_data_does_not_trigger() {
            let h = harness(
                MockAIProvider::new()
                    .with_response_for(SEARCH_DATA_FORMAT, r#"{"location":null,"guests":2}"#)
                    .with_response_for(INTENTION_FORMAT, intention_response(&[])),
            )
            .await;

            let outcome = h.engine.send("two of us").await.unwrap();

            assert_eq!(
                outcome.search,
                SearchStatus::Incomplete {
                    missing: vec!["location".to_string()]
                }
            );
            assert!(h.search.calls().is_empty());
            assert!(h.engine.state().await.is_search_data_updated);
        }

        #[tokio::test]
        async fn automatic_trigger_clears_update_flag() {
            let h = harness(
                MockAIProvider::new()
                    .with_response_for(SEARCH_DATA_FORMAT, search_response(Some("Rome")))
                    .with_response_for(INTENTION_FORMAT, intention_response(&[])),
            )
            .await;

            h.engine.send("Rome").await.unwrap();

            assert_eq!(h.search.calls().len(), 1);
            assert!(!h.engine.state().await.is_search_data_updated);
        }

        #[tokio::test]
        async fn manual_mode_waits_for_confirmation() {
            let h = harness_with(
                MockAIProvider::new()
                    .with_response_for(SEARCH_DATA_FORMAT, search_response(Some("Rome")))
                    .with_response_for(INTENTION_FORMAT, intention_response(&[])),
                MockModerator::new(),
                MockSearchTrigger::new(),
                true,
            )
            .await;

            let outcome = h.engine.send("Rome").await.unwrap();
            assert_eq!(outcome.search, SearchStatus::AwaitingConfirmation);
            assert!(h.search.calls().is_empty());
            assert!(h.engine.state().await.is_search_data_updated);

            let status = h.engine.confirm_search().await.unwrap();
            assert_eq!(status, SearchStatus::Triggered);
            assert_eq!(h.search.calls().len(), 1);
            assert!(!h.engine.state().await.is_search_data_updated);
        }

        #[tokio::test]
        async fn trigger_failure_keeps_update_flag() {
            let h = harness_with(
                MockAIProvider::new()
                    .with_response_for(SEARCH_DATA_FORMAT, search_response(Some("Rome")))
                    .with_response_for(INTENTION_FORMAT, intention_response(&[])),
                MockModerator::new(),
                MockSearchTrigger::failing(),
                false,
            )
            .await;

            let outcome = h.engine.send("Rome").await.unwrap();

            assert!(matches!(outcome.search, SearchStatus::TriggerFailed(_)));
            assert!(h.engine.state().await.is_search_data_updated);
        }

        #[tokio::test]
        async fn unchanged_data_does_not_retrigger() {
            let h = harness(
                MockAIProvider::new()
                    .with_response_for(SEARCH_DATA_FORMAT, search_response(Some("Rome")))
                    .with_response_for(SEARCH_DATA_FORMAT, search_response(None))
                    .with_response_for(INTENTION_FORMAT, intention_response(&[]))
                    .with_response_for(INTENTION_FORMAT, intention_response(&[])),
            )
            .await;

            h.engine.send("Rome").await.unwrap();
            let outcome = h.engine.send("thanks").await.unwrap();

            assert_eq!(outcome.search, SearchStatus::Unchanged);
            assert_eq!(h.search.calls().len(), 1);
        }
    }

    mod cancellation {
        use super::*;
        use std::time::Duration;

        #[tokio::test]
        async fn cancel_keeps_partial_reply_and_reports_abort() {
            let h = Arc::new(
                harness(quiet_extractions(
                    MockAIProvider::new()
                        .with_response("one two three four five six seven eight")
                        .with_chunk_delay(Duration::from_millis(20)),
                    1,
                ))
                .await,
            );

            let running = {
                let h = h.clone();
                tokio::spawn(async move { h.engine.send("hello").await })
            };

            wait_for_partial_reply(&h.engine).await;
            h.engine.cancel().await;

            let err = running.await.unwrap().unwrap_err();
            assert!(err.is_abort());

            let state = h.engine.state().await;
            assert!(state.messages.in_flight().is_none());
            assert_eq!(state.messages.replies_per_user_turn(), vec![1]);
            assert_eq!(h.engine.status().await.turn, TurnPhase::Idle);
        }
    }

    async fn wait_for_partial_reply(engine: &ConversationEngine) {
        for _ in 0..200 {
            let state = engine.state().await;
            if state.messages.in_flight().map(|r| !r.content.is_empty()).unwrap_or(false) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("reply never started streaming");
    }
}
