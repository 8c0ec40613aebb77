//! Application layer - handlers and services over the ports.
//!
//! The stateless backend operations live in `handlers` and are bundled by
//! [`WidgetService`]. The stateful, per-session pieces are the
//! [`ConversationEngine`] and the [`ContentCoordinator`].

pub mod content_coordinator;
pub mod content_generator;
pub mod conversation_engine;
pub mod extractor;
pub mod handlers;
pub mod match_scorer;
pub mod moderation_gate;
pub mod widget_service;

pub use content_coordinator::{ContentCoordinator, ContentOutcome, CoordinatorError};
pub use content_generator::{ContentGenerator, GenerationError};
pub use conversation_engine::{
    ConversationEngine, EngineError, EngineSettings, EngineStatus, ReplyOutcome, SearchStatus,
    TurnOutcome,
};
pub use extractor::{ExtractionError, ExtractionRequest, StructuredExtractor};
pub use match_scorer::{MatchAnalysis, MatchScoreError, MatchScorer};
pub use moderation_gate::ModerationGate;
pub use widget_service::WidgetService;
