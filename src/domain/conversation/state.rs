//! Per-session turn state machines.
//!
//! A turn moves `Idle -> AwaitingModeration -> AwaitingReply -> Idle`.
//! Extraction runs beside the reply with its own phase, so the two never
//! serialize behind each other.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// Phase of the reply side of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// No turn in progress; the next user message starts one.
    #[default]
    Idle,
    /// The user message is appended and waits for a moderation verdict.
    AwaitingModeration,
    /// The assistant reply is streaming into the in-flight slot.
    AwaitingReply,
}

impl TurnPhase {
    /// Returns true when a superseding message would cancel work.
    pub fn is_busy(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl StateMachine for TurnPhase {
    fn can_transition_to(&self, target: &Self) -> bool {
        use TurnPhase::*;
        matches!(
            (self, target),
            (Idle, AwaitingModeration)
                // Verdict passed
                | (AwaitingModeration, AwaitingReply)
                // Flagged, or moderation failed
                | (AwaitingModeration, Idle)
                // Stream finished, failed or was cancelled
                | (AwaitingReply, Idle)
                // Superseded by a newer user message
                | (AwaitingModeration, AwaitingModeration)
                | (AwaitingReply, AwaitingModeration)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TurnPhase::*;
        match self {
            Idle => vec![AwaitingModeration],
            AwaitingModeration => vec![AwaitingReply, Idle, AwaitingModeration],
            AwaitingReply => vec![Idle, AwaitingModeration],
        }
    }
}

/// Phase of the extraction side of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPhase {
    #[default]
    Idle,
    AwaitingExtraction,
}

impl StateMachine for ExtractionPhase {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ExtractionPhase::*;
        matches!(
            (self, target),
            (Idle, AwaitingExtraction)
                | (AwaitingExtraction, Idle)
                | (AwaitingExtraction, AwaitingExtraction)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ExtractionPhase::*;
        match self {
            Idle => vec![AwaitingExtraction],
            AwaitingExtraction => vec![Idle, AwaitingExtraction],
        }
    }
}
