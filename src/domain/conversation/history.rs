//! Conversation history with a single in-flight reply slot.
//!
//! Finalized messages are append-only. The assistant reply currently being
//! streamed lives in its own slot, tagged with the turn that opened it, and
//! leaves the slot only through [`ConversationHistory::finalize_reply`],
//! [`ConversationHistory::fail_reply`] or [`ConversationHistory::cancel_reply`].
//!
//! Every user message ends up followed by exactly one assistant message.
//! A turn cut short keeps whatever text it streamed, possibly none.

use serde::{Deserialize, Serialize};

use super::message::{ChatMessage, Role};
use crate::domain::foundation::TurnId;

/// The assistant reply currently streaming for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightReply {
    pub turn: TurnId,
    pub content: String,
}

/// Ordered chat history.
///
/// Serializes as the visible message list: finalized messages followed by
/// the partial reply, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ChatMessage>", into = "Vec<ChatMessage>")]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
    in_flight: Option<InFlightReply>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalized messages only.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Finalized messages plus the partial reply as the UI shows them.
    pub fn visible_messages(&self) -> Vec<ChatMessage> {
        let mut visible = self.messages.clone();
        if let Some(reply) = &self.in_flight {
            visible.push(ChatMessage::assistant(reply.content.clone()));
        }
        visible
    }

    pub fn in_flight(&self) -> Option<&InFlightReply> {
        self.in_flight.as_ref()
    }

    pub fn has_user_turn(&self) -> bool {
        self.messages.iter().any(ChatMessage::is_user)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.in_flight.is_none()
    }

    /// Appends a user message.
    ///
    /// The previous turn is closed first, so tokens of two replies can never
    /// interleave and no user message is left without a reply.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.close_open_turn();
        self.messages.push(ChatMessage::user(content));
    }

    /// Closes the latest turn if it has no reply yet.
    ///
    /// A partial reply is kept as is. A turn that never opened a reply slot
    /// gets an empty one.
    pub fn close_open_turn(&mut self) {
        self.freeze_in_flight();
        if self.messages.last().is_some_and(ChatMessage::is_user) {
            self.messages.push(ChatMessage::assistant(String::new()));
        }
    }

    /// Appends a complete assistant message, such as a refusal.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.freeze_in_flight();
        self.messages.push(ChatMessage::assistant(content));
    }

    /// Opens the reply slot for `turn`, freezing any previous partial reply.
    pub fn begin_reply(&mut self, turn: TurnId) {
        self.freeze_in_flight();
        self.in_flight = Some(InFlightReply {
            turn,
            content: String::new(),
        });
    }

    /// Appends streamed text to the reply of `turn`.
    ///
    /// Returns false, leaving the history untouched, when `turn` does not
    /// own the slot.
    pub fn append_token(&mut self, turn: TurnId, delta: &str) -> bool {
        match self.in_flight.as_mut() {
            Some(reply) if reply.turn == turn => {
                reply.content.push_str(delta);
                true
            }
            _ => false,
        }
    }

    /// Moves the completed reply of `turn` into the history.
    pub fn finalize_reply(&mut self, turn: TurnId) -> Option<&ChatMessage> {
        if !self.owns_slot(turn) {
            return None;
        }
        let reply = self.in_flight.take()?;
        self.messages.push(ChatMessage::assistant(reply.content));
        self.messages.last()
    }

    /// Replaces the partial reply of `turn` with a fixed failure message.
    pub fn fail_reply(&mut self, turn: TurnId, fallback: &str) -> bool {
        if !self.owns_slot(turn) {
            return false;
        }
        self.in_flight = None;
        self.messages.push(ChatMessage::assistant(fallback));
        true
    }

    /// Closes the slot of a superseded turn.
    ///
    /// Text already streamed stays as that turn's reply, even when empty.
    pub fn cancel_reply(&mut self, turn: TurnId) -> bool {
        if !self.owns_slot(turn) {
            return false;
        }
        self.freeze_in_flight();
        true
    }

    fn owns_slot(&self, turn: TurnId) -> bool {
        self.in_flight.as_ref().map(|r| r.turn == turn).unwrap_or(false)
    }

    fn freeze_in_flight(&mut self) {
        if let Some(reply) = self.in_flight.take() {
            self.messages.push(ChatMessage::assistant(reply.content));
        }
    }

    /// Counts assistant messages following each user message.
    pub fn replies_per_user_turn(&self) -> Vec<usize> {
        let mut counts = Vec::new();
        for message in &self.messages {
            match message.role {
                Role::User => counts.push(0),
                Role::Assistant => {
                    if let Some(last) = counts.last_mut() {
                        *last += 1;
                    }
                }
                Role::System => {}
            }
        }
        counts
    }
}

impl From<Vec<ChatMessage>> for ConversationHistory {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            in_flight: None,
        }
    }
}

impl From<ConversationHistory> for Vec<ChatMessage> {
    fn from(history: ConversationHistory) -> Self {
        history.visible_messages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tokens_grow_the_in_flight_reply_in_order() {
        let mut history = ConversationHistory::new();
        let turn = TurnId::new();
        history.push_user("hi");
        history.begin_reply(turn);

        assert!(history.append_token(turn, "Hel"));
        assert!(history.append_token(turn, "lo"));
        assert_eq!(history.in_flight().unwrap().content, "Hello");

        let finalized = history.finalize_reply(turn).unwrap();
        assert_eq!(finalized.content, "Hello");
        assert!(history.in_flight().is_none());
    }

    #[test]
    fn stale_turn_cannot_write_into_the_slot() {
        let mut history = ConversationHistory::new();
        let old = TurnId::new();
        let new = TurnId::new();
        history.begin_reply(old);
        history.append_token(old, "first");
        history.push_user("actually");
        history.begin_reply(new);

        assert!(!history.append_token(old, " stale"));
        assert!(history.finalize_reply(old).is_none());
        assert_eq!(history.in_flight().unwrap().content, "");
    }

    #[test]
    fn cancel_keeps_streamed_text_as_that_turns_reply() {
        let mut history = ConversationHistory::new();
        let turn = TurnId::new();
        history.push_user("hi");
        history.begin_reply(turn);
        history.append_token(turn, "partial");

        assert!(history.cancel_reply(turn));
        assert_eq!(history.messages().last(), Some(&ChatMessage::assistant("partial")));
        assert!(history.in_flight().is_none());
    }

    #[test]
    fn cancel_keeps_an_empty_slot_as_the_reply() {
        let mut history = ConversationHistory::new();
        let turn = TurnId::new();
        history.push_user("hi");
        history.begin_reply(turn);

        assert!(history.cancel_reply(turn));
        assert_eq!(history.messages().last(), Some(&ChatMessage::assistant("")));
        assert_eq!(history.replies_per_user_turn(), vec![1]);
    }

    #[test]
    fn new_message_before_first_token_closes_previous_turn() {
        let mut history = ConversationHistory::new();
        let first = TurnId::new();
        history.push_user("q1");
        history.begin_reply(first);
        history.push_user("q2");

        assert_eq!(history.replies_per_user_turn(), vec![1, 0]);
        assert_eq!(history.messages()[1], ChatMessage::assistant(""));
        assert!(!history.cancel_reply(first));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn new_message_before_any_slot_closes_previous_turn() {
        let mut history = ConversationHistory::new();
        history.push_user("q1");
        history.push_user("q2");

        assert_eq!(history.replies_per_user_turn(), vec![1, 0]);
    }

    #[test]
    fn close_open_turn_leaves_answered_turns_alone() {
        let mut history = ConversationHistory::new();
        history.push_user("hi");
        history.push_assistant("hello");

        history.close_open_turn();
        history.close_open_turn();

        assert_eq!(history.len(), 2);
    }

    #[test]
    fn fail_replaces_partial_text_with_fallback() {
        let mut history = ConversationHistory::new();
        let turn = TurnId::new();
        history.push_user("hi");
        history.begin_reply(turn);
        history.append_token(turn, "garbl");

        assert!(history.fail_reply(turn, "Sorry, something went wrong."));
        assert_eq!(
            history.messages().last().unwrap().content,
            "Sorry, something went wrong."
        );
    }

    #[test]
    fn replies_per_user_turn_counts_assistant_messages() {
        let mut history = ConversationHistory::new();
        history.push_user("a");
        history.push_assistant("b");
        history.push_user("c");
        history.push_assistant("d");
        history.push_assistant("e");
        assert_eq!(history.replies_per_user_turn(), vec![1, 2]);
    }

    #[test]
    fn serializes_visible_messages() {
        let mut history = ConversationHistory::new();
        let turn = TurnId::new();
        history.push_user("hi");
        history.begin_reply(turn);
        history.append_token(turn, "Hel");

        assert_eq!(
            serde_json::to_value(&history).unwrap(),
            json!([
                { "role": "user", "content": "hi" },
                { "role": "assistant", "content": "Hel" }
            ])
        );
    }

    #[test]
    fn deserializes_from_message_array() {
        let history: ConversationHistory =
            serde_json::from_value(json!([{ "role": "user", "content": "hi" }])).unwrap();
        assert!(history.has_user_turn());
        assert!(history.in_flight().is_none());
    }
}
