//! Per-conversation state carried between turns.
//!
//! [`ConversationState`] is the unit of checkpointing: the turn pipeline loads
//! it by thread id before a turn, appends to it during the turn, and persists
//! it wholesale afterwards. The only reducer applied to the message history is
//! [`ConversationState::append_messages`]: new messages are concatenated after
//! all restored messages, never reordered, never deduplicated.

use serde::{Deserialize, Serialize};

use crate::message::{Message, Role};

/// Snapshot of one conversation thread: the full message history plus the
/// caller-supplied context string for the current turn.
///
/// # Examples
///
/// ```
/// use chatweave::message::Message;
/// use chatweave::state::ConversationState;
///
/// let mut state = ConversationState::new_with_user_message("Hello");
/// state.append_messages(vec![Message::assistant("Hi!")]);
/// assert_eq!(state.messages.len(), 2);
/// assert_eq!(state.last_message().unwrap().content, "Hi!");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Chronologically ordered message history, append-only within a turn.
    pub messages: Vec<Message>,
    /// Optional context supplied by the caller; overwritten each turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_context: Option<String>,
}

impl ConversationState {
    /// Creates an empty conversation state (the "new conversation" case).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state seeded with a single user message.
    #[must_use]
    pub fn new_with_user_message(user_text: &str) -> Self {
        Self {
            messages: vec![Message::user(user_text)],
            user_context: None,
        }
    }

    /// Sets the caller-supplied context string.
    #[must_use]
    pub fn with_user_context(mut self, user_context: impl Into<String>) -> Self {
        self.user_context = Some(user_context.into());
        self
    }

    /// Appends messages after the existing history.
    ///
    /// This is the sole state reducer in the turn pipeline: ordering is
    /// preserved exactly and duplicates are kept.
    pub fn append_messages(&mut self, messages: Vec<Message>) {
        self.messages.extend(messages);
    }

    /// The most recent message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The most recent message produced by the assistant, if any.
    #[must_use]
    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.has_role(Role::Assistant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order() {
        let mut state = ConversationState::new_with_user_message("one");
        state.append_messages(vec![Message::assistant("two"), Message::user("three")]);
        let contents: Vec<&str> = state.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[test]
    fn append_does_not_deduplicate() {
        let mut state = ConversationState::new();
        state.append_messages(vec![Message::user("same"), Message::user("same")]);
        assert_eq!(state.messages.len(), 2);
    }

    #[test]
    fn last_assistant_message_skips_trailing_user_input() {
        let mut state = ConversationState::new_with_user_message("q1");
        state.append_messages(vec![Message::assistant("a1"), Message::user("q2")]);
        assert_eq!(state.last_message().unwrap().content, "q2");
        assert_eq!(state.last_assistant_message().unwrap().content, "a1");
    }

    #[test]
    fn serde_round_trip() {
        let state = ConversationState::new_with_user_message("hi").with_user_context("vip");
        let json = serde_json::to_string(&state).expect("serialize");
        let parsed: ConversationState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(state, parsed);
    }

    #[test]
    fn empty_state_has_no_last_message() {
        assert!(ConversationState::new().last_message().is_none());
    }
}
