use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The sender of a [`Message`].
///
/// Conversation turns only ever produce two kinds of messages: the caller's
/// input (`User`) and the model's reply (`Assistant`). System-level
/// instructions are not part of the persisted history; they live in the
/// prompt preamble (see [`crate::prompt`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Caller-supplied input.
    User,
    /// Model-produced reply.
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// A single message in a conversation history.
///
/// Messages are immutable once created: a turn appends new messages but never
/// edits or reorders existing ones. The optional `metadata` payload carries
/// provider-specific details (model id, token usage, timing) without widening
/// the core shape.
///
/// # Examples
///
/// ```
/// use chatweave::message::{Message, Role};
///
/// let question = Message::user("What's the weather like?");
/// assert!(question.has_role(Role::User));
///
/// let answer = Message::assistant("Sunny, 24°C.")
///     .with_metadata(serde_json::json!({"provider": "mock"}));
/// assert!(answer.metadata.is_some());
/// ```
///
/// # Serialization
///
/// Messages round-trip through serde for checkpoint persistence:
///
/// ```
/// use chatweave::message::Message;
///
/// let msg = Message::user("test");
/// let json = serde_json::to_string(&msg).unwrap();
/// let parsed: Message = serde_json::from_str(&json).unwrap();
/// assert_eq!(msg, parsed);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who produced the message.
    pub role: Role,
    /// The text content of the message.
    pub content: String,
    /// Optional structured payload attached at creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Message {
    /// Creates a new message with the specified role and content.
    #[must_use]
    pub fn new(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            metadata: None,
        }
    }

    /// Creates a user message with the specified content.
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message with the specified content.
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Attaches a structured metadata payload.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Returns true if this message has the specified role.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn constructors_set_role_and_content() {
        let user = Message::user("Hello");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.content, "Hello");
        assert!(user.metadata.is_none());

        let assistant = Message::assistant("Hi there!");
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.content, "Hi there!");
    }

    #[test]
    fn role_checking() {
        let msg = Message::user("Hello");
        assert!(msg.has_role(Role::User));
        assert!(!msg.has_role(Role::Assistant));
    }

    #[test]
    fn metadata_round_trips_through_serde() {
        let original = Message::assistant("ok").with_metadata(json!({"model": "m1", "tokens": 42}));
        let encoded = serde_json::to_string(&original).expect("serialize");
        let decoded: Message = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(original, decoded);
    }

    #[test]
    fn role_serializes_lowercase() {
        let encoded = serde_json::to_string(&Role::Assistant).expect("serialize");
        assert_eq!(encoded, "\"assistant\"");
        let encoded = serde_json::to_string(&Message::user("x")).expect("serialize");
        assert!(encoded.contains("\"role\":\"user\""));
    }

    #[test]
    fn absent_metadata_is_omitted() {
        let encoded = serde_json::to_string(&Message::user("x")).expect("serialize");
        assert!(!encoded.contains("metadata"));
    }
}
