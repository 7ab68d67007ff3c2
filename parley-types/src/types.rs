//! Conversation types shared by the stream assembler and the HTTP client.

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message typed by the user.
    User,
    /// Message produced by the model backend.
    Assistant,
}

/// A single role-tagged message in a transcript.
///
/// This is also the wire shape of each entry in the request body's
/// `messages` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author.
    pub role: Role,
    /// Plain text content.
    pub content: String,
}

impl Message {
    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Whether this is an assistant message with no content yet.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.role == Role::Assistant && self.content.is_empty()
    }
}

/// How one assembled assistant turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The logical stream ended with `[DONE]` or the transport closed normally.
    Completed,
    /// The caller cancelled the turn. Already-published text is kept.
    Cancelled,
    /// The request or the body read failed.
    Failed(TransportError),
}

impl TurnOutcome {
    /// Whether the turn finished normally.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn message_wire_shape() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn placeholder_detection() {
        assert!(Message::assistant("").is_placeholder());
        assert!(!Message::assistant("x").is_placeholder());
        assert!(!Message::user("").is_placeholder());
    }

    #[test]
    fn outcome_completed() {
        assert!(TurnOutcome::Completed.is_completed());
        assert!(!TurnOutcome::Cancelled.is_completed());
    }
}
