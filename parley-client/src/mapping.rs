//! Request body for the chat endpoint.

use parley_types::Message;
use serde::Serialize;

/// `{ "messages": [{ "role": ..., "content": ... }, ...] }`
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub(crate) messages: Vec<&'a Message>,
}

impl<'a> ChatRequest<'a> {
    /// Build the body from prior transcript messages, skipping empty
    /// assistant placeholders.
    pub(crate) fn from_history(history: &'a [Message]) -> Self {
        Self {
            messages: history.iter().filter(|m| !m.is_placeholder()).collect(),
        }
    }
}
