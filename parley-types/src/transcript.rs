//! The consumer-visible transcript.
//!
//! [`TranscriptSink`] is the contract the stream assembler writes through.
//! [`Transcript`] is the in-memory implementation: a single mutable cell
//! (a [`tokio::sync::watch`] channel) holding the message list, so that
//! readers observe whole snapshots while exactly one task writes.

use tokio::sync::watch;

use crate::types::{Message, Role};

/// Write side of a transcript, as seen by one assistant turn.
///
/// Implementations are mutated by a single logical task. Callers serialize
/// turns; nothing here locks.
pub trait TranscriptSink {
    /// Push a new user message.
    fn append_user_turn(&mut self, text: &str);

    /// Push an empty assistant message that later deltas will fill in.
    fn begin_assistant_turn(&mut self);

    /// Replace the content of the last message with `full_text`.
    ///
    /// Applies only when the last message is an assistant message. Returns
    /// whether the update was applied.
    fn update_last_assistant_turn(&mut self, full_text: &str) -> bool;

    /// Report a failed turn.
    ///
    /// Removes a trailing empty assistant placeholder, then appends one
    /// assistant message carrying `error_text`.
    fn fail_turn(&mut self, error_text: &str);

    /// Called once when assembly of the current turn has ended, whether it
    /// completed, was cancelled, or failed.
    fn finalize(&mut self) {}
}

/// A point-in-time view of a [`Transcript`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Messages in order.
    pub messages: Vec<Message>,
    /// Whether an assistant turn is currently being assembled.
    pub streaming: bool,
}

/// In-memory transcript that publishes every mutation to subscribers.
///
/// # Example
///
/// ```
/// use parley_types::{Role, Transcript, TranscriptSink};
///
/// let mut transcript = Transcript::new();
/// let updates = transcript.subscribe();
///
/// transcript.append_user_turn("hello?");
/// transcript.begin_assistant_turn();
/// transcript.update_last_assistant_turn("Hi");
///
/// assert_eq!(updates.borrow().messages.len(), 2);
/// assert_eq!(transcript.last().unwrap().role, Role::Assistant);
/// ```
#[derive(Debug)]
pub struct Transcript {
    cell: watch::Sender<Snapshot>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::from_messages(Vec::new())
    }

    /// Create a transcript seeded with prior messages.
    #[must_use]
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let (cell, _) = watch::channel(Snapshot {
            messages,
            streaming: false,
        });
        Self { cell }
    }

    /// Subscribe to snapshots published after every mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.cell.subscribe()
    }

    /// Clone the current state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.cell.borrow().clone()
    }

    /// Clone the current messages.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.cell.borrow().messages.clone()
    }

    /// Clone the last message, if any.
    #[must_use]
    pub fn last(&self) -> Option<Message> {
        self.cell.borrow().messages.last().cloned()
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cell.borrow().messages.len()
    }

    /// Whether the transcript has no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cell.borrow().messages.is_empty()
    }

    /// Whether an assistant turn is in flight.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.cell.borrow().streaming
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptSink for Transcript {
    fn append_user_turn(&mut self, text: &str) {
        self.cell
            .send_modify(|state| state.messages.push(Message::user(text)));
    }

    fn begin_assistant_turn(&mut self) {
        self.cell.send_modify(|state| {
            state.messages.push(Message::assistant(""));
            state.streaming = true;
        });
    }

    fn update_last_assistant_turn(&mut self, full_text: &str) -> bool {
        let mut applied = false;
        self.cell.send_if_modified(|state| match state.messages.last_mut() {
            Some(last) if last.role == Role::Assistant => {
                applied = true;
                if last.content == full_text {
                    return false;
                }
                full_text.clone_into(&mut last.content);
                true
            }
            _ => false,
        });
        applied
    }

    fn fail_turn(&mut self, error_text: &str) {
        self.cell.send_modify(|state| {
            if state.messages.last().is_some_and(Message::is_placeholder) {
                state.messages.pop();
            }
            state.messages.push(Message::assistant(error_text));
            state.streaming = false;
        });
    }

    fn finalize(&mut self) {
        self.cell.send_if_modified(|state| {
            let was_streaming = state.streaming;
            state.streaming = false;
            was_streaming
        });
    }
}
