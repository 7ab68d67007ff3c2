#![deny(missing_docs)]
//! Shared types for the parley streaming assembler.
//!
//! Provides the role-tagged [`Message`], the [`TranscriptSink`] contract and
//! its in-memory implementation [`Transcript`], the per-turn [`TurnOutcome`],
//! and the [`TransportError`] that is the only error allowed to reach
//! application state.

pub mod error;
pub mod transcript;
pub mod types;

pub use error::TransportError;
pub use transcript::{Snapshot, Transcript, TranscriptSink};
pub use types::{Message, Role, TurnOutcome};
