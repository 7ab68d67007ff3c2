#![deny(missing_docs)]
//! # parley: umbrella crate
//!
//! Single import surface for the parley streaming assembler. The shared
//! types and the stream pipeline are always available; the HTTP adapter is
//! behind the `client` feature (on by default).

pub use parley_stream as stream;
pub use parley_types as types;

#[cfg(feature = "client")]
pub use parley_client as client;

/// Happy-path imports for streaming a chat turn into a transcript.
pub mod prelude {
    pub use parley_stream::{Assembler, ChunkReader, StreamState, assemble};
    pub use parley_types::{
        Message, Role, Snapshot, Transcript, TranscriptSink, TransportError, TurnOutcome,
    };

    #[cfg(feature = "client")]
    pub use parley_client::{ChatClient, ClientConfig, ConfigError};
}
