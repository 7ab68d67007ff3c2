#![deny(missing_docs)]
//! Incremental assembly of `data:`-framed token streams.
//!
//! A chunked response body flows through four stages, one logical line at a
//! time:
//!
//! 1. [`ChunkReader`] pulls non-empty byte chunks until end-of-stream, a read
//!    error, or cancellation.
//! 2. [`FrameDecoder`] buffers partial lines across chunk boundaries and
//!    classifies each complete line as a [`Frame`].
//! 3. [`DeltaAccumulator`] parses each data frame's JSON envelope and appends
//!    its text fragment to the running message.
//! 4. A [`TranscriptSink`](parley_types::TranscriptSink) receives the full
//!    running text after every appended fragment.
//!
//! [`Assembler`] owns one turn's session and drives the stages; [`assemble`]
//! is the one-call form.
//!
//! ```
//! use bytes::Bytes;
//! use parley_stream::{ChunkReader, assemble};
//! use parley_types::{Transcript, TranscriptSink, TurnOutcome};
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio_test_block_on(async {
//! let body = futures::stream::iter(vec![
//!     Ok::<_, std::io::Error>(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel")),
//!     Ok(Bytes::from_static(b"lo\"}}]}\ndata: [DONE]\n")),
//! ]);
//!
//! let mut transcript = Transcript::new();
//! transcript.append_user_turn("greet me");
//! transcript.begin_assistant_turn();
//!
//! let reader = ChunkReader::new(body, CancellationToken::new());
//! let outcome = assemble(reader, &mut transcript).await;
//!
//! assert_eq!(outcome, TurnOutcome::Completed);
//! assert_eq!(transcript.last().unwrap().content, "Hello");
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod assembler;
pub mod delta;
pub mod error;
pub mod frame;
pub mod transport;

pub use assembler::{Assembler, StreamState, assemble};
pub use delta::{DeltaAccumulator, DeltaEnvelope};
pub use error::FrameError;
pub use frame::{DONE_SENTINEL, Frame, FrameDecoder};
pub use transport::{ChunkReader, ReadEvent};
