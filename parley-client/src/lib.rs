#![deny(missing_docs)]
//! HTTP adapter for parley.
//!
//! [`ChatClient`] POSTs the transcript to a chat-completion endpoint and
//! feeds the streaming body through the `parley-stream` assembler into a
//! [`Transcript`](parley_types::Transcript).
//!
//! ```no_run
//! # async fn demo() -> Result<(), parley_client::ConfigError> {
//! use parley_client::ChatClient;
//! use parley_types::Transcript;
//! use tokio_util::sync::CancellationToken;
//!
//! let client = ChatClient::from_env()?;
//! let mut transcript = Transcript::new();
//! let outcome = client
//!     .stream_turn(&mut transcript, "What is a borrow checker?", CancellationToken::new())
//!     .await;
//! println!("{outcome:?}: {:?}", transcript.last());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub(crate) mod error;
pub(crate) mod mapping;

pub use client::ChatClient;
pub use config::{ClientConfig, ConfigError};
