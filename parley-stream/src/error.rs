//! Frame-level errors.
//!
//! These never leave the assembler: a frame that fails here is dropped and
//! streaming continues.

/// Why a `data:` payload could not be turned into a delta.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The payload is not valid JSON.
    #[error("invalid JSON in data frame: {0}")]
    InvalidJson(String),
    /// The payload is JSON but not a delta envelope.
    #[error("unexpected data frame shape: {0}")]
    InvalidShape(String),
}

impl From<serde_json::Error> for FrameError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() {
            Self::InvalidShape(err.to_string())
        } else {
            Self::InvalidJson(err.to_string())
        }
    }
}
