//! Transport-level errors.

/// Generic text shown when the backend gave no usable error string.
pub const FALLBACK_ERROR_MESSAGE: &str = "Something went wrong while generating a response.";

/// A failure of the outer HTTP exchange.
///
/// This is the only error that crosses into application state: it is shown
/// to the user as one synthetic assistant message and ends the current turn.
/// Framing and payload errors never surface here.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The backend answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Server-reported error string, or a fallback naming the status.
        message: String,
    },
    /// The request could not be sent or no response headers arrived.
    #[error("request failed: {0}")]
    Request(String),
    /// Reading the response body failed mid-stream.
    #[error("stream read error: {0}")]
    Read(String),
}

impl TransportError {
    /// Text for the synthetic assistant message that reports this error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Status { .. } => FALLBACK_ERROR_MESSAGE.to_string(),
            Self::Request(_) | Self::Read(_) => {
                format!("{FALLBACK_ERROR_MESSAGE} ({self})")
            }
        }
    }

    /// Whether submitting the same turn again might succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || (500..=599).contains(status),
            Self::Request(_) | Self::Read(_) => true,
        }
    }
}
