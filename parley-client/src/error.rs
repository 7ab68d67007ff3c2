//! Internal error helpers for mapping HTTP/reqwest errors to [`TransportError`].

use parley_types::TransportError;
use serde::Deserialize;

/// Error body of a non-2xx response.
#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorField,
}

/// `{"error": "text"}` or `{"error": {"message": "text"}}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Text(String),
    Object { message: String },
}

/// Map a non-2xx status and its body to a [`TransportError`].
///
/// Uses the server's error string when the body carries one, otherwise a
/// message naming the status.
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> TransportError {
    let message = server_message(body)
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
    TransportError::Status {
        status: status.as_u16(),
        message,
    }
}

fn server_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let message = match parsed.error {
        ErrorField::Text(text) => text,
        ErrorField::Object { message } => message,
    };
    Some(message).filter(|m| !m.trim().is_empty())
}

/// Map a [`reqwest::Error`] raised before the body started streaming.
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Request(format!("timed out: {err}"))
    } else {
        TransportError::Request(err.to_string())
    }
}
