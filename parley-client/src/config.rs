//! Client configuration and environment loading.

use std::time::Duration;

/// Environment variable holding the chat endpoint URL. Required.
pub const ENDPOINT_VAR: &str = "PARLEY_CHAT_ENDPOINT";

/// Environment variable holding the bearer token. Optional.
pub const TOKEN_VAR: &str = "PARLEY_API_TOKEN";

/// Environment variable holding the response timeout in whole seconds.
/// Optional.
pub const TIMEOUT_VAR: &str = "PARLEY_TIMEOUT_SECS";

/// Errors raised while building a client.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is unset or blank.
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),
    /// The timeout is not a positive whole number of seconds.
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// The HTTP client could not be constructed.
    #[error("http client: {0}")]
    Http(String),
}

/// Settings for a [`ChatClient`](crate::ChatClient).
///
/// `timeout` bounds the wait for response headers and for the body of an
/// error response. A successful response that is already streaming is never
/// cut off by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Full URL the chat request is POSTed to.
    pub endpoint: String,
    /// Sent as `Authorization: Bearer <token>` when set.
    pub bearer_token: Option<String>,
    /// Limit on the wait for response headers.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    /// Configuration for `endpoint` with no token and no timeout.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            bearer_token: None,
            timeout: None,
        }
    }

    /// Read [`ENDPOINT_VAR`], [`TOKEN_VAR`] and [`TIMEOUT_VAR`] from the
    /// process environment.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingVar`] when the endpoint is unset,
    /// [`ConfigError::InvalidTimeout`] when the timeout does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    ///
    /// Blank values count as unset.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let endpoint = read(ENDPOINT_VAR).ok_or(ConfigError::MissingVar(ENDPOINT_VAR))?;
        let timeout = read(TIMEOUT_VAR).map(|raw| parse_timeout(&raw)).transpose()?;

        Ok(Self {
            endpoint,
            bearer_token: read(TOKEN_VAR),
            timeout,
        })
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(raw.to_string())),
    }
}
