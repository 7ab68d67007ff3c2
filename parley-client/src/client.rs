//! Chat endpoint client struct, builder, and turn driver.

use std::fmt;
use std::time::Duration;

use parley_stream::{ChunkReader, assemble};
use parley_types::{Message, Transcript, TranscriptSink, TransportError, TurnOutcome};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::{ClientConfig, ConfigError};
use crate::error::{map_http_status, map_reqwest_error};
use crate::mapping::ChatRequest;

/// Client for a streaming chat-completion endpoint.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use parley_client::ChatClient;
///
/// let client = ChatClient::new("https://chat.example.com/v1/chat")
///     .bearer_token("sk-...")
///     .timeout(Duration::from_secs(30));
/// ```
pub struct ChatClient {
    /// URL the request is POSTed to.
    pub(crate) endpoint: String,
    /// Bearer token, if the endpoint needs one.
    pub(crate) bearer_token: Option<String>,
    /// Limit on the wait for response headers, and for the body of an
    /// error response.
    pub(crate) timeout: Option<Duration>,
    /// Shared HTTP client.
    pub(crate) client: reqwest::Client,
}

impl ChatClient {
    /// Create a client for `endpoint` with no token and no timeout.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            bearer_token: None,
            timeout: None,
            client: reqwest::Client::new(),
        }
    }

    /// Create a client from explicit settings.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Http`] when the HTTP client cannot be built.
    pub fn from_config(config: ClientConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::Http(e.to_string()))?;
        Ok(Self {
            endpoint: config.endpoint,
            bearer_token: config.bearer_token,
            timeout: config.timeout,
            client,
        })
    }

    /// Create a client from `PARLEY_*` environment variables.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`] and [`from_config`](Self::from_config).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_config(ClientConfig::from_env()?)
    }

    /// Override the endpoint URL.
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    /// Send `Authorization: Bearer <token>` on every request.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Fail a request whose response headers take longer than `limit`.
    ///
    /// The same deadline caps reading the body of a non-2xx response.
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Use a preconfigured HTTP client (proxies, TLS roots, pooling).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// The chat endpoint URL.
    pub(crate) fn chat_url(&self) -> &str {
        &self.endpoint
    }

    fn timed_out(&self) -> TransportError {
        let limit = self.timeout.unwrap_or_default();
        TransportError::Request(format!("no response within {}ms", limit.as_millis()))
    }

    /// POST `history` and return a reader over the streaming body.
    ///
    /// Placeholders in `history` are not sent.
    ///
    /// # Errors
    ///
    /// [`TransportError::Request`] when the request cannot be sent or times
    /// out, [`TransportError::Status`] for a non-2xx response.
    pub async fn open_stream(
        &self,
        history: &[Message],
        cancel: CancellationToken,
    ) -> Result<ChunkReader, TransportError> {
        let url = self.chat_url();
        let body = ChatRequest::from_history(history);

        tracing::debug!(url = %url, messages = body.messages.len(), "sending streaming chat request");

        let mut request = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .header("accept", "text/event-stream")
            .json(&body);
        if let Some(token) = &self.bearer_token {
            request = request.header("authorization", format!("Bearer {token}"));
        }

        let deadline = self.timeout.map(|limit| Instant::now() + limit);
        let response = bounded(deadline, request.send())
            .await
            .ok_or_else(|| self.timed_out())?
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            // A stalled error body falls back to the status-only message.
            let body_text = bounded(deadline, response.text())
                .await
                .and_then(Result::ok)
                .unwrap_or_default();
            return Err(map_http_status(status, &body_text));
        }

        Ok(ChunkReader::new(response.bytes_stream(), cancel))
    }

    /// Run one full turn: append `prompt` as a user message, open the
    /// assistant placeholder, and stream the reply into `transcript`.
    ///
    /// Request failures replace the placeholder with one assistant message
    /// carrying the error. Cancelling `cancel` stops the turn at its next
    /// suspension point, keeping whatever text was already published.
    pub async fn stream_turn(
        &self,
        transcript: &mut Transcript,
        prompt: &str,
        cancel: CancellationToken,
    ) -> TurnOutcome {
        transcript.append_user_turn(prompt);
        let history = transcript.messages();
        transcript.begin_assistant_turn();

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            opened = self.open_stream(&history, cancel.clone()) => Some(opened),
        };

        match opened {
            Some(Ok(reader)) => assemble(reader, transcript).await,
            Some(Err(err)) => {
                tracing::warn!(error = %err, "chat request failed");
                transcript.fail_turn(&err.user_message());
                transcript.finalize();
                TurnOutcome::Failed(err)
            }
            None => {
                tracing::info!("chat request cancelled before the response arrived");
                transcript.finalize();
                TurnOutcome::Cancelled
            }
        }
    }
}

/// Await `fut`, giving up at `deadline` if one is set.
async fn bounded<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(at) => tokio::time::timeout_at(at, fut).await.ok(),
        None => Some(fut.await),
    }
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.endpoint)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
