//! Delta accumulator: extracts text fragments from data-frame payloads.

use parley_types::TranscriptSink;
use serde::Deserialize;

use crate::error::FrameError;

/// The JSON envelope carried by each data frame.
///
/// `{ "choices": [ { "delta": { "content": "..." } } ] }`. Unknown fields are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeltaEnvelope {
    /// Candidate completions; only the first is used.
    pub choices: Vec<DeltaChoice>,
}

/// One entry of [`DeltaEnvelope::choices`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeltaChoice {
    /// The incremental update.
    #[serde(default)]
    pub delta: Delta,
}

/// Incremental update inside a choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Delta {
    /// Newly generated text, if any.
    #[serde(default)]
    pub content: Option<String>,
}

impl DeltaEnvelope {
    /// Parse a data-frame payload.
    ///
    /// # Errors
    ///
    /// [`FrameError::InvalidJson`] for malformed JSON,
    /// [`FrameError::InvalidShape`] for JSON that is not an envelope.
    pub fn parse(payload: &str) -> Result<Self, FrameError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// `choices[0].delta.content`, when present and non-empty.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .filter(|text| !text.is_empty())
    }
}

/// Whether `payload` is a JSON object with a top-level `error` key.
fn is_error_object(payload: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(payload)
        .is_ok_and(|value| value.get("error").is_some())
}

/// Running text of the assistant message being assembled.
///
/// The caller delivers each data frame exactly once; the accumulator does no
/// de-duplication.
#[derive(Debug, Default)]
pub struct DeltaAccumulator {
    text: String,
    applied: usize,
    dropped: usize,
}

impl DeltaAccumulator {
    /// Start with empty text.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `payload` and append its text fragment.
    ///
    /// Returns the appended fragment, or `None` when the frame carried no
    /// text. Nothing is appended on error.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] when the payload is not a delta envelope.
    pub fn apply(&mut self, payload: &str) -> Result<Option<&str>, FrameError> {
        let start = self.text.len();
        if self.append(payload)? {
            Ok(Some(&self.text[start..]))
        } else {
            Ok(None)
        }
    }

    /// Apply `payload` and publish the full running text to `sink`.
    ///
    /// A malformed frame is dropped: it is logged, counted, and never reaches
    /// the sink. Returns whether text was published.
    pub fn apply_to<S>(&mut self, payload: &str, sink: &mut S) -> bool
    where
        S: TranscriptSink + ?Sized,
    {
        match self.append(payload) {
            Ok(true) => sink.update_last_assistant_turn(&self.text),
            Ok(false) => false,
            Err(err) => {
                self.dropped += 1;
                if is_error_object(payload) {
                    tracing::warn!(error = %err, payload, "dropping error object in data frame");
                } else {
                    tracing::debug!(error = %err, "dropping malformed data frame");
                }
                false
            }
        }
    }

    fn append(&mut self, payload: &str) -> Result<bool, FrameError> {
        let envelope = DeltaEnvelope::parse(payload)?;
        let Some(fragment) = envelope.text() else {
            return Ok(false);
        };
        self.text.push_str(fragment);
        self.applied += 1;
        Ok(true)
    }

    /// The text accumulated so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume the accumulator, returning its text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }

    /// Number of fragments appended.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Number of frames dropped as malformed.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}
