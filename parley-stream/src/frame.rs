//! Frame decoder: turns arbitrarily-chunked bytes into classified lines.
//!
//! Wire format, one event per line:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//! : keep-alive comment
//!
//! data: [DONE]
//! ```
//!
//! Buffering is byte-level and splits only on `\n`, which never occurs
//! inside a multi-byte UTF-8 sequence, so a character split across chunks is
//! reassembled before any decoding happens.

use bytes::{Bytes, BytesMut};

/// Payload that ends the logical stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Prefix of a data line. The space is part of the prefix.
const DATA_PREFIX: &str = "data: ";

/// One classified logical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Line starting with `:`; keep-alives and comments.
    Comment,
    /// Empty or whitespace-only line.
    Blank,
    /// `data: ` line; holds the trimmed payload.
    Data(String),
    /// Anything else, including lines that are not valid UTF-8.
    Ignored,
}

impl Frame {
    /// Classify one complete line (without its line terminator).
    #[must_use]
    pub fn classify(line: &str) -> Self {
        if line.trim().is_empty() {
            Self::Blank
        } else if line.starts_with(':') {
            Self::Comment
        } else if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
            Self::Data(payload.trim().to_string())
        } else {
            Self::Ignored
        }
    }

    /// Classify a raw line: strips one trailing `\r`, then decodes UTF-8.
    #[must_use]
    pub fn from_line(raw: &[u8]) -> Self {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        match std::str::from_utf8(raw) {
            Ok(line) => Self::classify(line),
            Err(err) => {
                tracing::warn!(error = %err, len = raw.len(), "ignoring line that is not valid UTF-8");
                Self::Ignored
            }
        }
    }

    /// Classify an unterminated final line flushed at end-of-stream.
    ///
    /// Returns `None` when it holds nothing but whitespace.
    #[must_use]
    pub fn from_trailing(raw: &[u8]) -> Option<Self> {
        match Self::from_line(raw) {
            Self::Blank => None,
            frame => Some(frame),
        }
    }

    /// The payload of a data frame.
    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::Data(payload) => Some(payload),
            _ => None,
        }
    }

    /// Whether this is the `[DONE]` sentinel.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.payload() == Some(DONE_SENTINEL)
    }
}

/// Splits a byte stream into complete lines, holding at most one partial
/// line between pushes.
///
/// Every byte pushed is either inside a returned line (plus its `\n`) or in
/// [`pending`](Self::pending).
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
    /// Prefix of `buffer` already known to contain no newline.
    scanned: usize,
}

impl FrameDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return the raw complete lines it finished.
    ///
    /// Lines exclude the `\n` terminator but keep any `\r`.
    pub fn push_lines(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            let newline = self.scanned + offset;
            let mut line = self.buffer.split_to(newline + 1);
            line.truncate(newline);
            lines.push(line.freeze());
            self.scanned = 0;
        }
        self.scanned = self.buffer.len();
        lines
    }

    /// Append a chunk and return the classified frames it finished.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.push_lines(chunk)
            .iter()
            .map(|line| Frame::from_line(line))
            .collect()
    }

    /// Bytes of the current partial line.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Remove and return the current partial line.
    pub fn take_pending(&mut self) -> Bytes {
        self.scanned = 0;
        self.buffer.split().freeze()
    }

    /// Flush an unterminated final line at normal end-of-stream.
    ///
    /// Returns `None` when nothing but whitespace is pending.
    pub fn finish(&mut self) -> Option<Frame> {
        Frame::from_trailing(&self.take_pending())
    }
}
