//! Per-turn session: drives reader, decoder, and accumulator into a sink.

use bytes::Bytes;
use parley_types::{TranscriptSink, TransportError, TurnOutcome};

use crate::delta::DeltaAccumulator;
use crate::frame::{Frame, FrameDecoder};
use crate::transport::{ChunkReader, ReadEvent};

/// Lifecycle of one streamed turn.
///
/// `Open → Closed | Cancelled | Failed`, passing through `Draining` when the
/// body ends with an unterminated line still buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamState {
    /// Reading chunks.
    Open,
    /// Body ended; the trailing partial line is being flushed.
    ///
    /// Transient: only held while [`Assembler::run`] applies the flushed
    /// line, so it is never observed from outside.
    Draining(Bytes),
    /// Logical stream finished and transport released.
    Closed,
    /// Cancelled by the caller.
    Cancelled,
    /// Body read failed.
    Failed(String),
}

/// Owns everything one assistant turn needs while it streams.
///
/// All decode/parse/publish work for a chunk runs to completion before the
/// next chunk is awaited, so frames reach the sink in arrival order.
#[derive(Debug)]
pub struct Assembler {
    reader: ChunkReader,
    decoder: FrameDecoder,
    accumulator: DeltaAccumulator,
    state: StreamState,
}

impl Assembler {
    /// Start a session over an open reader.
    #[must_use]
    pub fn new(reader: ChunkReader) -> Self {
        Self {
            reader,
            decoder: FrameDecoder::new(),
            accumulator: DeltaAccumulator::new(),
            state: StreamState::Open,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Assistant text assembled so far.
    #[must_use]
    pub fn text(&self) -> &str {
        self.accumulator.text()
    }

    /// Stream the turn into `sink` until `[DONE]`, end of body, a read
    /// failure, or cancellation, then call [`TranscriptSink::finalize`].
    ///
    /// The sink's last message must be the assistant placeholder opened by
    /// [`TranscriptSink::begin_assistant_turn`]. Calling `run` again after it
    /// returned does nothing and reports the same outcome.
    pub async fn run<S>(&mut self, sink: &mut S) -> TurnOutcome
    where
        S: TranscriptSink + ?Sized,
    {
        if self.state != StreamState::Open {
            return self.outcome();
        }

        let outcome = self.drive(sink).await;
        sink.finalize();

        tracing::debug!(
            chunks = self.reader.chunks_read(),
            bytes = self.reader.bytes_read(),
            deltas = self.accumulator.applied(),
            dropped = self.accumulator.dropped(),
            state = ?self.state,
            "stream assembly finished"
        );
        outcome
    }

    async fn drive<S>(&mut self, sink: &mut S) -> TurnOutcome
    where
        S: TranscriptSink + ?Sized,
    {
        loop {
            match self.reader.next().await {
                ReadEvent::Chunk(chunk) => {
                    if self.consume(&chunk, sink) {
                        self.reader.close();
                        self.state = StreamState::Closed;
                        return TurnOutcome::Completed;
                    }
                }
                ReadEvent::End => {
                    let trailing = self.decoder.take_pending();
                    if let Some(frame) = Frame::from_trailing(&trailing) {
                        self.state = StreamState::Draining(trailing);
                        self.apply(frame, sink);
                    }
                    self.state = StreamState::Closed;
                    return TurnOutcome::Completed;
                }
                ReadEvent::Cancelled => {
                    let lost = self.decoder.take_pending();
                    tracing::info!(pending = lost.len(), "stream cancelled");
                    self.state = StreamState::Cancelled;
                    return TurnOutcome::Cancelled;
                }
                ReadEvent::Failed(err) => {
                    tracing::warn!(error = %err, "response body read failed");
                    if self.accumulator.text().is_empty() {
                        sink.fail_turn(&err.user_message());
                    }
                    self.state = StreamState::Failed(err.to_string());
                    return TurnOutcome::Failed(err);
                }
            }
        }
    }

    /// Decode one chunk and apply its frames. Returns `true` at `[DONE]`;
    /// frames after the sentinel are discarded.
    fn consume<S>(&mut self, chunk: &[u8], sink: &mut S) -> bool
    where
        S: TranscriptSink + ?Sized,
    {
        self.decoder
            .push(chunk)
            .into_iter()
            .any(|frame| self.apply(frame, sink))
    }

    fn apply<S>(&mut self, frame: Frame, sink: &mut S) -> bool
    where
        S: TranscriptSink + ?Sized,
    {
        if frame.is_done() {
            return true;
        }
        match frame {
            Frame::Data(payload) => {
                self.accumulator.apply_to(&payload, sink);
            }
            Frame::Comment | Frame::Blank | Frame::Ignored => {}
        }
        false
    }

    fn outcome(&self) -> TurnOutcome {
        match &self.state {
            StreamState::Cancelled => TurnOutcome::Cancelled,
            StreamState::Failed(reason) => TurnOutcome::Failed(TransportError::Read(reason.clone())),
            StreamState::Open | StreamState::Draining(_) | StreamState::Closed => {
                TurnOutcome::Completed
            }
        }
    }
}

/// Stream one turn from `reader` into `sink`.
///
/// Shorthand for [`Assembler::new`] followed by [`Assembler::run`].
pub async fn assemble<S>(reader: ChunkReader, sink: &mut S) -> TurnOutcome
where
    S: TranscriptSink + ?Sized,
{
    Assembler::new(reader).run(sink).await
}
