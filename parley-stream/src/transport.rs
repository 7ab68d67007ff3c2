//! Transport reader: pulls opaque byte chunks from a response body.
//!
//! The reader knows nothing about framing. It owns the body stream and drops
//! it as soon as the sequence terminates, so the underlying connection is
//! released on end-of-stream, read error, and cancellation alike (and when
//! the reader itself is dropped mid-stream).

use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use parley_types::TransportError;
use tokio_util::sync::CancellationToken;

/// Boxed body stream with errors already rendered to text.
type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, String>> + Send>>;

/// One step of the chunk sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    /// A non-empty chunk, in arrival order.
    Chunk(Bytes),
    /// The body ended normally.
    End,
    /// The cancellation token fired.
    Cancelled,
    /// Reading the body failed. No part of the failed read is delivered.
    Failed(TransportError),
}

impl ReadEvent {
    /// Whether this event ends the sequence.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Chunk(_))
    }
}

/// Lazy, non-restartable reader over a response body.
///
/// Each call to [`next`](Self::next) suspends only while waiting for the next
/// chunk, racing the cancellation token. Once a terminal event has been
/// returned, every later call returns that same event without touching the
/// (already released) body.
pub struct ChunkReader {
    body: Option<ByteStream>,
    cancel: CancellationToken,
    terminal: Option<ReadEvent>,
    chunks: usize,
    bytes: usize,
}

impl ChunkReader {
    /// Wrap a body stream, typically `reqwest::Response::bytes_stream()`.
    pub fn new<S, E>(body: S, cancel: CancellationToken) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: fmt::Display,
    {
        let body = body.map(|item| item.map_err(|e| e.to_string()));
        Self {
            body: Some(Box::pin(body)),
            cancel,
            terminal: None,
            chunks: 0,
            bytes: 0,
        }
    }

    /// Wait for the next chunk or a terminal event.
    ///
    /// Empty chunks from the body are skipped. Cancellation wins over a chunk
    /// that is ready at the same time.
    pub async fn next(&mut self) -> ReadEvent {
        loop {
            if let Some(terminal) = &self.terminal {
                return terminal.clone();
            }
            let cancel = &self.cancel;
            let Some(body) = self.body.as_mut() else {
                return ReadEvent::End;
            };

            let polled = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                item = body.next() => Some(item),
            };

            let event = match polled {
                None => ReadEvent::Cancelled,
                Some(Some(Ok(chunk))) if chunk.is_empty() => continue,
                Some(Some(Ok(chunk))) => {
                    self.chunks += 1;
                    self.bytes += chunk.len();
                    tracing::trace!(len = chunk.len(), "received body chunk");
                    return ReadEvent::Chunk(chunk);
                }
                Some(Some(Err(reason))) => ReadEvent::Failed(TransportError::Read(reason)),
                Some(None) => ReadEvent::End,
            };
            self.release(event.clone());
            return event;
        }
    }

    /// Stop reading and release the body without waiting for it to end.
    ///
    /// Used once the logical stream is over (`[DONE]`) while the transport
    /// may still be open.
    pub fn close(&mut self) {
        if self.terminal.is_none() {
            self.release(ReadEvent::End);
        }
    }

    /// Whether a terminal event has been reached.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminal.is_some()
    }

    /// Number of non-empty chunks delivered so far.
    #[must_use]
    pub fn chunks_read(&self) -> usize {
        self.chunks
    }

    /// Number of body bytes delivered so far.
    #[must_use]
    pub fn bytes_read(&self) -> usize {
        self.bytes
    }

    fn release(&mut self, terminal: ReadEvent) {
        self.body = None;
        self.terminal = Some(terminal);
    }
}

impl fmt::Debug for ChunkReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkReader")
            .field("open", &self.body.is_some())
            .field("terminal", &self.terminal)
            .field("chunks", &self.chunks)
            .field("bytes", &self.bytes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send {
        futures::stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    /// Sets its flag when dropped.
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Wraps a body and reports when it is dropped.
    struct Flagged<S> {
        inner: S,
        _flag: DropFlag,
    }

    impl<S: Stream + Unpin> Stream for Flagged<S> {
        type Item = S::Item;

        fn poll_next(
            mut self: Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Option<Self::Item>> {
            self.inner.poll_next_unpin(cx)
        }
    }

    type BodyItem = Result<Bytes, std::io::Error>;

    /// `items`, then a body that never ends.
    fn pending_after(
        items: Vec<BodyItem>,
        flag: Arc<AtomicBool>,
    ) -> Flagged<impl Stream<Item = BodyItem> + Unpin + Send> {
        Flagged {
            inner: futures::stream::iter(items).chain(futures::stream::pending()),
            _flag: DropFlag(flag),
        }
    }

    /// `items`, then end of body.
    fn finite(
        items: Vec<BodyItem>,
        flag: Arc<AtomicBool>,
    ) -> Flagged<impl Stream<Item = BodyItem> + Unpin + Send> {
        Flagged {
            inner: futures::stream::iter(items),
            _flag: DropFlag(flag),
        }
    }

    fn one_line() -> Vec<BodyItem> {
        vec![Ok(Bytes::from_static(b"data: x\n"))]
    }

    #[tokio::test]
    async fn yields_chunks_in_order_then_end() {
        let mut reader = ChunkReader::new(chunks(&["ab", "cd"]), CancellationToken::new());
        assert_eq!(reader.next().await, ReadEvent::Chunk(Bytes::from_static(b"ab")));
        assert_eq!(reader.next().await, ReadEvent::Chunk(Bytes::from_static(b"cd")));
        assert_eq!(reader.next().await, ReadEvent::End);
        assert!(reader.is_terminated());
        assert_eq!(reader.chunks_read(), 2);
        assert_eq!(reader.bytes_read(), 4);
    }

    #[tokio::test]
    async fn skips_empty_chunks() {
        let mut reader = ChunkReader::new(chunks(&["", "x", ""]), CancellationToken::new());
        assert_eq!(reader.next().await, ReadEvent::Chunk(Bytes::from_static(b"x")));
        assert_eq!(reader.next().await, ReadEvent::End);
    }

    #[tokio::test]
    async fn terminal_event_is_sticky() {
        let mut reader = ChunkReader::new(chunks(&[]), CancellationToken::new());
        assert_eq!(reader.next().await, ReadEvent::End);
        assert_eq!(reader.next().await, ReadEvent::End);
    }

    #[tokio::test]
    async fn read_error_fails_the_sequence() {
        let body = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"ok")),
            Err(std::io::Error::other("connection reset")),
            Ok(Bytes::from_static(b"never")),
        ]);
        let mut reader = ChunkReader::new(body, CancellationToken::new());

        assert!(matches!(reader.next().await, ReadEvent::Chunk(_)));
        let event = reader.next().await;
        assert!(
            matches!(&event, ReadEvent::Failed(TransportError::Read(msg)) if msg.contains("connection reset")),
            "got {event:?}"
        );
        assert_eq!(reader.next().await, event);
    }

    #[tokio::test]
    async fn cancellation_wins_over_ready_chunk() {
        let token = CancellationToken::new();
        let mut reader = ChunkReader::new(chunks(&["ready"]), token.clone());
        token.cancel();
        assert_eq!(reader.next().await, ReadEvent::Cancelled);
        assert_eq!(reader.next().await, ReadEvent::Cancelled);
    }

    #[tokio::test]
    async fn cancellation_releases_pending_body() {
        let dropped = Arc::new(AtomicBool::new(false));
        let token = CancellationToken::new();
        let mut reader = ChunkReader::new(pending_after(one_line(), dropped.clone()), token.clone());

        assert!(matches!(reader.next().await, ReadEvent::Chunk(_)));
        assert!(!dropped.load(Ordering::SeqCst));

        let canceller = tokio::spawn(async move { token.cancel() });
        assert_eq!(reader.next().await, ReadEvent::Cancelled);
        canceller.await.unwrap();
        assert!(dropped.load(Ordering::SeqCst), "body not released on cancel");
    }

    #[tokio::test]
    async fn close_releases_body() {
        let dropped = Arc::new(AtomicBool::new(false));
        let mut reader = ChunkReader::new(pending_after(one_line(), dropped.clone()), CancellationToken::new());
        assert!(matches!(reader.next().await, ReadEvent::Chunk(_)));

        reader.close();
        assert!(dropped.load(Ordering::SeqCst));
        assert_eq!(reader.next().await, ReadEvent::End);
    }

    #[tokio::test]
    async fn read_error_releases_body() {
        let dropped = Arc::new(AtomicBool::new(false));
        let items = vec![Err(std::io::Error::other("connection reset"))];
        let mut reader = ChunkReader::new(pending_after(items, dropped.clone()), CancellationToken::new());

        assert!(matches!(reader.next().await, ReadEvent::Failed(_)));
        assert!(dropped.load(Ordering::SeqCst), "body not released on read error");
    }

    #[tokio::test]
    async fn end_of_body_releases_body() {
        let dropped = Arc::new(AtomicBool::new(false));
        let mut reader = ChunkReader::new(finite(one_line(), dropped.clone()), CancellationToken::new());

        assert!(matches!(reader.next().await, ReadEvent::Chunk(_)));
        assert!(!dropped.load(Ordering::SeqCst));
        assert_eq!(reader.next().await, ReadEvent::End);
        assert!(dropped.load(Ordering::SeqCst), "body not released at end of stream");
    }

    #[tokio::test]
    async fn dropping_reader_mid_stream_releases_body() {
        let dropped = Arc::new(AtomicBool::new(false));
        let mut reader = ChunkReader::new(pending_after(one_line(), dropped.clone()), CancellationToken::new());

        assert!(matches!(reader.next().await, ReadEvent::Chunk(_)));
        assert!(!reader.is_terminated());
        drop(reader);
        assert!(dropped.load(Ordering::SeqCst), "body not released when reader dropped");
    }

    #[test]
    fn terminal_classification() {
        assert!(!ReadEvent::Chunk(Bytes::new()).is_terminal());
        assert!(ReadEvent::End.is_terminal());
        assert!(ReadEvent::Cancelled.is_terminal());
    }
}
