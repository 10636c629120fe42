//! Chunked streaming protocol between an engine and its consumer.
//!
//! Engines push payloads into a [`ChunkSink`]; the consumer pulls
//! [`StreamEvent`]s from a [`SynthesisStream`]. Zero-length payloads are
//! dropped at the sink, so end-of-stream is always the explicit
//! [`StreamEvent::End`] and never an empty chunk.

use crate::error::{VoxError, VoxResult};
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// One event delivered to a stream consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A non-empty audio payload
    Chunk(Bytes),
    /// All chunks have been delivered
    End,
    /// The engine failed; no further events follow
    Failed(VoxError),
}

impl StreamEvent {
    /// Whether this event closes the stream
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::End | Self::Failed(_))
    }
}

/// Producer half handed to [`crate::engine::SpeechEngine::synthesize_stream`]
#[derive(Debug)]
pub struct ChunkSink {
    tx: mpsc::Sender<StreamEvent>,
    sent: usize,
}

impl ChunkSink {
    pub(crate) fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self { tx, sent: 0 }
    }

    /// Deliver one chunk, waiting while the consumer is behind.
    ///
    /// Empty payloads are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`VoxError::Cancelled`] once the consumer has gone away; the
    /// engine should stop producing.
    pub async fn send(&mut self, chunk: impl Into<Bytes> + Send) -> VoxResult<()> {
        let chunk = chunk.into();
        if chunk.is_empty() {
            return Ok(());
        }
        self.tx
            .send(StreamEvent::Chunk(chunk))
            .await
            .map_err(|_| VoxError::cancelled("stream consumer went away"))?;
        self.sent += 1;
        Ok(())
    }

    /// Number of chunks delivered so far
    #[must_use]
    pub const fn chunks_sent(&self) -> usize {
        self.sent
    }

    /// Whether the consumer has stopped listening
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half of a streaming synthesis call.
///
/// Dropping the stream or calling [`SynthesisStream::cancel`] aborts the
/// producing task; no event is yielded afterwards.
#[derive(Debug)]
pub struct SynthesisStream {
    rx: mpsc::Receiver<StreamEvent>,
    task: JoinHandle<()>,
    finished: bool,
}

impl SynthesisStream {
    pub(crate) fn new(rx: mpsc::Receiver<StreamEvent>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            task,
            finished: false,
        }
    }

    /// Wait for the next event, `None` once the stream is closed
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.next().await
    }

    /// Stop the producer. Chunks already received are kept by the caller.
    pub fn cancel(&mut self) {
        if !self.finished {
            debug!("Cancelling synthesis stream");
        }
        self.finished = true;
        self.task.abort();
        self.rx.close();
    }

    /// Whether a terminal event was seen or the stream was cancelled
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Drain the stream into one buffer
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the stream ends with
    /// [`StreamEvent::Failed`].
    pub async fn collect_bytes(mut self) -> VoxResult<Bytes> {
        let mut buffer = BytesMut::new();
        while let Some(event) = self.next().await {
            match event {
                StreamEvent::Chunk(chunk) => buffer.extend_from_slice(&chunk),
                StreamEvent::End => return Ok(buffer.freeze()),
                StreamEvent::Failed(err) => return Err(err),
            }
        }
        Err(VoxError::cancelled("stream closed before end of stream"))
    }
}

impl Stream for SynthesisStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    self.finished = true;
                }
                Poll::Ready(Some(event))
            }
            // Producer vanished without a terminal event (panic inside the engine)
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(Some(StreamEvent::Failed(VoxError::cancelled(
                    "stream producer stopped before end of stream",
                ))))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for SynthesisStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}
