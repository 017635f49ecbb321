//! Backpressure-aware response writer.

use std::fmt::Display;

use futures::{Sink, SinkExt};
use hydra_core::{LifecyclePhase, TimingContext};
use tracing::debug;

/// Stream writer error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// The transport rejected a write or failed to close.
    #[error("transport error: {0}")]
    Transport(String),

    /// The writer already finished or aborted.
    #[error("response already closed")]
    Closed,
}

/// State of the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WriterState {
    Open,
    Finished,
    Aborted(String),
}

/// Writes a response body to a transport sink.
///
/// Bytes are handed over in chunks of at most `chunk_size`, and every chunk
/// waits for the sink to accept it, so a slow consumer pauses the writer
/// instead of growing a buffer. The response ends exactly once, through
/// [`finish`](Self::finish). A transport failure moves the writer to an
/// aborted state in which further writes are refused.
pub struct StreamWriter<S>
where
    S: Sink<Vec<u8>> + Unpin,
    S::Error: Display,
{
    inner: S,
    state: WriterState,
    chunk_size: usize,
    bytes_written: usize,
    writes: usize,
    timing: TimingContext,
}

impl<S> StreamWriter<S>
where
    S: Sink<Vec<u8>> + Unpin,
    S::Error: Display,
{
    /// Create a writer over a transport sink.
    pub fn new(sink: S, timing: TimingContext) -> Self {
        Self {
            inner: sink,
            state: WriterState::Open,
            chunk_size: 8192,
            bytes_written: 0,
            writes: 0,
            timing,
        }
    }

    /// Set the maximum bytes per transport write.
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    /// Write bytes, waiting on the sink for each chunk.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        if self.state != WriterState::Open {
            return Err(StreamError::Closed);
        }

        for chunk in bytes.chunks(self.chunk_size) {
            if let Err(e) = self.inner.send(chunk.to_vec()).await {
                let reason = e.to_string();
                debug!(error = %reason, bytes_written = self.bytes_written, "Transport closed, aborting response");
                self.state = WriterState::Aborted(reason.clone());
                self.timing.mark("aborted");
                return Err(StreamError::Transport(reason));
            }
            self.bytes_written += chunk.len();
            self.writes += 1;
            if self.writes == 1 {
                self.timing.mark("shell_sent");
            }
        }

        Ok(())
    }

    /// Write a string.
    pub async fn write_str(&mut self, html: &str) -> Result<(), StreamError> {
        self.write(html.as_bytes()).await
    }

    /// End the response. Only the first call on an open writer closes the
    /// sink; any later call returns `Closed`.
    pub async fn finish(&mut self) -> Result<(), StreamError> {
        if self.state != WriterState::Open {
            return Err(StreamError::Closed);
        }

        match self.inner.close().await {
            Ok(()) => {
                self.state = WriterState::Finished;
                self.timing.mark("complete");
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                self.state = WriterState::Aborted(reason.clone());
                self.timing.mark("aborted");
                Err(StreamError::Transport(reason))
            }
        }
    }

    /// Total bytes accepted by the sink.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Number of transport writes.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Whether the writer can accept more bytes.
    pub fn is_open(&self) -> bool {
        self.state == WriterState::Open
    }

    /// Get the current lifecycle phase.
    pub fn phase(&self) -> LifecyclePhase {
        match &self.state {
            WriterState::Open if self.writes == 0 => LifecyclePhase::Rendered,
            WriterState::Open => LifecyclePhase::ShellSent,
            WriterState::Finished => LifecyclePhase::Completion,
            WriterState::Aborted(reason) => LifecyclePhase::Aborted(reason.clone()),
        }
    }

    /// Get timing context reference.
    pub fn timing(&self) -> &TimingContext {
        &self.timing
    }

    /// Consume the writer and return its timing context.
    pub fn into_timing(self) -> TimingContext {
        self.timing
    }
}
