//! Reply-stream ingestion.
//!
//! The backend frames a reply as a sequence of text fragments terminated by
//! an in-band sentinel: `[DONE]` for normal completion, `[ERROR]<message>`
//! for a reported failure. A channel that closes without a sentinel is a
//! transport failure. The accumulated buffer is a display preview only; the
//! canonical transcript is always re-fetched after the stream ends.

use std::sync::Arc;

use palaver_core::ConversationId;
use tokio::sync::{mpsc, Notify};

/// Normal-completion sentinel.
pub const DONE_SENTINEL: &str = "[DONE]";
/// Failure sentinel; the remainder of the frame is the error message.
pub const ERROR_SENTINEL: &str = "[ERROR]";

/// How a reply stream ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEnding {
    /// `[DONE]` was received.
    Completed,
    /// `[ERROR]` was received, with its message.
    Failed(String),
    /// The channel closed without a sentinel.
    Transport,
    /// The local close signal fired first (user stop or conversation
    /// switch).
    Closed,
}

/// Consumes one reply stream, accumulating fragments until a terminal
/// condition.
///
/// The ingestor is bound to the conversation snapshot taken when the stream
/// was opened; the orchestrator compares that snapshot against the active
/// conversation before applying any fragment or result.
pub struct StreamIngestor {
    snapshot: Option<ConversationId>,
    frames: mpsc::Receiver<String>,
    buffer: String,
    ending: Option<StreamEnding>,
}

impl StreamIngestor {
    /// Bind a freshly opened frame channel to its conversation snapshot.
    pub fn open(snapshot: Option<ConversationId>, frames: mpsc::Receiver<String>) -> Self {
        Self {
            snapshot,
            frames,
            buffer: String::new(),
            ending: None,
        }
    }

    /// The conversation the stream was opened against.
    pub fn snapshot(&self) -> Option<&ConversationId> {
        self.snapshot.as_ref()
    }

    /// The accumulated reply text so far.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Consume the ingestor, yielding the accumulated buffer.
    pub fn into_buffer(self) -> String {
        self.buffer
    }

    /// Drive the stream to its ending.
    ///
    /// `on_fragment` observes the buffer after each appended fragment.
    /// `close` ends ingestion early without touching the buffer; fragments
    /// already applied stay applied. Calling `run` again after an ending
    /// returns the same ending without consuming further frames.
    pub async fn run<F>(&mut self, close: Arc<Notify>, mut on_fragment: F) -> StreamEnding
    where
        F: FnMut(&str),
    {
        if let Some(ending) = &self.ending {
            return ending.clone();
        }

        let closed = close.notified();
        tokio::pin!(closed);

        let ending = loop {
            tokio::select! {
                _ = &mut closed => break StreamEnding::Closed,
                frame = self.frames.recv() => match frame {
                    None => break StreamEnding::Transport,
                    Some(frame) if frame == DONE_SENTINEL => break StreamEnding::Completed,
                    Some(frame) => {
                        if let Some(message) = frame.strip_prefix(ERROR_SENTINEL) {
                            break StreamEnding::Failed(message.to_string());
                        }
                        self.buffer.push_str(&frame);
                        on_fragment(&self.buffer);
                    }
                }
            }
        };

        // Stop the sender early; frames arriving after the ending are
        // dropped, not applied.
        self.frames.close();
        tracing::debug!(ending = ?ending, chars = self.buffer.len(), "Reply stream ended");
        self.ending = Some(ending.clone());
        ending
    }
}

// =============================================================================
// Tests
// =============================================================================
