//! Voice-capture session: one speech-to-text attempt with a hard timeout.
//!
//! Lifecycle: `Idle -> Starting -> Listening`, terminating in one of
//! `Completed`, `Stopped`, `TimedOut`, or `Failed`. Every terminal path
//! asks the capability to finalize and disarms the session clock, so late
//! capability events are harmless.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Notify};
use uuid::Uuid;

use crate::clock::SessionClock;
use crate::error::{CaptureFault, VoiceError};

/// Events reported by a platform speech-capture capability.
#[derive(Clone, Debug)]
pub enum RecognizerEvent {
    /// The capability confirmed activation; audio is being captured.
    Activated,
    /// A single recognized utterance.
    Transcript(String),
    /// A capability-reported failure.
    Fault(CaptureFault),
    /// The capability finalized without producing a transcript.
    Ended,
}

/// Platform speech-capture capability.
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Whether the platform offers speech capture at all.
    fn is_supported(&self) -> bool;

    /// Begin one capture attempt in `language`, yielding capability events.
    async fn start(&self, language: &str) -> Result<mpsc::Receiver<RecognizerEvent>, VoiceError>;

    /// Ask the capability to finalize the current attempt. Best-effort: the
    /// capability's own events may still arrive afterwards.
    async fn finalize(&self);
}

/// Operational state of a capture session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaptureState {
    /// No capture in progress.
    Idle,
    /// Start requested; waiting for the capability to confirm activation.
    Starting,
    /// Actively listening for speech.
    Listening,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureState::Idle => write!(f, "Idle"),
            CaptureState::Starting => write!(f, "Starting"),
            CaptureState::Listening => write!(f, "Listening"),
        }
    }
}

impl CaptureState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(self, target: CaptureState) -> bool {
        matches!(
            (self, target),
            (CaptureState::Idle, CaptureState::Starting)
                | (CaptureState::Starting, CaptureState::Listening)
        )
    }
}

/// Terminal result of one capture session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// An utterance was recognized. The transcript goes to the composition
    /// buffer; it is never auto-sent.
    Completed(String),
    /// User-initiated stop.
    Stopped,
    /// The configured maximum duration elapsed.
    TimedOut,
    /// The capability reported a failure.
    Failed(CaptureFault),
}

/// One speech-to-text capture attempt.
///
/// At most one session exists at a time; the orchestrator enforces this and
/// implements toggle semantics (a second start stops the active session).
pub struct VoiceCaptureSession {
    recognizer: Arc<dyn SpeechRecognizer>,
    language: String,
    max_duration: Duration,
}

impl VoiceCaptureSession {
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        language: impl Into<String>,
        max_duration: Duration,
    ) -> Self {
        Self {
            recognizer,
            language: language.into(),
            max_duration,
        }
    }

    /// Run the session to its terminal outcome.
    ///
    /// Fails fast with [`VoiceError::CaptureUnsupported`] when the platform
    /// has no capture capability. `stop` is the user-initiated stop signal.
    pub async fn run(self, stop: Arc<Notify>) -> Result<CaptureOutcome, VoiceError> {
        if !self.recognizer.is_supported() {
            return Err(VoiceError::CaptureUnsupported);
        }

        let session_id = Uuid::new_v4();
        let mut events = self.recognizer.start(&self.language).await?;
        let mut state = CaptureState::Starting;
        tracing::debug!(%session_id, language = %self.language, "Capture session starting");

        let (expire_tx, mut expired) = oneshot::channel::<()>();
        let clock = SessionClock::arm(self.max_duration, move || {
            let _ = expire_tx.send(());
        });

        let stopped = stop.notified();
        tokio::pin!(stopped);

        let outcome = loop {
            tokio::select! {
                _ = &mut stopped => {
                    self.recognizer.finalize().await;
                    break CaptureOutcome::Stopped;
                }
                _ = &mut expired => {
                    self.recognizer.finalize().await;
                    break CaptureOutcome::TimedOut;
                }
                event = events.recv() => match event {
                    Some(RecognizerEvent::Activated) => {
                        if state.can_transition_to(CaptureState::Listening) {
                            tracing::debug!(%session_id, "Capture state: {} -> {}", state, CaptureState::Listening);
                            state = CaptureState::Listening;
                        }
                    }
                    Some(RecognizerEvent::Transcript(text)) => {
                        self.recognizer.finalize().await;
                        break CaptureOutcome::Completed(text);
                    }
                    Some(RecognizerEvent::Fault(fault)) => break CaptureOutcome::Failed(fault),
                    // The capability finalized on its own, or its channel
                    // closed; treat both as a stop.
                    Some(RecognizerEvent::Ended) | None => break CaptureOutcome::Stopped,
                }
            }
        };

        clock.disarm();
        tracing::debug!(%session_id, outcome = ?outcome, "Capture session finished");
        Ok(outcome)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Mutex;

    /// Recognizer fed from a pre-built event channel.
    struct ScriptedRecognizer {
        supported: bool,
        events: Mutex<Option<mpsc::Receiver<RecognizerEvent>>>,
        finalized: AtomicBool,
    }

    impl ScriptedRecognizer {
        fn new(supported: bool) -> (Arc<Self>, mpsc::Sender<RecognizerEvent>) {
            let (tx, rx) = mpsc::channel(16);
            let recognizer = Arc::new(Self {
                supported,
                events: Mutex::new(Some(rx)),
                finalized: AtomicBool::new(false),
            });
            (recognizer, tx)
        }
    }

    #[async_trait::async_trait]
    impl SpeechRecognizer for ScriptedRecognizer {
        fn is_supported(&self) -> bool {
            self.supported
        }

        async fn start(
            &self,
            _language: &str,
        ) -> Result<mpsc::Receiver<RecognizerEvent>, VoiceError> {
            self.events
                .lock()
                .await
                .take()
                .ok_or_else(|| VoiceError::Recognizer("already started".to_string()))
        }

        async fn finalize(&self) {
            self.finalized.store(true, Ordering::SeqCst);
        }
    }

    fn session(recognizer: Arc<ScriptedRecognizer>) -> VoiceCaptureSession {
        VoiceCaptureSession::new(recognizer, "en-US", Duration::from_secs(30))
    }

    // ---- Capability support ----

    #[tokio::test]
    async fn test_unsupported_fails_fast() {
        let (recognizer, _tx) = ScriptedRecognizer::new(false);
        let result = session(recognizer).run(Arc::new(Notify::new())).await;
        assert!(matches!(result, Err(VoiceError::CaptureUnsupported)));
    }

    // ---- Completion ----

    #[tokio::test]
    async fn test_transcript_completes_session() {
        let (recognizer, tx) = ScriptedRecognizer::new(true);
        tx.send(RecognizerEvent::Activated).await.unwrap();
        tx.send(RecognizerEvent::Transcript("hello world".to_string()))
            .await
            .unwrap();

        let outcome = session(Arc::clone(&recognizer))
            .run(Arc::new(Notify::new()))
            .await
            .unwrap();
        assert_eq!(outcome, CaptureOutcome::Completed("hello world".to_string()));
        assert!(recognizer.finalized.load(Ordering::SeqCst));
    }

    // ---- User stop ----

    #[tokio::test]
    async fn test_stop_yields_stopped() {
        let (recognizer, _tx) = ScriptedRecognizer::new(true);
        let stop = Arc::new(Notify::new());
        // A stored permit makes the stop visible even before the session
        // starts waiting.
        stop.notify_one();

        let outcome = session(Arc::clone(&recognizer)).run(stop).await.unwrap();
        assert_eq!(outcome, CaptureOutcome::Stopped);
        assert!(recognizer.finalized.load(Ordering::SeqCst));
    }

    // ---- Timeout ----

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_timed_out() {
        let (recognizer, tx) = ScriptedRecognizer::new(true);
        tx.send(RecognizerEvent::Activated).await.unwrap();
        // Keep the channel open so the session can only end by timeout.
        let _tx = tx;

        let outcome = session(Arc::clone(&recognizer))
            .run(Arc::new(Notify::new()))
            .await
            .unwrap();
        assert_eq!(outcome, CaptureOutcome::TimedOut);
        assert!(recognizer.finalized.load(Ordering::SeqCst));
    }

    // ---- Faults ----

    #[tokio::test]
    async fn test_fault_yields_failed() {
        let (recognizer, tx) = ScriptedRecognizer::new(true);
        tx.send(RecognizerEvent::Fault(CaptureFault::NoSpeech))
            .await
            .unwrap();

        let outcome = session(recognizer)
            .run(Arc::new(Notify::new()))
            .await
            .unwrap();
        assert_eq!(outcome, CaptureOutcome::Failed(CaptureFault::NoSpeech));
    }

    #[tokio::test]
    async fn test_channel_close_yields_stopped() {
        let (recognizer, tx) = ScriptedRecognizer::new(true);
        drop(tx);

        let outcome = session(recognizer)
            .run(Arc::new(Notify::new()))
            .await
            .unwrap();
        assert_eq!(outcome, CaptureOutcome::Stopped);
    }

    #[tokio::test]
    async fn test_ended_event_yields_stopped() {
        let (recognizer, tx) = ScriptedRecognizer::new(true);
        tx.send(RecognizerEvent::Activated).await.unwrap();
        tx.send(RecognizerEvent::Ended).await.unwrap();

        let outcome = session(recognizer)
            .run(Arc::new(Notify::new()))
            .await
            .unwrap();
        assert_eq!(outcome, CaptureOutcome::Stopped);
    }

    // ---- State transitions ----

    #[test]
    fn test_valid_transitions() {
        assert!(CaptureState::Idle.can_transition_to(CaptureState::Starting));
        assert!(CaptureState::Starting.can_transition_to(CaptureState::Listening));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!CaptureState::Idle.can_transition_to(CaptureState::Listening));
        assert!(!CaptureState::Listening.can_transition_to(CaptureState::Starting));
        assert!(!CaptureState::Listening.can_transition_to(CaptureState::Idle));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CaptureState::Idle.to_string(), "Idle");
        assert_eq!(CaptureState::Starting.to_string(), "Starting");
        assert_eq!(CaptureState::Listening.to_string(), "Listening");
    }
}
