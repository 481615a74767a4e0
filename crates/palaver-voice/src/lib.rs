//! Voice capture and playback sessions for the Palaver client.
//!
//! Platform speech capabilities are modeled as traits; sessions are
//! cancellable tasks that communicate completion, error, and timeout via
//! event channels, so the orchestrator can select across them uniformly.

pub mod capture;
pub mod clock;
pub mod error;
pub mod playback;

pub use capture::{
    CaptureOutcome, CaptureState, RecognizerEvent, SpeechRecognizer, VoiceCaptureSession,
};
pub use clock::{ArmedClock, SessionClock};
pub use error::{CaptureFault, VoiceError};
pub use playback::{
    select_voice, PlaybackOutcome, SpeechPlaybackSession, SpeechSynthesizer, SynthesisEvent,
    VoiceInfo,
};
