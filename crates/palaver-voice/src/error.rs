//! Error types for the voice subsystem.

use palaver_core::PalaverError;

/// Errors from voice capture and playback.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// The platform offers no speech-capture capability. Terminal for the
    /// dictation feature; the rest of the client is unaffected.
    #[error("speech capture is not supported on this platform")]
    CaptureUnsupported,
    /// The platform offers no speech-synthesis capability. Terminal for the
    /// playback feature.
    #[error("speech synthesis is not supported on this platform")]
    SynthesisUnsupported,
    /// There is no assistant message to read aloud.
    #[error("no content available to read aloud")]
    NoContent,
    #[error("recognizer error: {0}")]
    Recognizer(String),
    #[error("synthesizer error: {0}")]
    Synthesizer(String),
}

impl From<VoiceError> for PalaverError {
    fn from(err: VoiceError) -> Self {
        PalaverError::Voice(err.to_string())
    }
}

/// Classified speech-recognition failure.
///
/// Each class carries a distinct user-facing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureFault {
    /// No speech was detected before the capability gave up.
    NoSpeech,
    /// The microphone could not be accessed.
    DeviceUnavailable,
    /// Microphone permission was denied.
    PermissionDenied,
    /// The recognition service could not be reached.
    Network,
    Other(String),
}

impl CaptureFault {
    /// The message shown to the user for this fault class.
    pub fn user_message(&self) -> String {
        match self {
            CaptureFault::NoSpeech => "No speech detected, please try again".to_string(),
            CaptureFault::DeviceUnavailable => {
                "Cannot access the microphone, check your device settings".to_string()
            }
            CaptureFault::PermissionDenied => {
                "Microphone permission denied, allow access in your settings".to_string()
            }
            CaptureFault::Network => {
                "Network failure during speech recognition, check your connection".to_string()
            }
            CaptureFault::Other(detail) => format!("Speech recognition error: {}", detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_error_display() {
        let err = VoiceError::CaptureUnsupported;
        assert_eq!(
            err.to_string(),
            "speech capture is not supported on this platform"
        );

        let err = VoiceError::NoContent;
        assert_eq!(err.to_string(), "no content available to read aloud");

        let err = VoiceError::Recognizer("engine crashed".to_string());
        assert_eq!(err.to_string(), "recognizer error: engine crashed");
    }

    #[test]
    fn test_voice_error_into_palaver_error() {
        let err: PalaverError = VoiceError::SynthesisUnsupported.into();
        assert!(matches!(err, PalaverError::Voice(_)));
        assert!(err.to_string().contains("speech synthesis"));
    }

    #[test]
    fn test_fault_messages_are_distinct() {
        let faults = [
            CaptureFault::NoSpeech,
            CaptureFault::DeviceUnavailable,
            CaptureFault::PermissionDenied,
            CaptureFault::Network,
            CaptureFault::Other("x".to_string()),
        ];
        for (i, a) in faults.iter().enumerate() {
            for b in faults.iter().skip(i + 1) {
                assert_ne!(a.user_message(), b.user_message());
            }
        }
    }

    #[test]
    fn test_other_fault_carries_detail() {
        let fault = CaptureFault::Other("aborted".to_string());
        assert!(fault.user_message().contains("aborted"));
    }
}
