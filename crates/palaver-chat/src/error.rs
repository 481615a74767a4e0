//! Error types for the chat subsystem.

use palaver_core::PalaverError;
use palaver_voice::VoiceError;

/// Errors from conversation and streaming operations.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The backend refused or failed a request.
    #[error("backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Voice(#[from] VoiceError),
}

impl From<ChatError> for PalaverError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Backend(msg) => PalaverError::Backend(msg),
            ChatError::Voice(inner) => inner.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = ChatError::Backend("conversation not found".to_string());
        assert_eq!(err.to_string(), "backend error: conversation not found");
    }

    #[test]
    fn test_voice_error_passes_through() {
        let err: ChatError = VoiceError::NoContent.into();
        assert_eq!(err.to_string(), "no content available to read aloud");
    }

    #[test]
    fn test_into_palaver_error() {
        let err: PalaverError = ChatError::Backend("boom".to_string()).into();
        assert!(matches!(err, PalaverError::Backend(_)));

        let err: PalaverError = ChatError::Voice(VoiceError::NoContent).into();
        assert!(matches!(err, PalaverError::Voice(_)));
    }
}
