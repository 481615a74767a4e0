//! Speech playback session: reads one piece of text aloud.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::VoiceError;

/// A voice offered by the platform synthesis capability.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceInfo {
    pub name: String,
    /// BCP 47 language tag, e.g. `en-US`.
    pub language: String,
}

/// Events reported by a platform speech-synthesis capability.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SynthesisEvent {
    Started,
    /// The utterance was spoken to the end.
    Finished,
    /// The utterance was cut off by a cancel request.
    Interrupted,
    Fault(String),
}

/// Platform speech-synthesis capability.
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Whether the platform offers speech synthesis at all.
    fn is_supported(&self) -> bool;

    /// The voices the platform offers. May be empty.
    fn voices(&self) -> Vec<VoiceInfo>;

    /// Speak `text` with `voice` (or the platform default when `None`),
    /// yielding capability events.
    async fn speak(
        &self,
        text: &str,
        voice: Option<&VoiceInfo>,
    ) -> Result<mpsc::Receiver<SynthesisEvent>, VoiceError>;

    /// Cancel any in-progress utterance. Harmless when nothing is playing.
    async fn cancel(&self);
}

/// Terminal result of one playback session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Finished,
    Interrupted,
    Failed(String),
}

/// Pick the best available voice for `requested`.
///
/// Preference order: exact tag match, then any voice sharing the primary
/// subtag, then any English voice, then whatever comes first. Returns `None`
/// only when `voices` is empty.
pub fn select_voice<'a>(voices: &'a [VoiceInfo], requested: &str) -> Option<&'a VoiceInfo> {
    if let Some(exact) = voices.iter().find(|v| v.language == requested) {
        return Some(exact);
    }
    let primary = requested.split('-').next().unwrap_or(requested);
    if let Some(related) = voices.iter().find(|v| v.language.starts_with(primary)) {
        return Some(related);
    }
    if let Some(english) = voices.iter().find(|v| v.language.starts_with("en")) {
        return Some(english);
    }
    voices.first()
}

/// One text-to-speech playback attempt.
///
/// At most one utterance plays at a time: starting a session cancels any
/// in-progress utterance first.
pub struct SpeechPlaybackSession {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    language: String,
}

impl SpeechPlaybackSession {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, language: impl Into<String>) -> Self {
        Self {
            synthesizer,
            language: language.into(),
        }
    }

    /// Speak `text` to its terminal outcome.
    ///
    /// Fails fast with [`VoiceError::SynthesisUnsupported`] when the platform
    /// has no synthesis capability, and [`VoiceError::NoContent`] when `text`
    /// is empty after trimming.
    pub async fn run(self, text: &str) -> Result<PlaybackOutcome, VoiceError> {
        if !self.synthesizer.is_supported() {
            return Err(VoiceError::SynthesisUnsupported);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(VoiceError::NoContent);
        }

        // Clear out any utterance still playing before starting a new one.
        self.synthesizer.cancel().await;

        let voices = self.synthesizer.voices();
        let voice = select_voice(&voices, &self.language);
        tracing::debug!(
            language = %self.language,
            voice = voice.map(|v| v.name.as_str()).unwrap_or("<default>"),
            chars = text.len(),
            "Playback starting"
        );

        let mut events = self.synthesizer.speak(text, voice).await?;
        loop {
            match events.recv().await {
                Some(SynthesisEvent::Started) => continue,
                Some(SynthesisEvent::Finished) => return Ok(PlaybackOutcome::Finished),
                // A closed channel means the utterance was torn down without
                // finishing; treat it as an interruption.
                Some(SynthesisEvent::Interrupted) | None => {
                    return Ok(PlaybackOutcome::Interrupted)
                }
                Some(SynthesisEvent::Fault(detail)) => {
                    return Ok(PlaybackOutcome::Failed(detail))
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    struct ScriptedSynthesizer {
        supported: bool,
        voices: Vec<VoiceInfo>,
        events: Mutex<Option<mpsc::Receiver<SynthesisEvent>>>,
        cancels: AtomicUsize,
    }

    impl ScriptedSynthesizer {
        fn new(script: Vec<SynthesisEvent>) -> Arc<Self> {
            let (tx, rx) = mpsc::channel(16);
            for event in script {
                tx.try_send(event).unwrap();
            }
            Arc::new(Self {
                supported: true,
                voices: vec![voice("Samantha", "en-US")],
                events: Mutex::new(Some(rx)),
                cancels: AtomicUsize::new(0),
            })
        }

        fn unsupported() -> Arc<Self> {
            Arc::new(Self {
                supported: false,
                voices: Vec::new(),
                events: Mutex::new(None),
                cancels: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl SpeechSynthesizer for ScriptedSynthesizer {
        fn is_supported(&self) -> bool {
            self.supported
        }

        fn voices(&self) -> Vec<VoiceInfo> {
            self.voices.clone()
        }

        async fn speak(
            &self,
            _text: &str,
            _voice: Option<&VoiceInfo>,
        ) -> Result<mpsc::Receiver<SynthesisEvent>, VoiceError> {
            self.events
                .lock()
                .await
                .take()
                .ok_or_else(|| VoiceError::Synthesizer("already speaking".to_string()))
        }

        async fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn voice(name: &str, language: &str) -> VoiceInfo {
        VoiceInfo {
            name: name.to_string(),
            language: language.to_string(),
        }
    }

    // ---- Voice selection ----

    #[test]
    fn test_select_exact_match() {
        let voices = vec![
            voice("a", "en-US"),
            voice("b", "en-GB"),
            voice("c", "fr-FR"),
        ];
        assert_eq!(select_voice(&voices, "fr-FR"), Some(&voices[2]));
    }

    #[test]
    fn test_select_primary_subtag_match() {
        let voices = vec![
            voice("a", "en-US"),
            voice("b", "en-GB"),
            voice("c", "fr-FR"),
        ];
        // No fr-CA voice, but fr-FR shares the primary subtag.
        assert_eq!(select_voice(&voices, "fr-CA"), Some(&voices[2]));
    }

    #[test]
    fn test_select_falls_back_to_english() {
        let voices = vec![voice("c", "fr-FR"), voice("a", "en-US")];
        assert_eq!(select_voice(&voices, "de-DE"), Some(&voices[1]));
    }

    #[test]
    fn test_select_falls_back_to_first() {
        let voices = vec![voice("c", "fr-FR"), voice("d", "ja-JP")];
        assert_eq!(select_voice(&voices, "de-DE"), Some(&voices[0]));
    }

    #[test]
    fn test_select_empty_list() {
        assert_eq!(select_voice(&[], "en-US"), None);
    }

    // ---- Session outcomes ----

    #[tokio::test]
    async fn test_finished_outcome() {
        let synth = ScriptedSynthesizer::new(vec![
            SynthesisEvent::Started,
            SynthesisEvent::Finished,
        ]);
        let session = SpeechPlaybackSession::new(Arc::clone(&synth) as Arc<dyn SpeechSynthesizer>, "en-US");
        let outcome = session.run("hello").await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Finished);
        // The prior utterance is always cancelled before speaking.
        assert_eq!(synth.cancels.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_interrupted_outcome() {
        let synth = ScriptedSynthesizer::new(vec![
            SynthesisEvent::Started,
            SynthesisEvent::Interrupted,
        ]);
        let session = SpeechPlaybackSession::new(synth, "en-US");
        let outcome = session.run("hello").await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Interrupted);
    }

    #[tokio::test]
    async fn test_channel_close_is_interrupted() {
        let synth = ScriptedSynthesizer::new(vec![SynthesisEvent::Started]);
        let session = SpeechPlaybackSession::new(synth, "en-US");
        let outcome = session.run("hello").await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Interrupted);
    }

    #[tokio::test]
    async fn test_fault_outcome() {
        let synth = ScriptedSynthesizer::new(vec![SynthesisEvent::Fault(
            "audio device lost".to_string(),
        )]);
        let session = SpeechPlaybackSession::new(synth, "en-US");
        let outcome = session.run("hello").await.unwrap();
        assert_eq!(
            outcome,
            PlaybackOutcome::Failed("audio device lost".to_string())
        );
    }

    // ---- Preconditions ----

    #[tokio::test]
    async fn test_unsupported_fails_fast() {
        let session = SpeechPlaybackSession::new(ScriptedSynthesizer::unsupported(), "en-US");
        let result = session.run("hello").await;
        assert!(matches!(result, Err(VoiceError::SynthesisUnsupported)));
    }

    #[tokio::test]
    async fn test_empty_text_is_no_content() {
        let synth = ScriptedSynthesizer::new(vec![]);
        let session = SpeechPlaybackSession::new(synth, "en-US");
        let result = session.run("   \n").await;
        assert!(matches!(result, Err(VoiceError::NoContent)));
    }
}
