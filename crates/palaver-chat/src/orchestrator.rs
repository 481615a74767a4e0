//! The interaction orchestrator: top-level coordinator of composition,
//! streaming, voice, attachments, and conversation management.
//!
//! Single-writer rule: at most one reply streams at a time, guarded by
//! [`BusyState`]. Submissions arriving while busy are ignored, not queued.
//! All mutable client state lives behind one mutex that is never held
//! across an await point.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use palaver_core::{
    AttachmentSet, BusyState, ClientConfig, ConversationId, ConversationSummary, DocumentRef,
    ImageAttachment, ModelId, RuntimeSettings,
};
use palaver_voice::{
    CaptureFault, CaptureOutcome, PlaybackOutcome, SpeechPlaybackSession, SpeechRecognizer,
    SpeechSynthesizer, VoiceCaptureSession, VoiceError,
};
use tokio::sync::Notify;

use crate::backend::{ChatBackend, SendReply};
use crate::context::ConversationContext;
use crate::error::Result;
use crate::models::ModelSelector;
use crate::render::{render_with_fallback, strip_markup, MarkupRenderer, RenderedContent};
use crate::stream::{StreamEnding, StreamIngestor};
use crate::transcript::{project_controls, ControlState, Transcript};

// =============================================================================
// Outcomes
// =============================================================================

/// Why a submission was ignored without side effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyText,
    Generating,
    Recording,
}

/// Result of one submission attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// Nothing happened; the submission was dropped at the gate.
    Ignored(IgnoreReason),
    /// The backend refused the message. The optimistic transcript entry
    /// stands.
    Rejected(String),
    /// A reply stream ran to an ending.
    Completed {
        conversation: Option<ConversationId>,
        ending: StreamEnding,
        content: RenderedContent,
    },
}

/// Result of one dictation toggle.
#[derive(Clone, Debug, PartialEq)]
pub enum DictationToggle {
    /// A capture session ran to its outcome.
    Session(CaptureOutcome),
    /// A session was already active; it has been asked to stop.
    StopRequested,
    /// Dictation is not available right now.
    Unavailable,
}

/// Result of one playback toggle.
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackToggle {
    /// A playback session ran to its outcome.
    Session(PlaybackOutcome),
    /// Playback was active; it has been cancelled.
    StopRequested,
    /// There is no assistant message to read.
    NoContent,
    /// Playback is not available on this platform.
    Unavailable,
}

// =============================================================================
// State
// =============================================================================

/// Handle to an in-flight reply stream: the snapshot it was opened under and
/// the signal that abandons it.
struct StreamGuard {
    snapshot: Option<ConversationId>,
    close: Arc<Notify>,
}

struct OrchestratorState {
    busy: BusyState,
    recording: bool,
    speaking: bool,
    capture_supported: bool,
    synthesis_supported: bool,
    composer: String,
    transcript: Transcript,
    conversations: Vec<ConversationSummary>,
    title: String,
    document: Option<DocumentRef>,
    attachments: AttachmentSet,
    models: ModelSelector,
    settings: RuntimeSettings,
    notices: Vec<String>,
    open_stream: Option<StreamGuard>,
    dictation_stop: Option<Arc<Notify>>,
}

/// Coordinates every user-visible interaction of the client.
pub struct InteractionOrchestrator {
    backend: Arc<dyn ChatBackend>,
    recognizer: Arc<dyn SpeechRecognizer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    renderer: Arc<dyn MarkupRenderer>,
    context: ConversationContext,
    state: Mutex<OrchestratorState>,
}

impl InteractionOrchestrator {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        recognizer: Arc<dyn SpeechRecognizer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        renderer: Arc<dyn MarkupRenderer>,
        config: &ClientConfig,
    ) -> Self {
        let capture_supported = recognizer.is_supported();
        let synthesis_supported = synthesizer.is_supported();
        Self {
            backend,
            recognizer,
            synthesizer,
            renderer,
            context: ConversationContext::new(),
            state: Mutex::new(OrchestratorState {
                busy: BusyState::Idle,
                recording: false,
                speaking: false,
                capture_supported,
                synthesis_supported,
                composer: String::new(),
                transcript: Transcript::new(),
                conversations: Vec::new(),
                title: String::new(),
                document: None,
                attachments: AttachmentSet::default(),
                models: ModelSelector::new(&config.models),
                settings: config.session.clone(),
                notices: Vec::new(),
                open_stream: None,
                dictation_stop: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, OrchestratorState> {
        self.state.lock().expect("state mutex poisoned")
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Pull initial state from the backend: settings, the conversation list,
    /// and the current conversation's content.
    pub async fn bootstrap(&self) -> Result<()> {
        let settings = self.backend.fetch_settings().await?;
        self.state().settings = settings;

        let listing = self.backend.list_conversations().await?;
        let current = listing.current_id.clone();
        self.state().conversations = listing.conversations;

        if let Some(current) = current {
            self.switch_conversation(&current).await?;
        }
        tracing::info!("Client bootstrapped");
        Ok(())
    }

    // =========================================================================
    // Submission and streaming
    // =========================================================================

    /// Submit the given text as a user message and stream the reply.
    ///
    /// The user entry is appended to the transcript before the backend is
    /// consulted and is never rolled back.
    pub async fn submit(&self, text: &str) -> Result<SubmitOutcome> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Ok(SubmitOutcome::Ignored(IgnoreReason::EmptyText));
        }

        let model = {
            let mut state = self.state();
            if state.busy.is_generating() {
                return Ok(SubmitOutcome::Ignored(IgnoreReason::Generating));
            }
            if state.recording {
                return Ok(SubmitOutcome::Ignored(IgnoreReason::Recording));
            }
            state.transcript.push_user(&text);
            state.composer.clear();
            // Reserve the busy flag here, not after the backend round-trip,
            // so a concurrent submission cannot slip through the gate.
            state.busy = BusyState::Generating;
            state.models.selected().clone()
        };

        match self.backend.send_message(&text, &model).await {
            Err(err) => {
                let message = err.to_string();
                let mut state = self.state();
                state.busy = BusyState::Idle;
                state
                    .notices
                    .push(format!("Message could not be sent: {}", message));
                Ok(SubmitOutcome::Rejected(message))
            }
            Ok(SendReply::Rejected { message }) => {
                let mut state = self.state();
                state.busy = BusyState::Idle;
                state.notices.push(message.clone());
                Ok(SubmitOutcome::Rejected(message))
            }
            Ok(SendReply::Accepted { conversation_id }) => {
                if let Some(id) = conversation_id {
                    if !self.context.is_current(&id) {
                        // The send created the conversation; adopt it.
                        self.context.switch_to(id);
                        if let Err(err) = self.refresh_conversations().await {
                            tracing::warn!(error = %err, "Conversation list refresh failed");
                        }
                    }
                }
                self.run_stream_cycle().await
            }
        }
    }

    async fn run_stream_cycle(&self) -> Result<SubmitOutcome> {
        let frames = match self.backend.open_stream().await {
            Ok(frames) => frames,
            Err(err) => {
                let message = err.to_string();
                let mut state = self.state();
                state.busy = BusyState::Idle;
                state
                    .notices
                    .push(format!("Could not open the reply stream: {}", message));
                return Ok(SubmitOutcome::Rejected(message));
            }
        };

        let snapshot = self.context.active();
        let close = Arc::new(Notify::new());
        let mut ingestor = StreamIngestor::open(snapshot.clone(), frames);
        {
            let mut state = self.state();
            state.transcript.begin_streaming();
            state.open_stream = Some(StreamGuard {
                snapshot: snapshot.clone(),
                close: Arc::clone(&close),
            });
        }

        let context = self.context.clone();
        let snap = snapshot.clone();
        let ending = ingestor
            .run(close, |buffer| {
                // A conversation switch mid-stream makes this preview stale;
                // drop it silently.
                if context.accepts(snap.as_ref()) {
                    self.state().transcript.update_streaming(buffer);
                }
            })
            .await;

        self.settle(snapshot, ingestor.into_buffer(), ending).await
    }

    /// Bring the client back to idle after a stream ending, whatever it was.
    async fn settle(
        &self,
        snapshot: Option<ConversationId>,
        buffer: String,
        ending: StreamEnding,
    ) -> Result<SubmitOutcome> {
        let content = render_with_fallback(self.renderer.as_ref(), &buffer);
        let applies = self.context.accepts(snapshot.as_ref());

        {
            let mut state = self.state();
            state.busy = BusyState::Idle;
            state.open_stream = None;
            if applies {
                state.transcript.settle_streaming(&content);
                match &ending {
                    StreamEnding::Failed(message) => {
                        state.notices.push(format!("Generation failed: {}", message));
                    }
                    StreamEnding::Transport => {
                        state
                            .notices
                            .push("Connection to the assistant was lost".to_string());
                    }
                    StreamEnding::Completed | StreamEnding::Closed => {}
                }
            }
        }

        // The streamed buffer is only a preview; the backend history is
        // canonical.
        if applies {
            if let Err(err) = self.refresh_messages().await {
                tracing::warn!(error = %err, "Message refresh failed after stream");
            }
            if let Err(err) = self.refresh_conversations().await {
                tracing::warn!(error = %err, "Conversation list refresh failed after stream");
            }
        }

        Ok(SubmitOutcome::Completed {
            conversation: snapshot,
            ending,
            content,
        })
    }

    /// Request that generation stop. Returns whether a stream was open.
    ///
    /// Stopping is not an error: the stream ends with
    /// [`StreamEnding::Closed`] and partial content stays visible.
    pub async fn request_stop(&self) -> Result<bool> {
        let close = {
            let state = self.state();
            match &state.open_stream {
                None => return Ok(false),
                Some(guard) => Arc::clone(&guard.close),
            }
        };
        if let Err(err) = self.backend.stop_generation().await {
            tracing::warn!(error = %err, "Stop request not acknowledged by backend");
        }
        close.notify_one();
        Ok(true)
    }

    // =========================================================================
    // Conversations
    // =========================================================================

    /// Make `id` the active conversation and load its content.
    pub async fn switch_conversation(&self, id: &ConversationId) -> Result<()> {
        {
            let state = self.state();
            if let Some(guard) = &state.open_stream {
                // A stream bound to another conversation is abandoned, not
                // surfaced as an error.
                if guard.snapshot.as_ref() != Some(id) {
                    guard.close.notify_one();
                }
            }
        }

        let detail = self.backend.switch_conversation(id).await?;
        self.context.switch_to(id.clone());
        {
            let mut state = self.state();
            state.title = detail.name;
            state.document = detail.document;
            let has_attachments = !detail.images.is_empty();
            state.attachments = detail.images;
            state.models.recompute(has_attachments);
        }

        self.refresh_messages().await?;
        self.refresh_conversations().await?;
        Ok(())
    }

    pub async fn create_conversation(&self) -> Result<ConversationId> {
        let id = self.backend.create_conversation().await?;
        self.switch_conversation(&id).await?;
        Ok(id)
    }

    /// Duplicate the current conversation and switch to the copy.
    pub async fn fork_conversation(&self) -> Result<ConversationId> {
        let id = self.backend.fork_conversation().await?;
        self.switch_conversation(&id).await?;
        Ok(id)
    }

    /// Delete a conversation, following the backend to whichever conversation
    /// it makes current next.
    pub async fn delete_conversation(&self, id: &ConversationId) -> Result<()> {
        let next = self.backend.delete_conversation(id).await?;
        match next {
            Some(next) => self.switch_conversation(&next).await?,
            None => {
                self.context.clear();
                let mut state = self.state();
                state.transcript = Transcript::new();
                state.title = String::new();
                state.document = None;
                state.attachments = AttachmentSet::default();
                state.models.recompute(false);
                drop(state);
                self.refresh_conversations().await?;
            }
        }
        Ok(())
    }

    async fn refresh_messages(&self) -> Result<()> {
        let Some(active) = self.context.active() else {
            return Ok(());
        };
        let messages = self.backend.list_messages(&active).await?;
        // The fetched history belongs to `active`; apply it only while that
        // conversation is still the current one.
        if !self.context.is_current(&active) {
            return Ok(());
        }
        self.state()
            .transcript
            .replace_all(&messages, self.renderer.as_ref());
        Ok(())
    }

    async fn refresh_conversations(&self) -> Result<()> {
        let listing = self.backend.list_conversations().await?;
        let active = self.context.active();
        let mut state = self.state();
        if let Some(active) = &active {
            if let Some(summary) = listing.conversations.iter().find(|c| &c.id == active) {
                state.title = summary.name.clone();
            }
        }
        state.conversations = listing.conversations;
        Ok(())
    }

    // =========================================================================
    // Dictation
    // =========================================================================

    /// Toggle speech capture.
    ///
    /// When no session is active this runs one to its outcome; a completed
    /// transcript lands in the composition buffer and is never auto-sent.
    /// When a session is active this asks it to stop and returns
    /// immediately.
    pub async fn toggle_dictation(&self) -> Result<DictationToggle> {
        let (language, max_duration, stop) = {
            let mut state = self.state();
            if let Some(stop) = &state.dictation_stop {
                stop.notify_one();
                return Ok(DictationToggle::StopRequested);
            }
            if !state.capture_supported || state.busy.is_generating() {
                return Ok(DictationToggle::Unavailable);
            }
            let stop = Arc::new(Notify::new());
            state.recording = true;
            state.dictation_stop = Some(Arc::clone(&stop));
            (
                state.settings.recognition_lang.clone(),
                Duration::from_secs(state.settings.max_recording_secs),
                stop,
            )
        };

        let session =
            VoiceCaptureSession::new(Arc::clone(&self.recognizer), language, max_duration);
        let result = session.run(stop).await;

        // Cleanup runs on every path so a late stop toggle finds nothing to
        // stop.
        let mut state = self.state();
        state.recording = false;
        state.dictation_stop = None;

        match result {
            Ok(CaptureOutcome::Completed(text)) => {
                state.composer = text.clone();
                Ok(DictationToggle::Session(CaptureOutcome::Completed(text)))
            }
            Ok(CaptureOutcome::TimedOut) => {
                state
                    .notices
                    .push("Recording stopped at the time limit".to_string());
                Ok(DictationToggle::Session(CaptureOutcome::TimedOut))
            }
            Ok(CaptureOutcome::Stopped) => Ok(DictationToggle::Session(CaptureOutcome::Stopped)),
            Ok(CaptureOutcome::Failed(fault)) => {
                state.notices.push(fault.user_message());
                Ok(DictationToggle::Session(CaptureOutcome::Failed(fault)))
            }
            Err(VoiceError::CaptureUnsupported) => {
                state.capture_supported = false;
                Ok(DictationToggle::Unavailable)
            }
            Err(err) => {
                let fault = CaptureFault::Other(err.to_string());
                state.notices.push(fault.user_message());
                Ok(DictationToggle::Session(CaptureOutcome::Failed(fault)))
            }
        }
    }

    // =========================================================================
    // Playback
    // =========================================================================

    /// Toggle reading the latest assistant message aloud.
    pub async fn toggle_playback(&self) -> Result<PlaybackToggle> {
        let stop_requested = {
            let mut state = self.state();
            if !state.synthesis_supported {
                return Ok(PlaybackToggle::Unavailable);
            }
            if state.speaking {
                state.speaking = false;
                true
            } else {
                false
            }
        };
        if stop_requested {
            self.synthesizer.cancel().await;
            return Ok(PlaybackToggle::StopRequested);
        }

        let (text, language) = {
            let state = self.state();
            let text = state
                .transcript
                .last_assistant_source()
                .map(strip_markup)
                .unwrap_or_default();
            (text, state.settings.synthesis_lang.clone())
        };
        if text.is_empty() {
            return Ok(PlaybackToggle::NoContent);
        }

        self.state().speaking = true;
        let session = SpeechPlaybackSession::new(Arc::clone(&self.synthesizer), language);
        let result = session.run(&text).await;

        let mut state = self.state();
        state.speaking = false;
        match result {
            Ok(PlaybackOutcome::Failed(detail)) => {
                state
                    .notices
                    .push(format!("Speech playback failed: {}", detail));
                Ok(PlaybackToggle::Session(PlaybackOutcome::Failed(detail)))
            }
            Ok(outcome) => Ok(PlaybackToggle::Session(outcome)),
            Err(VoiceError::SynthesisUnsupported) => {
                state.synthesis_supported = false;
                Ok(PlaybackToggle::Unavailable)
            }
            Err(VoiceError::NoContent) => Ok(PlaybackToggle::NoContent),
            Err(err) => {
                let detail = err.to_string();
                state
                    .notices
                    .push(format!("Speech playback failed: {}", detail));
                Ok(PlaybackToggle::Session(PlaybackOutcome::Failed(detail)))
            }
        }
    }

    // =========================================================================
    // Attachments
    // =========================================================================

    pub async fn add_image(&self, image: ImageAttachment) -> Result<()> {
        let set = self.backend.upload_image(image).await?;
        self.apply_attachments(set);
        Ok(())
    }

    /// Ask the backend to capture a screenshot and attach it.
    pub async fn capture_screenshot(&self) -> Result<()> {
        let set = self.backend.take_screenshot().await?;
        self.apply_attachments(set);
        Ok(())
    }

    pub async fn remove_image(&self, index: usize) -> Result<()> {
        let set = self.backend.remove_image(index).await?;
        self.apply_attachments(set);
        Ok(())
    }

    pub async fn clear_images(&self) -> Result<()> {
        let set = self.backend.clear_images().await?;
        self.apply_attachments(set);
        Ok(())
    }

    fn apply_attachments(&self, set: AttachmentSet) {
        let mut state = self.state();
        let has_attachments = !set.is_empty();
        state.attachments = set;
        state.models.recompute(has_attachments);
    }

    pub async fn attach_document(&self, file_name: &str) -> Result<DocumentRef> {
        let doc = self.backend.upload_document(file_name).await?;
        self.state().document = Some(doc.clone());
        Ok(doc)
    }

    pub async fn remove_document(&self) -> Result<()> {
        self.backend.remove_document().await?;
        self.state().document = None;
        Ok(())
    }

    // =========================================================================
    // Settings and models
    // =========================================================================

    /// Push new runtime settings to the backend, then adopt them locally.
    pub async fn apply_settings(&self, settings: RuntimeSettings) -> Result<()> {
        self.backend.update_settings(&settings).await?;
        self.state().settings = settings;
        tracing::info!("Runtime settings updated");
        Ok(())
    }

    /// Try to select a model. Refused while generating or while the selector
    /// is locked to the multimodal model.
    pub fn select_model(&self, model: &ModelId) -> bool {
        let mut state = self.state();
        if state.busy.is_generating() {
            return false;
        }
        state.models.select(model)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn busy(&self) -> BusyState {
        self.state().busy
    }

    pub fn controls(&self) -> ControlState {
        let state = self.state();
        project_controls(
            state.busy,
            state.recording,
            state.speaking,
            state.capture_supported,
            state.synthesis_supported,
        )
    }

    pub fn transcript(&self) -> Transcript {
        self.state().transcript.clone()
    }

    pub fn conversation_title(&self) -> String {
        self.state().title.clone()
    }

    pub fn conversations(&self) -> Vec<ConversationSummary> {
        self.state().conversations.clone()
    }

    pub fn active_conversation(&self) -> Option<ConversationId> {
        self.context.active()
    }

    pub fn composer(&self) -> String {
        self.state().composer.clone()
    }

    /// Replace the composition buffer. Ignored while generating.
    pub fn set_composer(&self, text: impl Into<String>) {
        let mut state = self.state();
        if !state.busy.is_generating() {
            state.composer = text.into();
        }
    }

    /// Take all pending user-facing notices.
    pub fn drain_notices(&self) -> Vec<String> {
        std::mem::take(&mut self.state().notices)
    }

    pub fn selected_model(&self) -> ModelId {
        self.state().models.selected().clone()
    }

    pub fn model_options(&self) -> Vec<ModelId> {
        self.state().models.options().to_vec()
    }

    pub fn is_model_selectable(&self) -> bool {
        self.state().models.is_selectable()
    }

    pub fn attachments(&self) -> AttachmentSet {
        self.state().attachments.clone()
    }

    pub fn document(&self) -> Option<DocumentRef> {
        self.state().document.clone()
    }

    pub fn settings(&self) -> RuntimeSettings {
        self.state().settings.clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
