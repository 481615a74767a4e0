//! Client-side view of the conversation transcript and its controls.
//!
//! The transcript mirrors backend state for display. User messages are
//! appended optimistically and never rolled back; assistant replies stream
//! in as a preview and are settled, then replaced wholesale by the canonical
//! history once the backend confirms it.

use chrono::{DateTime, Utc};
use palaver_core::{BusyState, Message, Role};

use crate::render::{render_with_fallback, MarkupRenderer, RenderedContent};

/// How an entry's display text was produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryContent {
    /// Shown verbatim (user messages, fallback assistant text).
    Plain,
    /// Still accumulating stream fragments.
    Streaming,
    /// Rendered markup.
    Rich,
}

/// One displayed transcript entry.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptEntry {
    pub role: Role,
    /// The raw message text. For assistant entries this is the markup
    /// source; playback reads from here, not from the display text.
    pub source: String,
    pub display: String,
    pub content: EntryContent,
    pub timestamp: DateTime<Utc>,
}

/// The ordered transcript of the active conversation.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a user message optimistically. The entry stays even if the
    /// backend later rejects the send.
    pub fn push_user(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.entries.push(TranscriptEntry {
            role: Role::User,
            display: text.clone(),
            source: text,
            content: EntryContent::Plain,
            timestamp: Utc::now(),
        });
    }

    /// Open an empty assistant entry for an incoming stream.
    pub fn begin_streaming(&mut self) {
        self.entries.push(TranscriptEntry {
            role: Role::Assistant,
            source: String::new(),
            display: String::new(),
            content: EntryContent::Streaming,
            timestamp: Utc::now(),
        });
    }

    /// Update the streaming entry with the accumulated buffer so far.
    ///
    /// No-op when no entry is streaming.
    pub fn update_streaming(&mut self, buffer: &str) {
        if let Some(entry) = self.streaming_entry() {
            entry.source = buffer.to_string();
            entry.display = buffer.to_string();
        }
    }

    /// Settle the streaming entry with its final rendered form.
    pub fn settle_streaming(&mut self, content: &RenderedContent) {
        if let Some(entry) = self.streaming_entry() {
            entry.display = content.as_str().to_string();
            entry.content = match content {
                RenderedContent::Rich(_) => EntryContent::Rich,
                RenderedContent::Plain(_) => EntryContent::Plain,
            };
        }
    }

    /// Replace the whole transcript with the canonical backend history.
    pub fn replace_all(&mut self, messages: &[Message], renderer: &dyn MarkupRenderer) {
        self.entries = messages
            .iter()
            .map(|msg| match msg.role {
                Role::User => TranscriptEntry {
                    role: Role::User,
                    source: msg.content.clone(),
                    display: msg.content.clone(),
                    content: EntryContent::Plain,
                    timestamp: msg.timestamp,
                },
                Role::Assistant => {
                    let rendered = render_with_fallback(renderer, &msg.content);
                    TranscriptEntry {
                        role: Role::Assistant,
                        source: msg.content.clone(),
                        display: rendered.as_str().to_string(),
                        content: match rendered {
                            RenderedContent::Rich(_) => EntryContent::Rich,
                            RenderedContent::Plain(_) => EntryContent::Plain,
                        },
                        timestamp: msg.timestamp,
                    }
                }
            })
            .collect();
    }

    /// The raw source of the latest settled assistant message, for playback.
    pub fn last_assistant_source(&self) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.role == Role::Assistant && e.content != EntryContent::Streaming)
            .map(|e| e.source.as_str())
    }

    fn streaming_entry(&mut self) -> Option<&mut TranscriptEntry> {
        self.entries
            .iter_mut()
            .rev()
            .find(|e| e.content == EntryContent::Streaming)
    }
}

// =============================================================================
// Control projection
// =============================================================================

/// Enablement and activity flags for the interaction surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlState {
    pub composer_enabled: bool,
    pub send_enabled: bool,
    pub stop_enabled: bool,
    pub dictation_enabled: bool,
    pub dictation_active: bool,
    pub playback_enabled: bool,
    pub playback_active: bool,
    pub model_select_enabled: bool,
}

/// Project the orchestrator's flags onto control enablement.
///
/// While generating, everything that could start a second send is disabled
/// and only stop remains. Unsupported capabilities are disabled permanently.
pub fn project_controls(
    busy: BusyState,
    recording: bool,
    speaking: bool,
    capture_supported: bool,
    synthesis_supported: bool,
) -> ControlState {
    let generating = busy.is_generating();
    ControlState {
        composer_enabled: !generating && !recording,
        send_enabled: !generating && !recording,
        stop_enabled: generating,
        dictation_enabled: capture_supported && !generating,
        dictation_active: recording,
        playback_enabled: synthesis_supported,
        playback_active: speaking,
        model_select_enabled: !generating,
    }
}

// =============================================================================
// Tests
// =============================================================================
