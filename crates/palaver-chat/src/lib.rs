//! Conversation orchestration for the Palaver client.
//!
//! This crate owns the interaction loop: composing and submitting messages,
//! ingesting streamed replies, keeping the displayed transcript in sync with
//! the backend, and coordinating the voice sessions from `palaver-voice`.
//! The assistant service itself sits behind the [`ChatBackend`] trait.

pub mod backend;
pub mod context;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod render;
pub mod stream;
pub mod transcript;

pub use backend::{ChatBackend, ConversationListing, SendReply};
pub use context::ConversationContext;
pub use error::{ChatError, Result};
pub use models::ModelSelector;
pub use orchestrator::{
    DictationToggle, IgnoreReason, InteractionOrchestrator, PlaybackToggle, SubmitOutcome,
};
pub use render::{
    render_with_fallback, strip_markup, MarkdownRenderer, MarkupRenderer, RenderError,
    RenderedContent,
};
pub use stream::{StreamEnding, StreamIngestor, DONE_SENTINEL, ERROR_SENTINEL};
pub use transcript::{
    project_controls, ControlState, EntryContent, Transcript, TranscriptEntry,
};
