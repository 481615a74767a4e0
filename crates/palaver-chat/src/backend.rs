//! The boundary between the client and the assistant service.
//!
//! Everything the orchestrator needs from the service goes through
//! [`ChatBackend`]; the trait keeps transport details (HTTP, SSE framing,
//! multipart uploads) out of the interaction logic and lets tests script the
//! service end to end.

use palaver_core::{
    AttachmentSet, ConversationDetail, ConversationId, ConversationSummary, DocumentRef,
    ImageAttachment, Message, ModelId, RuntimeSettings,
};
use tokio::sync::mpsc;

use crate::error::Result;

/// Outcome of asking the backend to accept a user message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendReply {
    /// The message was accepted; a reply stream may now be opened. When the
    /// service created a conversation on the fly it returns its id here.
    Accepted {
        conversation_id: Option<ConversationId>,
    },
    /// The service refused the message with a user-facing reason.
    Rejected { message: String },
}

/// The conversation list together with the service's notion of which
/// conversation is current.
#[derive(Clone, Debug, Default)]
pub struct ConversationListing {
    pub conversations: Vec<ConversationSummary>,
    pub current_id: Option<ConversationId>,
}

/// Assistant-service operations used by the orchestrator.
///
/// Reply streams are framed as strings: either a text fragment to append, or
/// one of the terminal sentinels recognized by
/// [`StreamIngestor`](crate::stream::StreamIngestor). A closed channel with
/// no sentinel means the transport failed.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    // ---- Conversations ----

    async fn list_conversations(&self) -> Result<ConversationListing>;

    async fn create_conversation(&self) -> Result<ConversationId>;

    async fn switch_conversation(&self, id: &ConversationId) -> Result<ConversationDetail>;

    /// Duplicate the current conversation, returning the copy's id.
    async fn fork_conversation(&self) -> Result<ConversationId>;

    /// Delete a conversation. Returns the id of the conversation the service
    /// made current afterwards, or `None` when none remain.
    async fn delete_conversation(&self, id: &ConversationId) -> Result<Option<ConversationId>>;

    /// The canonical message history of one conversation.
    async fn list_messages(&self, id: &ConversationId) -> Result<Vec<Message>>;

    // ---- Generation ----

    /// Submit a user message for the current conversation.
    async fn send_message(&self, text: &str, model: &ModelId) -> Result<SendReply>;

    /// Open the reply stream for the most recently accepted message.
    async fn open_stream(&self) -> Result<mpsc::Receiver<String>>;

    /// Ask the service to stop generating. Acknowledgement only; the stream
    /// itself ends through its own channel.
    async fn stop_generation(&self) -> Result<()>;

    // ---- Attachments ----

    async fn upload_image(&self, image: ImageAttachment) -> Result<AttachmentSet>;

    /// Capture a screenshot server-side and attach it, returning the updated
    /// set.
    async fn take_screenshot(&self) -> Result<AttachmentSet>;

    async fn remove_image(&self, index: usize) -> Result<AttachmentSet>;

    async fn clear_images(&self) -> Result<AttachmentSet>;

    async fn upload_document(&self, file_name: &str) -> Result<DocumentRef>;

    async fn remove_document(&self) -> Result<()>;

    // ---- Settings ----

    async fn fetch_settings(&self) -> Result<RuntimeSettings>;

    async fn update_settings(&self, settings: &RuntimeSettings) -> Result<()>;
}
