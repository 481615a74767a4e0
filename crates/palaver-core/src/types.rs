use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Identifiers
// =============================================================================

/// Opaque identifier of a persisted conversation thread.
///
/// Assigned server-side; the client only references it. Exactly one
/// conversation is active in the client at a time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of a model variant offered by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// =============================================================================
// Messages and conversations
// =============================================================================

/// Author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One persisted message of a conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// One row of the conversation list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub name: String,
    pub message_count: usize,
    pub updated_at: DateTime<Utc>,
}

/// Full view of one conversation, returned when switching to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationDetail {
    pub id: ConversationId,
    pub name: String,
    pub document: Option<DocumentRef>,
    pub images: AttachmentSet,
}

// =============================================================================
// Attachments
// =============================================================================

/// Reference to the document attached to a conversation.
///
/// The document content lives in the external store; the client only caches
/// the file name for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentRef(String);

impl DocumentRef {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self(file_name.into())
    }

    pub fn file_name(&self) -> &str {
        &self.0
    }
}

/// One uploaded image, mirrored into the client as a display cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub name: String,
    /// Base64-encoded image bytes as stored by the backend.
    pub data: String,
}

/// The set of images attached to the active conversation.
///
/// Externally owned; mutations always round-trip through the backend before
/// this cache updates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentSet {
    pub images: Vec<ImageAttachment>,
}

impl AttachmentSet {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

// =============================================================================
// Busy state
// =============================================================================

/// The mutual-exclusion flag preventing overlapping sends.
///
/// Entered when a send is accepted by the backend, exited when the stream
/// terminates — normally, by error, or by explicit stop. While `Generating`,
/// message composition, dictation start, and model switching are disabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyState {
    #[default]
    Idle,
    Generating,
}

impl BusyState {
    pub fn is_generating(self) -> bool {
        self == BusyState::Generating
    }
}

impl fmt::Display for BusyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusyState::Idle => write!(f, "idle"),
            BusyState::Generating => write!(f, "generating"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_id_display() {
        let id = ConversationId::new("c1");
        assert_eq!(id.to_string(), "c1");
        assert_eq!(id.as_str(), "c1");
    }

    #[test]
    fn test_conversation_id_equality() {
        assert_eq!(ConversationId::from("c1"), ConversationId::new("c1"));
        assert_ne!(ConversationId::from("c1"), ConversationId::from("c2"));
    }

    #[test]
    fn test_conversation_id_serde_transparent() {
        let id = ConversationId::new("abc-123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc-123\"");
        let back: ConversationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_model_id_display() {
        let id = ModelId::new("qwen3:8b");
        assert_eq!(id.to_string(), "qwen3:8b");
    }

    #[test]
    fn test_role_serde_snake_case() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_message_round_trip() {
        let msg = Message {
            role: Role::Assistant,
            content: "Hi there".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_attachment_set_empty() {
        let set = AttachmentSet::default();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_attachment_set_len() {
        let set = AttachmentSet {
            images: vec![ImageAttachment {
                name: "shot.jpg".to_string(),
                data: "aGVsbG8=".to_string(),
            }],
        };
        assert!(!set.is_empty());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_document_ref_file_name() {
        let doc = DocumentRef::new("notes.pdf");
        assert_eq!(doc.file_name(), "notes.pdf");
    }

    #[test]
    fn test_busy_state_default_idle() {
        assert_eq!(BusyState::default(), BusyState::Idle);
        assert!(!BusyState::Idle.is_generating());
        assert!(BusyState::Generating.is_generating());
    }

    #[test]
    fn test_busy_state_display() {
        assert_eq!(BusyState::Idle.to_string(), "idle");
        assert_eq!(BusyState::Generating.to_string(), "generating");
    }
}
