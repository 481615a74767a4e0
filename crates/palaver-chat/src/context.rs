//! Tracks which conversation is active in the client.
//!
//! Stream results carry the conversation snapshot they were produced under;
//! the context decides whether such a snapshot still applies. A result whose
//! snapshot no longer matches is discarded silently.

use std::sync::{Arc, Mutex};

use palaver_core::ConversationId;

/// Shared handle to the active-conversation cell.
#[derive(Clone, Debug, Default)]
pub struct ConversationContext {
    active: Arc<Mutex<Option<ConversationId>>>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently active conversation, if any.
    pub fn active(&self) -> Option<ConversationId> {
        self.active.lock().expect("context mutex poisoned").clone()
    }

    /// Make `id` the active conversation.
    pub fn switch_to(&self, id: ConversationId) {
        let mut active = self.active.lock().expect("context mutex poisoned");
        tracing::debug!(from = ?*active, to = %id, "Switching active conversation");
        *active = Some(id);
    }

    /// Clear the active conversation (e.g. after deleting the last one).
    pub fn clear(&self) {
        *self.active.lock().expect("context mutex poisoned") = None;
    }

    pub fn is_current(&self, id: &ConversationId) -> bool {
        self.active
            .lock()
            .expect("context mutex poisoned")
            .as_ref()
            .map_or(false, |active| active == id)
    }

    /// Whether a result produced under `snapshot` may still be applied.
    ///
    /// A `None` snapshot was taken before any conversation existed; the
    /// backend creates the conversation during the send, so such results
    /// always apply.
    pub fn accepts(&self, snapshot: Option<&ConversationId>) -> bool {
        match snapshot {
            None => true,
            Some(id) => self.is_current(id),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
