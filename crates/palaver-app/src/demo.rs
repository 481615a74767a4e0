//! In-process demo implementations of the backend and voice capabilities.
//!
//! Lets the binary exercise the whole interaction loop without a running
//! assistant service: replies echo the user message and stream word by word
//! with the usual `[DONE]` framing.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use palaver_chat::{ChatBackend, ChatError, ConversationListing, Result, SendReply, DONE_SENTINEL};
use palaver_core::{
    AttachmentSet, ConversationDetail, ConversationId, ConversationSummary, DocumentRef,
    ImageAttachment, Message, ModelId, Role, RuntimeSettings,
};
use palaver_voice::{
    RecognizerEvent, SpeechRecognizer, SpeechSynthesizer, SynthesisEvent, VoiceError, VoiceInfo,
};
use tokio::sync::mpsc;

// =============================================================================
// Backend
// =============================================================================

struct DemoState {
    conversations: Vec<ConversationSummary>,
    messages: HashMap<ConversationId, Vec<Message>>,
    current: Option<ConversationId>,
    attachments: AttachmentSet,
    document: Option<DocumentRef>,
    settings: RuntimeSettings,
    pending_reply: Option<String>,
    next_id: usize,
}

/// Backend that answers every message with a canned streamed reply.
pub struct DemoBackend {
    state: Mutex<DemoState>,
}

impl DemoBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DemoState {
                conversations: Vec::new(),
                messages: HashMap::new(),
                current: None,
                attachments: AttachmentSet::default(),
                document: None,
                settings: RuntimeSettings::default(),
                pending_reply: None,
                next_id: 1,
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, DemoState> {
        self.state.lock().expect("demo state mutex poisoned")
    }

    fn allocate_conversation(state: &mut DemoState) -> ConversationId {
        let id = ConversationId::new(format!("demo-{}", state.next_id));
        state.next_id += 1;
        state.conversations.push(ConversationSummary {
            id: id.clone(),
            name: format!("Demo chat {}", state.next_id - 1),
            message_count: 0,
            updated_at: Utc::now(),
        });
        state.messages.insert(id.clone(), Vec::new());
        state.current = Some(id.clone());
        id
    }
}

impl Default for DemoBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ChatBackend for DemoBackend {
    async fn list_conversations(&self) -> Result<ConversationListing> {
        let state = self.state();
        Ok(ConversationListing {
            conversations: state.conversations.clone(),
            current_id: state.current.clone(),
        })
    }

    async fn create_conversation(&self) -> Result<ConversationId> {
        Ok(Self::allocate_conversation(&mut self.state()))
    }

    async fn switch_conversation(&self, id: &ConversationId) -> Result<ConversationDetail> {
        let mut state = self.state();
        let summary = state
            .conversations
            .iter()
            .find(|c| &c.id == id)
            .cloned()
            .ok_or_else(|| ChatError::Backend(format!("unknown conversation {}", id)))?;
        state.current = Some(id.clone());
        Ok(ConversationDetail {
            id: id.clone(),
            name: summary.name,
            document: state.document.clone(),
            images: state.attachments.clone(),
        })
    }

    async fn fork_conversation(&self) -> Result<ConversationId> {
        let mut state = self.state();
        let current = state
            .current
            .clone()
            .ok_or_else(|| ChatError::Backend("no conversation to fork".to_string()))?;
        let history = state.messages.get(&current).cloned().unwrap_or_default();
        let id = Self::allocate_conversation(&mut state);
        state.messages.insert(id.clone(), history);
        Ok(id)
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<Option<ConversationId>> {
        let mut state = self.state();
        state.conversations.retain(|c| &c.id != id);
        state.messages.remove(id);
        let next = state.conversations.first().map(|c| c.id.clone());
        state.current = next.clone();
        Ok(next)
    }

    async fn list_messages(&self, id: &ConversationId) -> Result<Vec<Message>> {
        Ok(self.state().messages.get(id).cloned().unwrap_or_default())
    }

    async fn send_message(&self, text: &str, model: &ModelId) -> Result<SendReply> {
        let mut guard = self.state();
        let state = &mut *guard;
        let created = if state.current.is_none() {
            Some(Self::allocate_conversation(state))
        } else {
            None
        };
        let current = match &created {
            Some(id) => id.clone(),
            None => state
                .current
                .clone()
                .ok_or_else(|| ChatError::Backend("no current conversation".to_string()))?,
        };

        let reply = format!("You said *{}*. This is the `{}` demo backend.", text, model);
        let now = Utc::now();
        let history = state.messages.entry(current.clone()).or_default();
        history.push(Message {
            role: Role::User,
            content: text.to_string(),
            timestamp: now,
        });
        history.push(Message {
            role: Role::Assistant,
            content: reply.clone(),
            timestamp: now,
        });
        if let Some(summary) = state.conversations.iter_mut().find(|c| c.id == current) {
            summary.message_count += 2;
            summary.updated_at = now;
        }
        state.pending_reply = Some(reply);

        Ok(SendReply::Accepted {
            conversation_id: created.or(Some(current)),
        })
    }

    async fn open_stream(&self) -> Result<mpsc::Receiver<String>> {
        let reply = self
            .state()
            .pending_reply
            .take()
            .ok_or_else(|| ChatError::Backend("no reply pending".to_string()))?;

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            for word in reply.split_inclusive(' ') {
                if tx.send(word.to_string()).await.is_err() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
            let _ = tx.send(DONE_SENTINEL.to_string()).await;
        });
        Ok(rx)
    }

    async fn stop_generation(&self) -> Result<()> {
        Ok(())
    }

    async fn upload_image(&self, image: ImageAttachment) -> Result<AttachmentSet> {
        let mut state = self.state();
        state.attachments.images.push(image);
        Ok(state.attachments.clone())
    }

    async fn take_screenshot(&self) -> Result<AttachmentSet> {
        let mut state = self.state();
        let name = format!("image_{}", state.attachments.images.len() + 1);
        state.attachments.images.push(ImageAttachment {
            name,
            // 1x1 transparent PNG stand-in.
            data: "iVBORw0KGgo=".to_string(),
        });
        Ok(state.attachments.clone())
    }

    async fn remove_image(&self, index: usize) -> Result<AttachmentSet> {
        let mut state = self.state();
        if index >= state.attachments.images.len() {
            return Err(ChatError::Backend(format!("no image at index {}", index)));
        }
        state.attachments.images.remove(index);
        Ok(state.attachments.clone())
    }

    async fn clear_images(&self) -> Result<AttachmentSet> {
        let mut state = self.state();
        state.attachments.images.clear();
        Ok(state.attachments.clone())
    }

    async fn upload_document(&self, file_name: &str) -> Result<DocumentRef> {
        let doc = DocumentRef::new(file_name);
        self.state().document = Some(doc.clone());
        Ok(doc)
    }

    async fn remove_document(&self) -> Result<()> {
        self.state().document = None;
        Ok(())
    }

    async fn fetch_settings(&self) -> Result<RuntimeSettings> {
        Ok(self.state().settings.clone())
    }

    async fn update_settings(&self, settings: &RuntimeSettings) -> Result<()> {
        self.state().settings = settings.clone();
        Ok(())
    }
}

// =============================================================================
// Voice capabilities
// =============================================================================

/// The demo binary has no microphone path; dictation reports unsupported.
pub struct DemoRecognizer;

#[async_trait::async_trait]
impl SpeechRecognizer for DemoRecognizer {
    fn is_supported(&self) -> bool {
        false
    }

    async fn start(&self, _language: &str) -> std::result::Result<mpsc::Receiver<RecognizerEvent>, VoiceError> {
        Err(VoiceError::CaptureUnsupported)
    }

    async fn finalize(&self) {}
}

/// Synthesizer that "speaks" instantly, for wiring checks.
pub struct DemoSynthesizer;

#[async_trait::async_trait]
impl SpeechSynthesizer for DemoSynthesizer {
    fn is_supported(&self) -> bool {
        true
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        vec![VoiceInfo {
            name: "Demo".to_string(),
            language: "en-US".to_string(),
        }]
    }

    async fn speak(
        &self,
        text: &str,
        _voice: Option<&VoiceInfo>,
    ) -> std::result::Result<mpsc::Receiver<SynthesisEvent>, VoiceError> {
        tracing::info!(chars = text.len(), "Demo synthesizer speaking");
        let (tx, rx) = mpsc::channel(4);
        let _ = tx.try_send(SynthesisEvent::Started);
        let _ = tx.try_send(SynthesisEvent::Finished);
        Ok(rx)
    }

    async fn cancel(&self) {}
}

// =============================================================================
// Tests
// =============================================================================
