//! Chat transcript state provider.
//!
//! Holds the ordered message list for the active session and notifies
//! subscribers through a watch-channel version counter on every mutation.
//! The lifecycle controller treats this as read-only except during
//! hydration, where it replaces the transcript wholesale.

use std::sync::Mutex;

use tokio::sync::watch;
use uuid::Uuid;

use atelier_core::types::{now_millis, Message, MessageMetadata, MessageRole};

/// Shared chat transcript for the active session.
pub struct ChatState {
    messages: Mutex<Vec<Message>>,
    version: watch::Sender<u64>,
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatState {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            messages: Mutex::new(Vec::new()),
            version,
        }
    }

    fn with_messages<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Vec<Message>) -> T,
    {
        let mut messages = self
            .messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut messages)
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    /// Snapshot of the current transcript.
    pub fn messages(&self) -> Vec<Message> {
        self.with_messages(|messages| messages.clone())
    }

    /// Append a message with a fresh id and timestamp.
    pub fn add_message(
        &self,
        role: MessageRole,
        content: impl Into<String>,
        metadata: Option<MessageMetadata>,
    ) -> Message {
        let message = Message {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: now_millis(),
            metadata,
        };
        self.with_messages(|messages| messages.push(message.clone()));
        self.bump();
        message
    }

    /// Replace a message's content wholesale, as streaming responses do to
    /// the most recent assistant message. Unknown ids are ignored.
    pub fn update_message(&self, id: &str, content: impl Into<String>) {
        let content = content.into();
        let updated = self.with_messages(|messages| {
            if let Some(message) = messages.iter_mut().find(|m| m.id == id) {
                message.content = content;
                true
            } else {
                false
            }
        });
        if updated {
            self.bump();
        }
    }

    /// Replace the whole transcript (hydration).
    ///
    /// Deliberately does not bump the version counter: a hydration write is
    /// not a user edit and must never feed back into a persist of the
    /// session being replaced.
    pub fn set_messages(&self, messages: Vec<Message>) {
        self.with_messages(|current| *current = messages);
    }

    /// Drop the transcript (session delete / blank session). Silent, like
    /// [`set_messages`](Self::set_messages).
    pub fn clear(&self) {
        self.set_messages(Vec::new());
    }

    /// Current change-counter value.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}
