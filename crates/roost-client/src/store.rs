//! Persistence contract for conversations and messages.
//!
//! The client never talks to a database; the driver executing
//! [`ClientAction::FetchHistory`](crate::event::ClientAction::FetchHistory)
//! and [`ClientAction::PersistRead`](crate::event::ClientAction::PersistRead)
//! does, through this trait. [`MemoryStore`] backs tests and reference
//! drivers.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use roost_proto::{
    ConversationId, MessageId, TimestampMs, UserId,
    payloads::{ChatMessage, MessageKind},
};
use thiserror::Error;

/// Persistence failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The conversation does not exist.
    #[error("conversation {0} not found")]
    ConversationNotFound(ConversationId),

    /// Backend failure (connection, query, constraint).
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Persistence for conversations, messages, and read state.
///
/// Implementations share internal state via `Arc`, so clones of a handle
/// access the same underlying store.
#[async_trait]
pub trait ConversationStore: Send + Sync + 'static {
    /// Create a conversation between `participants`. Returns its id.
    async fn create_conversation(
        &self,
        participants: &[UserId],
    ) -> Result<ConversationId, StoreError>;

    /// Load up to `limit` most recent messages, returned oldest first.
    async fn list_messages(
        &self,
        conversation_id: ConversationId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError>;

    /// Persist a new message, assigning its server id and timestamp.
    async fn append_message(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: String,
        kind: MessageKind,
        created_at: TimestampMs,
    ) -> Result<ChatMessage, StoreError>;

    /// Persist read state for `message_ids`. Already-read messages keep
    /// their original read timestamp.
    async fn mark_read(
        &self,
        conversation_id: ConversationId,
        reader_id: UserId,
        message_ids: &[MessageId],
        read_at: TimestampMs,
    ) -> Result<(), StoreError>;

    /// Messages addressed to `user_id` (sent by others) still unread.
    async fn unread_count(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<usize, StoreError>;

    /// Unread incoming messages for `user_id` across every conversation
    /// they participate in.
    async fn unread_total(&self, user_id: UserId) -> Result<usize, StoreError>;
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    conversations: Vec<(ConversationId, Vec<UserId>)>,
    messages: Vec<ChatMessage>,
    next_conversation_id: ConversationId,
    next_message_id: MessageId,
}

/// In-memory store for tests and reference drivers.
///
/// All state lives behind one mutex; operations are short and synchronous
/// under the hood, the async surface only satisfies the trait.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Total stored messages across all conversations.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.lock().messages.len()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create_conversation(
        &self,
        participants: &[UserId],
    ) -> Result<ConversationId, StoreError> {
        let mut inner = self.lock();
        inner.next_conversation_id += 1;
        let id = inner.next_conversation_id;
        inner.conversations.push((id, participants.to_vec()));
        Ok(id)
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let inner = self.lock();
        if !inner.conversations.iter().any(|(id, _)| *id == conversation_id) {
            return Err(StoreError::ConversationNotFound(conversation_id));
        }
        let mut page: Vec<ChatMessage> = inner
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .rev()
            .take(limit)
            .cloned()
            .collect();
        page.reverse();
        Ok(page)
    }

    async fn append_message(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: String,
        kind: MessageKind,
        created_at: TimestampMs,
    ) -> Result<ChatMessage, StoreError> {
        let mut inner = self.lock();
        if !inner.conversations.iter().any(|(id, _)| *id == conversation_id) {
            return Err(StoreError::ConversationNotFound(conversation_id));
        }
        inner.next_message_id += 1;
        let message = ChatMessage {
            id: inner.next_message_id,
            conversation_id,
            sender_id,
            content,
            kind,
            created_at,
            read_at: None,
            read_by: None,
        };
        inner.messages.push(message.clone());
        Ok(message)
    }

    async fn mark_read(
        &self,
        conversation_id: ConversationId,
        reader_id: UserId,
        message_ids: &[MessageId],
        read_at: TimestampMs,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        for message in inner
            .messages
            .iter_mut()
            .filter(|m| m.conversation_id == conversation_id && message_ids.contains(&m.id))
        {
            if message.read_at.is_none() {
                message.read_at = Some(read_at);
                message.read_by = Some(reader_id);
            }
        }
        Ok(())
    }

    async fn unread_count(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<usize, StoreError> {
        let inner = self.lock();
        Ok(inner
            .messages
            .iter()
            .filter(|m| {
                m.conversation_id == conversation_id
                    && m.sender_id != user_id
                    && m.read_at.is_none()
            })
            .count())
    }

    async fn unread_total(&self, user_id: UserId) -> Result<usize, StoreError> {
        let inner = self.lock();
        let member_of: Vec<ConversationId> = inner
            .conversations
            .iter()
            .filter(|(_, participants)| participants.contains(&user_id))
            .map(|(id, _)| *id)
            .collect();
        Ok(inner
            .messages
            .iter()
            .filter(|m| {
                member_of.contains(&m.conversation_id)
                    && m.sender_id != user_id
                    && m.read_at.is_none()
            })
            .count())
    }
}
