//! Observable application state types.
//!
//! The view model: the subset of client state an interface needs to
//! render a conversation, kept up to date by applying client actions.
//! It never talks to the network itself.

use std::collections::HashSet;

use roost_proto::{ConversationId, MessageId, TimestampMs, UserId, payloads::ChatMessage};

/// Per-conversation view state.
#[derive(Debug, Clone)]
pub struct ConversationView {
    /// Conversation identifier.
    pub conversation_id: ConversationId,
    /// Timeline, ordered as delivered by the client.
    pub messages: Vec<ChatMessage>,
    /// Participants currently present.
    pub online: HashSet<UserId>,
    /// Participants currently typing.
    pub typing: HashSet<UserId>,
    /// Whether the join pipeline has completed.
    pub joined: bool,
}

impl ConversationView {
    /// Create an empty view.
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            messages: Vec::new(),
            online: HashSet::new(),
            typing: HashSet::new(),
            joined: false,
        }
    }

    /// Append a delivered message. The client has already deduplicated
    /// and ordered deliveries.
    pub fn add_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Replace the timeline with a merged history snapshot.
    ///
    /// The client's timeline is canonical; a rejoin may re-deliver
    /// messages the view already holds, so the snapshot wins wholesale.
    pub fn set_timeline(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
    }

    /// Apply read receipts to the timeline.
    pub fn apply_receipts(
        &mut self,
        reader_id: UserId,
        message_ids: &[MessageId],
        read_at: TimestampMs,
    ) {
        for message in
            self.messages.iter_mut().filter(|m| message_ids.contains(&m.id) && m.read_at.is_none())
        {
            message.read_at = Some(read_at);
            message.read_by = Some(reader_id);
        }
    }

    /// Messages sent by others and not yet read by `local_user`.
    #[must_use]
    pub fn unread_count(&self, local_user: UserId) -> usize {
        self.messages
            .iter()
            .filter(|m| m.sender_id != local_user && m.read_at.is_none())
            .count()
    }
}
