//! CBOR-encoded stream payloads.
//!
//! The stream a payload arrives on determines its type, so no variant tag is
//! serialized; the structs here are encoded directly. CBOR keeps payloads
//! self-describing (field names embedded) and forward compatible without
//! code generation.
//!
//! # Invariants
//!
//! - Round-trip encoding must produce identical values.
//! - `ChatMessage.id` and `created_at` are always server-assigned; a client
//!   never fabricates either.

use serde::{Deserialize, Serialize};

use crate::ids::{ConversationId, MessageId, TimestampMs, UserId};

/// Content type of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// Plain text content.
    Text,
    /// Image attachment reference.
    Image,
    /// File attachment reference.
    File,
}

/// A canonical chat message as rebroadcast by the server.
///
/// Immutable once created, except for the read state, which is monotonic:
/// once `read_at` is set it is never cleared or moved backwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Server-assigned message id.
    pub id: MessageId,
    /// Conversation the message belongs to.
    pub conversation_id: ConversationId,
    /// Sender's user id.
    pub sender_id: UserId,
    /// Message content (text, or an attachment reference).
    pub content: String,
    /// Content type.
    pub kind: MessageKind,
    /// Server timestamp; the timeline ordering key.
    pub created_at: TimestampMs,
    /// When the message was read. `None` if unread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<TimestampMs>,
    /// Who read the message. `None` if unread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_by: Option<UserId>,
}

/// A client's request to send a message, published to `/app/chat.send`.
///
/// Carries no message id or timestamp; the server assigns both and echoes
/// the canonical [`ChatMessage`] on the conversation's message topic. The
/// correlation id lets a UI key a transient "sending" affordance against
/// the eventual echo, and is never used for timeline identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    /// Client-generated correlation id.
    pub correlation_id: u64,
    /// Target conversation.
    pub conversation_id: ConversationId,
    /// Sender's user id.
    pub sender_id: UserId,
    /// Message content.
    pub content: String,
    /// Content type.
    pub kind: MessageKind,
}

/// Ephemeral typing signal. Not persisted; expires client-side after a
/// fixed window unless refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingSignal {
    /// Conversation being typed in.
    pub conversation_id: ConversationId,
    /// Who is typing.
    pub user_id: UserId,
    /// Whether the user started (`true`) or stopped (`false`) typing.
    pub is_typing: bool,
    /// When the signal was sent.
    pub sent_at: TimestampMs,
}

/// Read-receipt broadcast.
///
/// The authoritative read state lives in persistence; this broadcast only
/// lets already-connected participants update their view without a refetch.
/// One receipt may cover several messages so a bulk mark-as-read is a
/// single broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipt {
    /// Conversation the receipt applies to.
    pub conversation_id: ConversationId,
    /// Who read the messages.
    pub reader_id: UserId,
    /// The messages that were read.
    pub message_ids: Vec<MessageId>,
    /// When they were read.
    pub read_at: TimestampMs,
}

/// Whether a presence update announces arrival or departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceAction {
    /// User entered the conversation.
    Join,
    /// User left the conversation.
    Leave,
}

/// Ephemeral presence broadcast. Derived state only; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    /// Conversation scope of the update.
    pub conversation_id: ConversationId,
    /// User joining or leaving.
    pub user_id: UserId,
    /// Join or leave.
    pub action: PresenceAction,
    /// When the update was sent.
    pub at: TimestampMs,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn round_trip<T: Serialize + for<'de> Deserialize<'de> + PartialEq + std::fmt::Debug>(
        value: &T,
    ) {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(value, &mut buf).unwrap();
        let back: T = ciborium::de::from_reader(buf.as_slice()).unwrap();
        assert_eq!(&back, value);
    }

    #[test]
    fn chat_message_round_trips() {
        round_trip(&ChatMessage {
            id: 9,
            conversation_id: 1,
            sender_id: 42,
            content: "is the flat still available?".to_string(),
            kind: MessageKind::Text,
            created_at: 1_700_000_000_000,
            read_at: None,
            read_by: None,
        });
    }

    #[test]
    fn read_fields_survive_round_trip() {
        round_trip(&ChatMessage {
            id: 9,
            conversation_id: 1,
            sender_id: 42,
            content: "yes".to_string(),
            kind: MessageKind::Text,
            created_at: 1_700_000_000_000,
            read_at: Some(1_700_000_060_000),
            read_by: Some(7),
        });
    }

    #[test]
    fn receipt_round_trips() {
        round_trip(&ReadReceipt {
            conversation_id: 1,
            reader_id: 7,
            message_ids: vec![9, 10, 11],
            read_at: 1_700_000_060_000,
        });
    }
}
