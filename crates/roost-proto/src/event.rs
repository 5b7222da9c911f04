//! Inbound and outbound payload envelopes.
//!
//! [`TopicEvent`] is the single decode point for broker deliveries: raw
//! bytes plus the stream kind they arrived on become a typed variant here,
//! and downstream code matches on the variant rather than re-inspecting
//! payload shape.

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    destination::{Destination, TopicKey, TopicKind},
    error::ProtocolError,
    payloads::{ChatMessage, PresenceUpdate, ReadReceipt, SendRequest, TypingSignal},
};

fn decode<T: DeserializeOwned>(kind: TopicKind, bytes: &[u8]) -> Result<T, ProtocolError> {
    ciborium::de::from_reader(bytes)
        .map_err(|e| ProtocolError::Decode { kind, reason: e.to_string() })
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf)
        .map_err(|e| ProtocolError::Encode { reason: e.to_string() })?;
    Ok(buf)
}

/// A broker delivery decoded at the transport boundary.
///
/// The stream kind plays the role an opcode plays in a framed protocol: it
/// selects the payload type, so no variant discriminator is serialized and
/// a mismatched kind/payload pair fails to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicEvent {
    /// Canonical message from a conversation's message stream.
    Message(ChatMessage),
    /// Typing signal.
    Typing(TypingSignal),
    /// Read-receipt broadcast.
    ReadReceipt(ReadReceipt),
    /// Presence join/leave.
    Presence(PresenceUpdate),
    /// Message delivered on the user's notification queue.
    Notification(ChatMessage),
}

impl TopicEvent {
    /// Decode raw payload bytes delivered on a stream of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Decode`] if the bytes do not decode as the
    /// payload type the stream kind implies.
    pub fn decode(kind: TopicKind, bytes: &[u8]) -> Result<Self, ProtocolError> {
        match kind {
            TopicKind::Messages => decode(kind, bytes).map(Self::Message),
            TopicKind::Typing => decode(kind, bytes).map(Self::Typing),
            TopicKind::ReadReceipts => decode(kind, bytes).map(Self::ReadReceipt),
            TopicKind::Presence => decode(kind, bytes).map(Self::Presence),
            TopicKind::Notifications => decode(kind, bytes).map(Self::Notification),
        }
    }

    /// Encode this event for rebroadcast on its stream.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Self::Message(m) | Self::Notification(m) => encode(m),
            Self::Typing(t) => encode(t),
            Self::ReadReceipt(r) => encode(r),
            Self::Presence(p) => encode(p),
        }
    }

    /// The stream kind this event belongs on.
    pub fn kind(&self) -> TopicKind {
        match self {
            Self::Message(_) => TopicKind::Messages,
            Self::Typing(_) => TopicKind::Typing,
            Self::ReadReceipt(_) => TopicKind::ReadReceipts,
            Self::Presence(_) => TopicKind::Presence,
            Self::Notification(_) => TopicKind::Notifications,
        }
    }
}

/// An outbound publish: the typed payload plus its wire encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishBody {
    /// Message send request for `/app/chat.send`.
    Send(SendRequest),
    /// Typing signal for the conversation's typing topic.
    Typing(TypingSignal),
    /// Read-receipt broadcast for the conversation's receipt topic.
    ReadReceipt(ReadReceipt),
    /// Presence announce for the conversation's presence topic.
    Presence(PresenceUpdate),
}

impl PublishBody {
    /// The destination this body is published to.
    pub fn destination(&self) -> Destination {
        match self {
            Self::Send(_) => Destination::ChatSend,
            Self::Typing(t) => Destination::Topic(TopicKey::conversation(
                TopicKind::Typing,
                t.conversation_id,
            )),
            Self::ReadReceipt(r) => Destination::Topic(TopicKey::conversation(
                TopicKind::ReadReceipts,
                r.conversation_id,
            )),
            Self::Presence(p) => Destination::Topic(TopicKey::conversation(
                TopicKind::Presence,
                p.conversation_id,
            )),
        }
    }

    /// Encode this body for the wire.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Self::Send(s) => encode(s),
            Self::Typing(t) => encode(t),
            Self::ReadReceipt(r) => encode(r),
            Self::Presence(p) => encode(p),
        }
    }
}
