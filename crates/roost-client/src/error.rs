//! Client error taxonomy.

use roost_core::ConnectionError;
use roost_proto::{ConversationId, ProtocolError};
use thiserror::Error;

/// Errors surfaced by the chat client.
///
/// Transient faults (a dropped transport mid-retry, a missed heartbeat)
/// are reported through connection status transitions instead; only
/// failures the application must react to become errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Connection-level failure (auth rejection, retries exhausted,
    /// operation attempted while not connected).
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A broker subscription was refused or broke.
    #[error("subscription to {topic} failed: {reason}")]
    Subscription {
        /// Destination path of the failed subscription.
        topic: String,
        /// Broker-supplied failure reason.
        reason: String,
    },

    /// The history page for a conversation could not be loaded.
    #[error("history fetch for conversation {conversation_id} failed: {reason}")]
    HistoryFetch {
        /// Conversation whose history was requested.
        conversation_id: ConversationId,
        /// Failure reason from the history source.
        reason: String,
    },

    /// An operation referenced a conversation with no session.
    #[error("no session for conversation {0}")]
    UnknownConversation(ConversationId),

    /// Wire-level encode or decode failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    /// Whether the error ends the connection (no automatic recovery).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Connection(err) => err.is_terminal(),
            Self::Subscription { .. }
            | Self::HistoryFetch { .. }
            | Self::UnknownConversation(_)
            | Self::Protocol(_) => false,
        }
    }
}
