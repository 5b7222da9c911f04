//! Broker destination addressing.
//!
//! The broker exposes topic-based publish/subscribe under `/topic/...`,
//! point-to-point delivery under `/queue/{userId}`, and a single ingestion
//! endpoint `/app/chat.send` for message send requests. Every subscribable
//! destination is a [`TopicKey`]: a (kind, scope) pair. The key is also the
//! identity the subscription registry deduplicates on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::ProtocolError,
    ids::{ConversationId, UserId},
};

/// Logical stream kinds multiplexed over one broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopicKind {
    /// Canonical message stream for a conversation.
    Messages,
    /// Ephemeral typing signals for a conversation.
    Typing,
    /// Read-receipt broadcasts for a conversation.
    ReadReceipts,
    /// Join/leave presence broadcasts for a conversation.
    Presence,
    /// Per-user notification queue (point-to-point).
    Notifications,
}

impl TopicKind {
    /// Path segment used for per-conversation streams.
    fn segment(self) -> &'static str {
        match self {
            Self::Messages => "messages",
            Self::Typing => "typing",
            Self::ReadReceipts => "read-receipts",
            Self::Presence => "presence",
            Self::Notifications => "notifications",
        }
    }

    /// The four per-conversation stream kinds, in the order a session
    /// subscribes them during join.
    pub const CONVERSATION_KINDS: [Self; 4] =
        [Self::Messages, Self::Typing, Self::ReadReceipts, Self::Presence];
}

/// What a subscription is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopicScope {
    /// A single conversation's stream.
    Conversation(ConversationId),
    /// A single user's queue.
    User(UserId),
}

/// A subscribable broker destination: (kind, scope).
///
/// At most one active subscription may exist per key per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicKey {
    /// Stream kind.
    pub kind: TopicKind,
    /// Conversation or user scope.
    pub scope: TopicScope,
}

impl TopicKey {
    /// Key for a per-conversation stream.
    pub fn conversation(kind: TopicKind, conversation_id: ConversationId) -> Self {
        debug_assert_ne!(kind, TopicKind::Notifications);
        Self { kind, scope: TopicScope::Conversation(conversation_id) }
    }

    /// Key for a user's notification queue.
    pub fn notifications(user_id: UserId) -> Self {
        Self { kind: TopicKind::Notifications, scope: TopicScope::User(user_id) }
    }

    /// Conversation this key is scoped to. `None` for user queues.
    pub fn conversation_id(&self) -> Option<ConversationId> {
        match self.scope {
            TopicScope::Conversation(id) => Some(id),
            TopicScope::User(_) => None,
        }
    }

    /// Broker path for this destination.
    pub fn path(&self) -> String {
        match self.scope {
            TopicScope::Conversation(id) => {
                format!("/topic/conversation/{id}/{}", self.kind.segment())
            },
            TopicScope::User(user_id) => format!("/queue/{user_id}"),
        }
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Any destination a client can publish to or subscribe on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// A topic or queue destination.
    Topic(TopicKey),
    /// The `/app/chat.send` message ingestion endpoint.
    ///
    /// The broker persists the message, assigns identity, and rebroadcasts
    /// the canonical event on the conversation's message topic, including
    /// back to the sender (server-echo policy).
    ChatSend,
}

impl Destination {
    /// Broker path for this destination.
    pub fn path(&self) -> String {
        match self {
            Self::Topic(key) => key.path(),
            Self::ChatSend => "/app/chat.send".to_string(),
        }
    }

    /// Parse a broker path back into a destination.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidDestination`] if the path does not
    /// match any addressing scheme.
    pub fn parse(path: &str) -> Result<Self, ProtocolError> {
        let invalid = || ProtocolError::InvalidDestination { path: path.to_string() };

        if path == "/app/chat.send" {
            return Ok(Self::ChatSend);
        }

        if let Some(rest) = path.strip_prefix("/queue/") {
            let user_id: UserId = rest.parse().map_err(|_| invalid())?;
            return Ok(Self::Topic(TopicKey::notifications(user_id)));
        }

        let rest = path.strip_prefix("/topic/conversation/").ok_or_else(invalid)?;
        let (id_str, segment) = rest.split_once('/').ok_or_else(invalid)?;
        let conversation_id: ConversationId = id_str.parse().map_err(|_| invalid())?;

        let kind = match segment {
            "messages" => TopicKind::Messages,
            "typing" => TopicKind::Typing,
            "read-receipts" => TopicKind::ReadReceipts,
            "presence" => TopicKind::Presence,
            _ => return Err(invalid()),
        };

        Ok(Self::Topic(TopicKey::conversation(kind, conversation_id)))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn conversation_paths_round_trip() {
        for kind in TopicKind::CONVERSATION_KINDS {
            let key = TopicKey::conversation(kind, 77);
            let parsed = Destination::parse(&key.path()).unwrap();
            assert_eq!(parsed, Destination::Topic(key));
        }
    }

    #[test]
    fn queue_path_round_trips() {
        let key = TopicKey::notifications(42);
        assert_eq!(key.path(), "/queue/42");
        assert_eq!(Destination::parse("/queue/42").unwrap(), Destination::Topic(key));
    }

    #[test]
    fn chat_send_path_round_trips() {
        assert_eq!(Destination::ChatSend.path(), "/app/chat.send");
        assert_eq!(Destination::parse("/app/chat.send").unwrap(), Destination::ChatSend);
    }

    #[test]
    fn malformed_paths_are_rejected() {
        for path in [
            "",
            "/topic/conversation/",
            "/topic/conversation/abc/messages",
            "/topic/conversation/9",
            "/topic/conversation/9/reactions",
            "/queue/not-a-user",
            "/app/chat.receive",
        ] {
            assert!(
                matches!(
                    Destination::parse(path),
                    Err(ProtocolError::InvalidDestination { .. })
                ),
                "expected rejection for {path:?}"
            );
        }
    }
}
