//! Identifier and timestamp aliases.
//!
//! The server assigns message identity; clients never mint a `MessageId`.
//! Conversation and user ids come from the marketplace persistence layer.

/// Stable user identifier.
pub type UserId = u64;

/// Conversation identifier assigned at conversation creation.
pub type ConversationId = u64;

/// Server-assigned message identifier.
pub type MessageId = u64;

/// Milliseconds since the Unix epoch, assigned by the server.
///
/// Server timestamps are the ordering authority for message timelines;
/// client send time is never used as an ordering key.
pub type TimestampMs = u64;
