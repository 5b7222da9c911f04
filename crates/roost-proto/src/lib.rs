//! Wire layer of the roost messaging protocol.
//!
//! Defines topic addressing (`/topic/...`, `/queue/...`, `/app/chat.send`),
//! the CBOR payload types carried on each stream, and the [`TopicEvent`]
//! tagged variant decoded exactly once at the transport boundary. Downstream
//! code never re-inspects raw payload bytes or branches on loosely-typed
//! fields; the stream kind determines the payload type the way an opcode
//! determines a frame payload.

mod destination;
mod error;
pub mod event;
mod ids;
pub mod payloads;

pub use destination::{Destination, TopicKey, TopicKind, TopicScope};
pub use error::ProtocolError;
pub use event::{PublishBody, TopicEvent};
pub use ids::{ConversationId, MessageId, TimestampMs, UserId};
