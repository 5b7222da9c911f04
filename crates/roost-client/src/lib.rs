//! Client
//!
//! Action-based chat client state machine for roost. Manages the broker
//! connection, conversation sessions, presence, typing, and read receipts.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO and Action-Based patterns as
//! [`roost_core`]. It receives events ([`ClientEvent`]), processes them
//! through pure state machine logic, and returns actions ([`ClientAction`])
//! for the caller to execute.
//!
//! # Components
//!
//! - [`ChatClient`]: Top-level state machine managing conversation sessions
//! - [`ConversationSession`]: Per-conversation timeline and lifecycle
//! - [`ClientEvent`]: Events fed into the client
//! - [`ClientAction`]: Actions produced by the client
//! - [`ConversationStore`]: Persistence contract for drivers

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod error;
mod event;
mod outbound;
mod presence;
mod session;
mod store;

pub use client::ChatClient;
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent};
pub use outbound::{TYPING_AUTO_STOP, TypingSend, TypingThrottle};
pub use presence::{PresenceRoster, TYPING_EXPIRY, TypingTracker};
pub use roost_core::{ConnectionStatus, env::Environment};
pub use session::{ConversationSession, JoinPhase, SessionState};
pub use store::{ConversationStore, MemoryStore, StoreError};
