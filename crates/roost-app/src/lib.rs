//! Application layer for roost
//!
//! Observable view state and a generic runtime for chat orchestration,
//! enabling deterministic testing with the same code that runs in
//! production.
//!
//! # Components
//!
//! - [`ChatApp`]: observable view state (timelines, presence, typing)
//! - [`AppHandle`]: the handle UIs submit intents through
//! - [`Driver`]: trait for platform-specific I/O abstraction
//! - [`Runtime`]: generic orchestration loop using Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod app;
mod driver;
mod runtime;
mod state;

pub use app::{AppHandle, ChatApp};
pub use driver::Driver;
pub use roost_client::{ClientError, ConnectionStatus};
pub use runtime::Runtime;
pub use state::ConversationView;
