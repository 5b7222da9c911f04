//! Sans-IO building blocks for the roost realtime messaging core.
//!
//! Everything here is a pure state machine or data structure: methods take
//! time as input and return actions for a driver to execute. No I/O, no
//! ambient clocks, no global state. The [`env::Environment`] abstraction
//! supplies time and randomness so the same logic runs against the real
//! clock in production and a virtual clock in tests.

pub mod connection;
pub mod env;
pub mod error;
pub mod registry;
pub mod timer;

pub use connection::{
    Connection, ConnectionAction, ConnectionConfig, ConnectionState, ConnectionStatus,
};
pub use error::ConnectionError;
pub use registry::{SubscriptionHandle, SubscriptionRegistry};
pub use timer::{ExpiryMap, ExpiryTimer};
