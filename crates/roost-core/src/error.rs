//! Error types for the connection and subscription layers.
//!
//! Strongly-typed errors per the failure taxonomy: authentication rejection
//! and exhausted reconnection are terminal and surfaced to the application;
//! everything else is either recoverable by the caller (`NotConnected`) or
//! handled internally by the reconnect logic.
//!
//! We avoid `std::io::Error` for protocol logic to keep error handling and
//! recovery decisions type-driven.

use std::io;

use thiserror::Error;

use crate::connection::ConnectionState;

/// Errors from the connection lifecycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The handshake credential was rejected. Never retried automatically;
    /// the caller must re-authenticate and call `connect` again.
    #[error("authentication rejected: {reason}")]
    AuthenticationRejected {
        /// Rejection reason from the broker.
        reason: String,
    },

    /// The transport dropped and reconnect attempts were exhausted.
    /// Not retried further without explicit user action.
    #[error("connection lost after {attempts} reconnect attempts")]
    ConnectionLost {
        /// How many reconnect attempts were made.
        attempts: u32,
    },

    /// An outbound operation was attempted while not connected (or the
    /// conversation was not joined). Recoverable by retrying once
    /// connected.
    #[error("not connected: cannot {operation}")]
    NotConnected {
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// Invalid state transition attempted.
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when the error occurred.
        state: ConnectionState,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// Underlying transport failure.
    #[error("transport error: {reason}")]
    Transport {
        /// Failure description.
        reason: String,
    },
}

impl ConnectionError {
    /// Returns true if this error is terminal for the connection.
    ///
    /// Terminal errors require explicit user action (re-authenticate or
    /// reconnect); everything else is either transient or a caller bug.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AuthenticationRejected { .. } | Self::ConnectionLost { .. })
    }
}

/// Boundary conversion for async I/O APIs. Internally we stay typed.
impl From<ConnectionError> for io::Error {
    fn from(err: ConnectionError) -> Self {
        let kind = match &err {
            ConnectionError::AuthenticationRejected { .. } => io::ErrorKind::PermissionDenied,
            ConnectionError::ConnectionLost { .. } => io::ErrorKind::ConnectionReset,
            ConnectionError::NotConnected { .. } => io::ErrorKind::NotConnected,
            ConnectionError::InvalidState { .. } => io::ErrorKind::InvalidInput,
            ConnectionError::Transport { .. } => io::ErrorKind::Other,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<io::Error> for ConnectionError {
    fn from(err: io::Error) -> Self {
        Self::Transport { reason: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_and_exhaustion_are_terminal() {
        assert!(
            ConnectionError::AuthenticationRejected { reason: "bad token".to_string() }
                .is_terminal()
        );
        assert!(ConnectionError::ConnectionLost { attempts: 10 }.is_terminal());
    }

    #[test]
    fn recoverable_errors_are_not_terminal() {
        assert!(!ConnectionError::NotConnected { operation: "send_message" }.is_terminal());
        assert!(
            !ConnectionError::Transport { reason: "reset by peer".to_string() }.is_terminal()
        );
        assert!(
            !ConnectionError::InvalidState {
                state: ConnectionState::Connecting,
                operation: "connect",
            }
            .is_terminal()
        );
    }
}
