//! Transport connection lifecycle state machine.
//!
//! Manages connect, authenticate, heartbeat, drop detection, and
//! reconnect-with-bounded-retry for the single broker connection a client
//! session owns. Uses the action pattern: methods take time as input and
//! return actions for the driver to execute. This keeps the state machine
//! pure (no I/O) and makes testing straightforward.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐ connect ┌────────────┐ handshake ok ┌───────────┐
//! │ Disconnected │────────>│ Connecting │─────────────>│ Connected │
//! └──────────────┘         └────────────┘              └───────────┘
//!        ^                       │ rejected                  │ drop /
//!        │                       v                           │ idle timeout
//!        │                 ┌──────────────┐                  v
//!        │<────────────────│ Disconnected │          ┌──────────────┐
//!        │  attempts       └──────────────┘          │ Reconnecting │
//!        │  exhausted                                └──────────────┘
//!        └───────────────────────────────────────────────────┘
//! ```
//!
//! Subscriptions are invalidated the instant the state leaves `Connected`;
//! the orchestrating client replays the registry's desired set before the
//! connection is reported usable again.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use roost_proto::UserId;

use crate::error::ConnectionError;

/// Interval at which the client sends heartbeat pings while connected.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Maximum time without any inbound activity before the connection is
/// treated as dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed delay between reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Maximum reconnect attempts before giving up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport; explicit `connect` required.
    Disconnected,
    /// Initial transport open + handshake in flight.
    Connecting,
    /// Authenticated and usable.
    Connected,
    /// Transport dropped; retrying on a fixed delay.
    Reconnecting,
}

/// Connection status surfaced to the application.
///
/// This is the single user-visible connection indicator; transient faults
/// (a missed heartbeat, one failed attempt) never surface as errors, only
/// as status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Not connected (initial, explicit disconnect, or auth rejection).
    Disconnected,
    /// Initial connect in progress.
    Connecting,
    /// Connected and usable: subscriptions have been replayed.
    Connected,
    /// Dropped; attempt `attempt` of the configured maximum is pending.
    Reconnecting {
        /// 1-based attempt number about to run.
        attempt: u32,
    },
    /// Terminal: reconnect attempts exhausted. Emitted exactly once.
    Lost {
        /// Total attempts made before giving up.
        attempts: u32,
    },
}

/// Actions returned by the connection state machine.
///
/// The driver executes these in order within one event-loop turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open the transport and authenticate in the handshake.
    ///
    /// The bearer credential travels in the connection handshake, never in
    /// a message body.
    OpenTransport {
        /// Authenticating user.
        user_id: UserId,
        /// Bearer credential for the handshake.
        auth_token: String,
    },

    /// Tear down the transport.
    CloseTransport,

    /// Send a heartbeat ping.
    SendHeartbeat,

    /// Arm the reconnect timer; the driver feeds `reconnect_due` back when
    /// it fires.
    ScheduleReconnect {
        /// Delay before the next attempt.
        delay: Duration,
    },

    /// Publish a connection-status transition to the application.
    StatusChanged(ConnectionStatus),
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Heartbeat send interval while connected.
    pub heartbeat_interval: Duration,
    /// Inbound inactivity window treated as a drop.
    pub idle_timeout: Duration,
    /// Fixed delay between reconnect attempts.
    pub reconnect_delay: Duration,
    /// Attempt cap before the terminal `Lost` status.
    pub max_reconnect_attempts: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

/// Connection state machine.
///
/// This is a pure state machine: no I/O, no stored environment. Time is
/// passed as a parameter to the methods that need it.
///
/// Generic over `Instant` to support both real time and virtual time for
/// deterministic testing.
#[derive(Debug, Clone)]
pub struct Connection<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    state: ConnectionState,
    config: ConnectionConfig,
    /// Credentials captured at `connect`, replayed on reconnect attempts.
    credentials: Option<(UserId, String)>,
    /// Attempts started since the last drop.
    reconnect_attempts: u32,
    last_activity: I,
    last_heartbeat: Option<I>,
}

impl<I> Connection<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a new connection in [`ConnectionState::Disconnected`].
    pub fn new(now: I, config: ConnectionConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            config,
            credentials: None,
            reconnect_attempts: 0,
            last_activity: now,
            last_heartbeat: None,
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True while authenticated and usable.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Authenticating user. `None` when disconnected.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.credentials.as_ref().map(|(user_id, _)| *user_id)
    }

    /// Reconnect attempts started since the last drop.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Begin connecting: `Disconnected → Connecting`.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if not in `Disconnected`
    pub fn connect(
        &mut self,
        user_id: UserId,
        auth_token: String,
        now: I,
    ) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if self.state != ConnectionState::Disconnected {
            return Err(ConnectionError::InvalidState {
                state: self.state,
                operation: "connect",
            });
        }

        self.state = ConnectionState::Connecting;
        self.credentials = Some((user_id, auth_token.clone()));
        self.reconnect_attempts = 0;
        self.last_activity = now;

        Ok(vec![
            ConnectionAction::StatusChanged(ConnectionStatus::Connecting),
            ConnectionAction::OpenTransport { user_id, auth_token },
        ])
    }

    /// The transport opened and the handshake credential was accepted:
    /// `Connecting | Reconnecting → Connected`.
    ///
    /// The orchestrating client inserts its subscription replay before the
    /// returned `Connected` status so the connection is never reported
    /// usable ahead of its subscriptions.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if not connecting or reconnecting
    pub fn handshake_complete(&mut self, now: I) -> Result<Vec<ConnectionAction>, ConnectionError> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Reconnecting => {},
            state => {
                return Err(ConnectionError::InvalidState {
                    state,
                    operation: "handshake_complete",
                });
            },
        }

        self.state = ConnectionState::Connected;
        self.reconnect_attempts = 0;
        self.last_activity = now;
        self.last_heartbeat = None;

        Ok(vec![ConnectionAction::StatusChanged(ConnectionStatus::Connected)])
    }

    /// The handshake credential was rejected: back to `Disconnected`.
    ///
    /// Auth failures are never retried automatically; the caller surfaces
    /// [`ConnectionError::AuthenticationRejected`] and waits for an
    /// explicit re-`connect`.
    pub fn handshake_rejected(&mut self) -> Vec<ConnectionAction> {
        self.state = ConnectionState::Disconnected;
        self.credentials = None;
        self.reconnect_attempts = 0;

        vec![
            ConnectionAction::CloseTransport,
            ConnectionAction::StatusChanged(ConnectionStatus::Disconnected),
        ]
    }

    /// The transport closed unexpectedly.
    ///
    /// From `Connected` this starts the fixed-delay retry loop; from
    /// `Reconnecting` it records a failed attempt and either schedules the
    /// next one or gives up with the terminal `Lost` status; from
    /// `Connecting` (initial connect, never previously connected) it
    /// returns to `Disconnected` without retrying.
    pub fn transport_closed(&mut self, now: I) -> Vec<ConnectionAction> {
        self.last_activity = now;

        match self.state {
            ConnectionState::Connected => self.begin_reconnect(),
            ConnectionState::Connecting => {
                self.state = ConnectionState::Disconnected;
                self.credentials = None;
                vec![ConnectionAction::StatusChanged(ConnectionStatus::Disconnected)]
            },
            ConnectionState::Reconnecting => {
                if self.reconnect_attempts >= self.config.max_reconnect_attempts {
                    let attempts = self.reconnect_attempts;
                    self.state = ConnectionState::Disconnected;
                    self.credentials = None;
                    self.reconnect_attempts = 0;
                    vec![ConnectionAction::StatusChanged(ConnectionStatus::Lost { attempts })]
                } else {
                    vec![
                        ConnectionAction::StatusChanged(ConnectionStatus::Reconnecting {
                            attempt: self.reconnect_attempts + 1,
                        }),
                        ConnectionAction::ScheduleReconnect {
                            delay: self.config.reconnect_delay,
                        },
                    ]
                }
            },
            ConnectionState::Disconnected => vec![],
        }
    }

    /// The reconnect timer fired: start the next attempt.
    ///
    /// A stale timer (fired after an explicit `disconnect` or a completed
    /// reconnect) is a no-op, not an error.
    pub fn reconnect_due(&mut self, now: I) -> Vec<ConnectionAction> {
        if self.state != ConnectionState::Reconnecting {
            return vec![];
        }

        let Some((user_id, auth_token)) = self.credentials.clone() else {
            // Credentials are held for the whole Reconnecting phase; their
            // absence means disconnect raced the timer.
            return vec![];
        };

        self.reconnect_attempts += 1;
        self.last_activity = now;

        vec![ConnectionAction::OpenTransport { user_id, auth_token }]
    }

    /// Explicit disconnect. Safe from any state; no further retries.
    pub fn disconnect(&mut self) -> Vec<ConnectionAction> {
        let was_disconnected = self.state == ConnectionState::Disconnected;
        self.state = ConnectionState::Disconnected;
        self.credentials = None;
        self.reconnect_attempts = 0;

        if was_disconnected {
            return vec![];
        }

        vec![
            ConnectionAction::CloseTransport,
            ConnectionAction::StatusChanged(ConnectionStatus::Disconnected),
        ]
    }

    /// Mark inbound activity (any delivery or heartbeat reply).
    pub fn record_activity(&mut self, now: I) {
        self.last_activity = now;
    }

    /// Periodic maintenance: idle detection and heartbeats.
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        if self.state != ConnectionState::Connected {
            return vec![];
        }

        if now - self.last_activity > self.config.idle_timeout {
            // Silent transport death; same recovery path as an explicit
            // close notification.
            let mut actions = vec![ConnectionAction::CloseTransport];
            actions.extend(self.begin_reconnect());
            return actions;
        }

        let due = match self.last_heartbeat {
            None => true,
            Some(last) => now - last >= self.config.heartbeat_interval,
        };

        if due {
            self.last_heartbeat = Some(now);
            return vec![ConnectionAction::SendHeartbeat];
        }

        vec![]
    }

    fn begin_reconnect(&mut self) -> Vec<ConnectionAction> {
        self.state = ConnectionState::Reconnecting;
        self.reconnect_attempts = 0;

        vec![
            ConnectionAction::StatusChanged(ConnectionStatus::Reconnecting { attempt: 1 }),
            ConnectionAction::ScheduleReconnect { delay: self.config.reconnect_delay },
        ]
    }
}
