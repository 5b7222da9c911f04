//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific
//! I/O implementations. Each platform implements the trait (a STOMP
//! websocket in production, a scripted broker in tests), while the
//! generic [`crate::Runtime`] handles all orchestration.

use std::future::Future;

use roost_client::ClientEvent;
use roost_proto::{
    ConversationId, MessageId, TimestampMs, TopicKey, UserId, event::PublishBody,
};

use crate::app::ChatApp;

/// Abstracts I/O operations for the application runtime.
///
/// Subscription and history outcomes are asynchronous on the real broker,
/// so the corresponding methods only issue the request; the result comes
/// back later through [`Driver::poll_event`] as a
/// [`ClientEvent::SubscribeResult`] or [`ClientEvent::HistoryLoaded`].
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Poll for the next inbound event: transport outcomes, decoded
    /// deliveries, subscription results, or user intents.
    ///
    /// Returns `None` when no event is ready this turn.
    fn poll_event(&mut self)
    -> impl Future<Output = Result<Option<ClientEvent>, Self::Error>> + Send;

    /// Open the transport and authenticate in the handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot even be attempted; a
    /// refused handshake is reported via `poll_event` instead.
    fn open_transport(
        &mut self,
        user_id: UserId,
        auth_token: String,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Tear down the transport.
    fn close_transport(&mut self) -> impl Future<Output = ()> + Send;

    /// Send a heartbeat ping.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport write fails.
    fn send_heartbeat(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Issue a subscribe request for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be written.
    fn subscribe(&mut self, key: TopicKey)
    -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Drop the live subscription for `key`.
    fn unsubscribe(&mut self, key: TopicKey) -> impl Future<Output = ()> + Send;

    /// Publish an outbound payload to its destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport write fails.
    fn publish(&mut self, body: PublishBody)
    -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Request a conversation's history page; the result arrives via
    /// `poll_event` tagged with `request_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be issued.
    fn fetch_history(
        &mut self,
        conversation_id: ConversationId,
        request_id: u64,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Persist read state for the given messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    fn persist_read(
        &mut self,
        conversation_id: ConversationId,
        reader_id: UserId,
        message_ids: Vec<MessageId>,
        read_at: TimestampMs,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Show a system notification for an unfocused delivery.
    fn notify(
        &mut self,
        conversation_id: ConversationId,
        sender_id: UserId,
        preview: String,
    ) -> impl Future<Output = ()> + Send;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &ChatApp) -> Result<(), Self::Error>;

    /// Stop the connection and clean up resources.
    fn stop(&mut self);
}
