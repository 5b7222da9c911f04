//! Client events and actions.

use std::time::Duration;

use roost_core::ConnectionStatus;
use roost_proto::{
    ConversationId, MessageId, TimestampMs, TopicKey, UserId,
    event::{PublishBody, TopicEvent},
    payloads::{ChatMessage, MessageKind},
};

use crate::error::ClientError;

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Receiving and decoding broker deliveries
/// - Reporting transport and subscription outcomes
/// - Driving time forward via ticks
/// - Forwarding application intents (join, send, typing, mark read)
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Application wants to connect and authenticate as `user_id`.
    Connect {
        /// Authenticating user.
        user_id: UserId,
        /// Bearer credential for the connection handshake.
        auth_token: String,
    },

    /// Application wants to disconnect.
    Disconnect,

    /// The transport opened and the handshake credential was accepted.
    TransportOpened,

    /// The handshake credential was rejected.
    HandshakeRejected {
        /// Broker-supplied rejection reason.
        reason: String,
    },

    /// The transport closed, expectedly or not.
    TransportClosed,

    /// A previously scheduled reconnect timer fired.
    ReconnectDue,

    /// A heartbeat reply arrived.
    HeartbeatAck,

    /// A decoded delivery arrived on a subscribed topic.
    EventReceived {
        /// Topic the delivery arrived on.
        key: TopicKey,
        /// Decoded payload.
        event: TopicEvent,
    },

    /// The broker answered a subscribe request.
    SubscribeResult {
        /// Topic the request was for.
        key: TopicKey,
        /// Broker outcome; `Err` carries the refusal reason.
        result: Result<(), String>,
    },

    /// A history page arrived for a pending join.
    HistoryLoaded {
        /// Conversation the page belongs to.
        conversation_id: ConversationId,
        /// Request generation this page answers.
        request_id: u64,
        /// Page of persisted messages, oldest first.
        messages: Vec<ChatMessage>,
    },

    /// A history fetch failed.
    HistoryFailed {
        /// Conversation the fetch was for.
        conversation_id: ConversationId,
        /// Request generation that failed.
        request_id: u64,
        /// Failure reason from the history source.
        reason: String,
    },

    /// Application wants to join a conversation.
    JoinConversation {
        /// Conversation to join.
        conversation_id: ConversationId,
    },

    /// Application wants to leave a conversation.
    LeaveConversation {
        /// Conversation to leave.
        conversation_id: ConversationId,
    },

    /// Application wants to send a message.
    SendMessage {
        /// Target conversation.
        conversation_id: ConversationId,
        /// Message body.
        content: String,
        /// Content kind.
        kind: MessageKind,
    },

    /// Application typing state changed.
    SetTyping {
        /// Target conversation.
        conversation_id: ConversationId,
        /// Whether the local user is typing.
        is_typing: bool,
    },

    /// Application wants to mark a conversation read.
    MarkRead {
        /// Conversation to mark.
        conversation_id: ConversationId,
    },

    /// The application window gained or lost focus.
    FocusChanged {
        /// Whether the conversation view is now focused.
        focused: bool,
    },

    /// Time tick for timeout processing.
    ///
    /// The caller sends ticks periodically so the client can run
    /// heartbeats, idle detection, and typing expiry.
    Tick,
}

/// Actions the client produces for the caller to execute, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Open the transport and authenticate in the handshake.
    OpenTransport {
        /// Authenticating user.
        user_id: UserId,
        /// Bearer credential.
        auth_token: String,
    },

    /// Tear down the transport.
    CloseTransport,

    /// Send a heartbeat ping.
    SendHeartbeat,

    /// Arm the reconnect timer; feed back [`ClientEvent::ReconnectDue`]
    /// when it fires.
    ScheduleReconnect {
        /// Delay before the next attempt.
        delay: Duration,
    },

    /// Subscribe to a topic on the live transport.
    Subscribe {
        /// Topic to subscribe.
        key: TopicKey,
    },

    /// Drop a live subscription.
    Unsubscribe {
        /// Topic to unsubscribe.
        key: TopicKey,
    },

    /// Publish an outbound payload to its destination.
    Publish {
        /// Payload and destination.
        body: PublishBody,
    },

    /// Load a conversation's persisted history page.
    FetchHistory {
        /// Conversation to load.
        conversation_id: ConversationId,
        /// Request generation; echo it back on the result event.
        request_id: u64,
    },

    /// Persist read state for the given messages.
    PersistRead {
        /// Conversation the messages belong to.
        conversation_id: ConversationId,
        /// User who read them.
        reader_id: UserId,
        /// Messages transitioning to read.
        message_ids: Vec<MessageId>,
        /// Read timestamp to persist.
        read_at: TimestampMs,
    },

    /// Connection status transition for the application.
    StatusChanged(ConnectionStatus),

    /// A history page merged into a conversation timeline.
    ///
    /// Carries the full merged timeline so a view can fold it in without
    /// replaying the page message by message.
    HistoryMerged {
        /// Conversation the page merged into.
        conversation_id: ConversationId,
        /// The timeline after the merge, ordered.
        messages: Vec<ChatMessage>,
    },

    /// A message was appended to a conversation timeline.
    MessageReceived {
        /// Conversation the message belongs to.
        conversation_id: ConversationId,
        /// The appended message.
        message: ChatMessage,
    },

    /// A remote participant's typing state changed.
    TypingChanged {
        /// Conversation scope.
        conversation_id: ConversationId,
        /// Participant whose state changed.
        user_id: UserId,
        /// New typing state.
        is_typing: bool,
    },

    /// A participant joined or left the conversation presence set.
    PresenceChanged {
        /// Conversation scope.
        conversation_id: ConversationId,
        /// Participant whose presence changed.
        user_id: UserId,
        /// New presence state.
        is_online: bool,
    },

    /// Read receipts were applied to the local timeline.
    ReadReceiptsApplied {
        /// Conversation scope.
        conversation_id: ConversationId,
        /// User who read the messages.
        reader_id: UserId,
        /// Messages that transitioned to read.
        message_ids: Vec<MessageId>,
        /// Read timestamp applied.
        read_at: TimestampMs,
    },

    /// A join completed; the session timeline is live.
    Joined {
        /// Conversation now joined.
        conversation_id: ConversationId,
    },

    /// A join failed and was rolled back.
    JoinFailed {
        /// Conversation the join was for.
        conversation_id: ConversationId,
        /// Failure cause.
        error: ClientError,
    },

    /// A conversation was left; its session is gone.
    Left {
        /// Conversation that was left.
        conversation_id: ConversationId,
    },

    /// Show a system notification for an unfocused delivery.
    Notify {
        /// Conversation the message arrived in.
        conversation_id: ConversationId,
        /// Message sender.
        sender_id: UserId,
        /// Notification body preview.
        preview: String,
    },

    /// A failure the application must react to.
    Error(ClientError),
}
