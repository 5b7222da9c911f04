//! Chat client state machine.
//!
//! `ChatClient` is the top-level state machine: it owns the connection
//! manager, the subscription registry, and one session per conversation,
//! and turns caller events into ordered action lists. It performs no I/O;
//! the caller executes the actions and feeds outcomes back as events.

use std::collections::HashMap;

use roost_core::{
    Connection, ConnectionAction, ConnectionConfig, ConnectionError, SubscriptionRegistry,
    env::Environment,
};
use roost_proto::{
    ConversationId, TopicKey, UserId,
    event::{PublishBody, TopicEvent},
    payloads::{MessageKind, SendRequest, TypingSignal},
};
use tracing::{debug, warn};

use crate::{
    error::ClientError,
    event::{ClientAction, ClientEvent},
    outbound::{TypingSend, TypingThrottle},
    session::ConversationSession,
};

/// Chat client for one authenticated user.
///
/// Action ordering matters and the caller must execute each returned list
/// in order, within one event-loop turn. In particular, after a reconnect
/// handshake the user queue and conversation subscriptions are replayed
/// strictly before the `Connected` status is announced, so the connection
/// is never observably usable with missing subscriptions.
pub struct ChatClient<E: Environment> {
    env: E,
    connection: Connection<E::Instant>,
    registry: SubscriptionRegistry,
    sessions: HashMap<ConversationId, ConversationSession<E::Instant>>,
    throttles: HashMap<ConversationId, TypingThrottle<E::Instant>>,
    next_request_id: u64,
    focused: bool,
    user_id: Option<UserId>,
}

impl<E: Environment> ChatClient<E> {
    /// Create a client with default connection settings.
    pub fn new(env: E) -> Self {
        Self::with_config(env, ConnectionConfig::default())
    }

    /// Create a client with explicit connection settings.
    pub fn with_config(env: E, config: ConnectionConfig) -> Self {
        let now = env.now();
        Self {
            env,
            connection: Connection::new(now, config),
            registry: SubscriptionRegistry::new(),
            sessions: HashMap::new(),
            throttles: HashMap::new(),
            next_request_id: 0,
            focused: true,
            user_id: None,
        }
    }

    /// Whether the connection is authenticated and usable.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// The authenticated user, if a connect was issued.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// The session for `conversation_id`, if one exists.
    #[must_use]
    pub fn session(&self, conversation_id: ConversationId) -> Option<&ConversationSession<E::Instant>> {
        self.sessions.get(&conversation_id)
    }

    /// Number of conversation sessions (joining or joined).
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Process one event, returning the actions to execute in order.
    ///
    /// # Errors
    ///
    /// Returns an error when the event is an application intent the
    /// current state cannot honor (sending while disconnected, joining
    /// before connecting). Asynchronous failures reported by the broker
    /// surface as actions instead.
    pub fn handle(&mut self, event: ClientEvent) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::Connect { user_id, auth_token } => self.handle_connect(user_id, auth_token),
            ClientEvent::Disconnect => Ok(self.handle_disconnect()),
            ClientEvent::TransportOpened => self.handle_transport_opened(),
            ClientEvent::HandshakeRejected { reason } => Ok(self.handle_handshake_rejected(reason)),
            ClientEvent::TransportClosed => Ok(self.handle_transport_closed()),
            ClientEvent::ReconnectDue => {
                let now = self.env.now();
                Ok(map_connection_actions(self.connection.reconnect_due(now)))
            },
            ClientEvent::HeartbeatAck => {
                self.connection.record_activity(self.env.now());
                Ok(vec![])
            },
            ClientEvent::EventReceived { key: _, event } => Ok(self.handle_delivery(&event)),
            ClientEvent::SubscribeResult { key, result } => Ok(self.handle_subscribe_result(key, result)),
            ClientEvent::HistoryLoaded { conversation_id, request_id, messages } => {
                let Some(session) = self.sessions.get_mut(&conversation_id) else {
                    return Ok(vec![]);
                };
                let actions = session.history_loaded(request_id, messages);
                Ok(self.track_subscriptions(actions))
            },
            ClientEvent::HistoryFailed { conversation_id, request_id, reason } => {
                warn!(conversation_id, request_id, %reason, "history fetch failed");
                let Some(session) = self.sessions.get_mut(&conversation_id) else {
                    return Ok(vec![]);
                };
                Ok(session.history_failed(request_id, reason))
            },
            ClientEvent::JoinConversation { conversation_id } => self.handle_join(conversation_id),
            ClientEvent::LeaveConversation { conversation_id } => Ok(self.handle_leave(conversation_id)),
            ClientEvent::SendMessage { conversation_id, content, kind } => {
                self.handle_send(conversation_id, content, kind)
            },
            ClientEvent::SetTyping { conversation_id, is_typing } => {
                Ok(self.handle_set_typing(conversation_id, is_typing))
            },
            ClientEvent::MarkRead { conversation_id } => self.handle_mark_read(conversation_id),
            ClientEvent::FocusChanged { focused } => Ok(self.handle_focus_changed(focused)),
            ClientEvent::Tick => Ok(self.handle_tick()),
        }
    }

    fn handle_connect(
        &mut self,
        user_id: UserId,
        auth_token: String,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let now = self.env.now();
        let actions = self.connection.connect(user_id, auth_token, now)?;
        self.user_id = Some(user_id);
        debug!(user_id, "connecting");
        Ok(map_connection_actions(actions))
    }

    fn handle_disconnect(&mut self) -> Vec<ClientAction> {
        for throttle in self.throttles.values_mut() {
            throttle.reset();
        }
        map_connection_actions(self.connection.disconnect())
    }

    fn handle_transport_opened(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        let now = self.env.now();
        let status = self.connection.handshake_complete(now)?;

        // The user queue is subscribed before any conversation topic, and
        // it was registered first, so replay order already puts it first.
        if let Some(user_id) = self.user_id {
            self.registry.subscribe(TopicKey::notifications(user_id));
        }

        let mut actions: Vec<ClientAction> = self
            .registry
            .replay()
            .into_iter()
            .map(|(_, key)| ClientAction::Subscribe { key })
            .collect();
        actions.extend(map_connection_actions(status));
        debug!(subscriptions = self.registry.len(), "handshake complete, replaying subscriptions");
        Ok(actions)
    }

    fn handle_handshake_rejected(&mut self, reason: String) -> Vec<ClientAction> {
        warn!(%reason, "handshake rejected");
        let mut actions = map_connection_actions(self.connection.handshake_rejected());
        actions.extend(self.fail_pending_joins());
        actions.push(ClientAction::Error(ClientError::Connection(
            ConnectionError::AuthenticationRejected { reason },
        )));
        actions
    }

    fn handle_transport_closed(&mut self) -> Vec<ClientAction> {
        let now = self.env.now();
        let mut actions = map_connection_actions(self.connection.transport_closed(now));
        for throttle in self.throttles.values_mut() {
            throttle.reset();
        }
        actions.extend(self.fail_pending_joins());
        actions
    }

    /// Abort every in-flight join after a connection loss.
    ///
    /// A rolled-back join leaves no registry entries behind, so the
    /// post-reconnect replay covers exactly the surviving sessions.
    fn fail_pending_joins(&mut self) -> Vec<ClientAction> {
        let mut actions = Vec::new();
        for (conversation_id, session) in &mut self.sessions {
            let lost = session.connection_lost();
            if lost.iter().any(|a| matches!(a, ClientAction::JoinFailed { .. })) {
                self.registry.remove_conversation(*conversation_id);
            }
            actions.extend(lost);
        }
        actions
    }

    fn handle_delivery(&mut self, event: &TopicEvent) -> Vec<ClientAction> {
        let now = self.env.now();
        self.connection.record_activity(now);
        let now_ms = self.env.unix_time_ms();

        match event {
            TopicEvent::Notification(message) => {
                // Queue deliveries cover conversations without a session;
                // deliveries for a live session arrive on its topic.
                if self.focused || self.sessions.contains_key(&message.conversation_id) {
                    return vec![];
                }
                vec![ClientAction::Notify {
                    conversation_id: message.conversation_id,
                    sender_id: message.sender_id,
                    preview: message.content.clone(),
                }]
            },
            TopicEvent::Message(message) => {
                let Some(session) = self.sessions.get_mut(&message.conversation_id) else {
                    return vec![];
                };
                session.on_message(message.clone(), self.focused, now_ms)
            },
            TopicEvent::Typing(signal) => match self.sessions.get_mut(&signal.conversation_id) {
                Some(session) => session.on_typing(signal, now),
                None => vec![],
            },
            TopicEvent::ReadReceipt(receipt) => {
                match self.sessions.get_mut(&receipt.conversation_id) {
                    Some(session) => session.on_receipt(receipt),
                    None => vec![],
                }
            },
            TopicEvent::Presence(update) => match self.sessions.get_mut(&update.conversation_id) {
                Some(session) => session.on_presence(update),
                None => vec![],
            },
        }
    }

    fn handle_subscribe_result(
        &mut self,
        key: TopicKey,
        result: Result<(), String>,
    ) -> Vec<ClientAction> {
        let Some(conversation_id) = key.conversation_id() else {
            // User queue subscription; a refusal is not recoverable by a
            // session rollback, surface it directly.
            if let Err(reason) = result {
                warn!(topic = %key.path(), %reason, "queue subscription refused");
                return vec![ClientAction::Error(ClientError::Subscription {
                    topic: key.path(),
                    reason,
                })];
            }
            return vec![];
        };

        let Some(session) = self.sessions.get_mut(&conversation_id) else {
            return vec![];
        };

        if session.is_joined() {
            // Replay result for an established session.
            if let Err(reason) = result {
                warn!(topic = %key.path(), %reason, "resubscription refused");
                self.registry.remove_conversation(conversation_id);
                return vec![ClientAction::Error(ClientError::Subscription {
                    topic: key.path(),
                    reason,
                })];
            }
            return vec![];
        }

        let failed = result.is_err();
        let now_ms = self.env.unix_time_ms();
        let actions = session.subscribe_result(key.kind, result, now_ms);
        if failed {
            self.registry.remove_conversation(conversation_id);
        }
        actions
    }

    fn handle_join(
        &mut self,
        conversation_id: ConversationId,
    ) -> Result<Vec<ClientAction>, ClientError> {
        if !self.connection.is_connected() {
            return Err(ConnectionError::NotConnected { operation: "join conversation" }.into());
        }
        let Some(user_id) = self.user_id else {
            return Err(ConnectionError::NotConnected { operation: "join conversation" }.into());
        };

        self.next_request_id += 1;
        let request_id = self.next_request_id;
        let session = self
            .sessions
            .entry(conversation_id)
            .or_insert_with(|| ConversationSession::new(conversation_id, user_id));
        debug!(conversation_id, request_id, "joining conversation");
        Ok(session.begin_join(request_id))
    }

    fn handle_leave(&mut self, conversation_id: ConversationId) -> Vec<ClientAction> {
        let Some(mut session) = self.sessions.remove(&conversation_id) else {
            return vec![];
        };
        self.throttles.remove(&conversation_id);
        self.registry.remove_conversation(conversation_id);

        let now_ms = self.env.unix_time_ms();
        debug!(conversation_id, "leaving conversation");
        session.leave(now_ms)
    }

    fn handle_send(
        &mut self,
        conversation_id: ConversationId,
        content: String,
        kind: MessageKind,
    ) -> Result<Vec<ClientAction>, ClientError> {
        if !self.connection.is_connected() {
            return Err(ConnectionError::NotConnected { operation: "send message" }.into());
        }
        let Some(user_id) = self.user_id else {
            return Err(ConnectionError::NotConnected { operation: "send message" }.into());
        };
        let joined = self.sessions.get(&conversation_id).is_some_and(ConversationSession::is_joined);
        if !joined {
            return Err(ClientError::UnknownConversation(conversation_id));
        }

        // Server-echo-only: nothing is inserted locally. The message
        // appears when its broadcast echo arrives on the messages topic.
        Ok(vec![ClientAction::Publish {
            body: PublishBody::Send(SendRequest {
                correlation_id: self.env.random_u64(),
                conversation_id,
                sender_id: user_id,
                content,
                kind,
            }),
        }])
    }

    fn handle_set_typing(
        &mut self,
        conversation_id: ConversationId,
        is_typing: bool,
    ) -> Vec<ClientAction> {
        // Typing is best-effort; without a live joined session there is
        // nobody to signal.
        let joined = self.sessions.get(&conversation_id).is_some_and(ConversationSession::is_joined);
        if !self.connection.is_connected() || !joined {
            if let Some(throttle) = self.throttles.get_mut(&conversation_id) {
                throttle.reset();
            }
            return vec![];
        }
        let Some(user_id) = self.user_id else {
            return vec![];
        };

        let now = self.env.now();
        let throttle = self.throttles.entry(conversation_id).or_default();
        let Some(send) = throttle.set_typing(is_typing, now) else {
            return vec![];
        };

        vec![ClientAction::Publish {
            body: PublishBody::Typing(TypingSignal {
                conversation_id,
                user_id,
                is_typing: send == TypingSend::Start,
                sent_at: self.env.unix_time_ms(),
            }),
        }]
    }

    fn handle_mark_read(
        &mut self,
        conversation_id: ConversationId,
    ) -> Result<Vec<ClientAction>, ClientError> {
        if !self.connection.is_connected() {
            return Err(ConnectionError::NotConnected { operation: "mark read" }.into());
        }
        let Some(session) = self.sessions.get_mut(&conversation_id) else {
            return Err(ClientError::UnknownConversation(conversation_id));
        };
        let now_ms = self.env.unix_time_ms();
        Ok(session.mark_read(now_ms))
    }

    fn handle_focus_changed(&mut self, focused: bool) -> Vec<ClientAction> {
        self.focused = focused;
        if !focused || !self.connection.is_connected() {
            return vec![];
        }

        // Catch up on anything that arrived while unfocused.
        let now_ms = self.env.unix_time_ms();
        let mut actions = Vec::new();
        for session in self.sessions.values_mut() {
            if session.is_joined() {
                actions.extend(session.mark_read(now_ms));
            }
        }
        actions
    }

    fn handle_tick(&mut self) -> Vec<ClientAction> {
        let now = self.env.now();
        let connection_actions = self.connection.tick(now);
        let dropped = connection_actions.contains(&ConnectionAction::CloseTransport);
        let mut actions = map_connection_actions(connection_actions);

        if dropped {
            for throttle in self.throttles.values_mut() {
                throttle.reset();
            }
            actions.extend(self.fail_pending_joins());
            return actions;
        }

        for session in self.sessions.values_mut() {
            actions.extend(session.tick(now));
        }

        if self.connection.is_connected()
            && let Some(user_id) = self.user_id
        {
            let now_ms = self.env.unix_time_ms();
            for (conversation_id, throttle) in &mut self.throttles {
                if throttle.tick(now) == Some(TypingSend::Stop) {
                    actions.push(ClientAction::Publish {
                        body: PublishBody::Typing(TypingSignal {
                            conversation_id: *conversation_id,
                            user_id,
                            is_typing: false,
                            sent_at: now_ms,
                        }),
                    });
                }
            }
        }

        actions
    }

    /// Mirror Subscribe/Unsubscribe actions into the registry so the
    /// desired set is always replayable after a reconnect.
    ///
    /// A key the registry already holds keeps its entry and the duplicate
    /// `Subscribe` is dropped, so the broker never sees the same topic
    /// subscribed twice.
    fn track_subscriptions(&mut self, actions: Vec<ClientAction>) -> Vec<ClientAction> {
        actions
            .into_iter()
            .filter(|action| match action {
                ClientAction::Subscribe { key } => {
                    let (_, created) = self.registry.subscribe(*key);
                    created
                },
                ClientAction::Unsubscribe { key } => {
                    if let Some(handle) = self.registry.handle_for(key) {
                        self.registry.unsubscribe(handle);
                    }
                    true
                },
                _ => true,
            })
            .collect()
    }
}

fn map_connection_actions(actions: Vec<ConnectionAction>) -> Vec<ClientAction> {
    actions
        .into_iter()
        .map(|action| match action {
            ConnectionAction::OpenTransport { user_id, auth_token } => {
                ClientAction::OpenTransport { user_id, auth_token }
            },
            ConnectionAction::CloseTransport => ClientAction::CloseTransport,
            ConnectionAction::SendHeartbeat => ClientAction::SendHeartbeat,
            ConnectionAction::ScheduleReconnect { delay } => {
                ClientAction::ScheduleReconnect { delay }
            },
            ConnectionAction::StatusChanged(status) => ClientAction::StatusChanged(status),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use roost_core::{ConnectionStatus, env::test_utils::MockEnv};
    use roost_proto::{TopicKind, payloads::ChatMessage};

    use super::*;

    const USER: UserId = 1;
    const CONVERSATION: ConversationId = 7;

    fn connected_client() -> ChatClient<MockEnv> {
        let mut client = ChatClient::new(MockEnv::new());
        client
            .handle(ClientEvent::Connect { user_id: USER, auth_token: "token".to_string() })
            .unwrap();
        client.handle(ClientEvent::TransportOpened).unwrap();
        client
    }

    fn joined_client() -> ChatClient<MockEnv> {
        let mut client = connected_client();
        client.handle(ClientEvent::JoinConversation { conversation_id: CONVERSATION }).unwrap();
        client
            .handle(ClientEvent::HistoryLoaded {
                conversation_id: CONVERSATION,
                request_id: 1,
                messages: vec![],
            })
            .unwrap();
        for kind in TopicKind::CONVERSATION_KINDS {
            client
                .handle(ClientEvent::SubscribeResult {
                    key: TopicKey::conversation(kind, CONVERSATION),
                    result: Ok(()),
                })
                .unwrap();
        }
        assert!(client.session(CONVERSATION).unwrap().is_joined());
        client
    }

    fn incoming(id: u64, sender_id: UserId) -> ChatMessage {
        ChatMessage {
            id,
            conversation_id: CONVERSATION,
            sender_id,
            content: "hello".to_string(),
            kind: MessageKind::Text,
            created_at: id,
            read_at: None,
            read_by: None,
        }
    }

    #[test]
    fn handshake_replays_queue_before_status() {
        let mut client = ChatClient::new(MockEnv::new());
        client
            .handle(ClientEvent::Connect { user_id: USER, auth_token: "token".to_string() })
            .unwrap();

        let actions = client.handle(ClientEvent::TransportOpened).unwrap();
        assert_eq!(actions.first(), Some(&ClientAction::Subscribe {
            key: TopicKey::notifications(USER),
        }));
        assert_eq!(
            actions.last(),
            Some(&ClientAction::StatusChanged(ConnectionStatus::Connected))
        );
    }

    #[test]
    fn reconnect_replay_preserves_creation_order() {
        let mut client = joined_client();

        client.handle(ClientEvent::TransportClosed).unwrap();
        client.handle(ClientEvent::ReconnectDue).unwrap();
        let actions = client.handle(ClientEvent::TransportOpened).unwrap();

        let keys: Vec<TopicKey> = actions
            .iter()
            .filter_map(|a| match a {
                ClientAction::Subscribe { key } => Some(*key),
                _ => None,
            })
            .collect();

        let mut expected = vec![TopicKey::notifications(USER)];
        expected.extend(
            TopicKind::CONVERSATION_KINDS
                .into_iter()
                .map(|kind| TopicKey::conversation(kind, CONVERSATION)),
        );
        assert_eq!(keys, expected);
        assert_eq!(
            actions.last(),
            Some(&ClientAction::StatusChanged(ConnectionStatus::Connected))
        );
    }

    #[test]
    fn send_requires_connection_and_joined_session() {
        let mut client = ChatClient::new(MockEnv::new());
        let result = client.handle(ClientEvent::SendMessage {
            conversation_id: CONVERSATION,
            content: "hi".to_string(),
            kind: MessageKind::Text,
        });
        assert!(matches!(
            result,
            Err(ClientError::Connection(ConnectionError::NotConnected { .. }))
        ));

        let mut client = connected_client();
        let result = client.handle(ClientEvent::SendMessage {
            conversation_id: CONVERSATION,
            content: "hi".to_string(),
            kind: MessageKind::Text,
        });
        assert!(matches!(result, Err(ClientError::UnknownConversation(CONVERSATION))));
    }

    #[test]
    fn send_publishes_without_local_insert() {
        let mut client = joined_client();
        let actions = client
            .handle(ClientEvent::SendMessage {
                conversation_id: CONVERSATION,
                content: "hi".to_string(),
                kind: MessageKind::Text,
            })
            .unwrap();

        assert_eq!(actions.len(), 1);
        assert!(matches!(
            &actions[0],
            ClientAction::Publish { body: PublishBody::Send(request) }
                if request.sender_id == USER && request.content == "hi"
        ));
        assert!(client.session(CONVERSATION).unwrap().messages().is_empty());
    }

    #[test]
    fn transport_loss_fails_pending_join_fast() {
        let mut client = connected_client();
        client.handle(ClientEvent::JoinConversation { conversation_id: CONVERSATION }).unwrap();

        let actions = client.handle(ClientEvent::TransportClosed).unwrap();
        assert!(actions.iter().any(|a| matches!(a, ClientAction::JoinFailed { .. })));
        assert!(actions.iter().any(|a| matches!(a, ClientAction::ScheduleReconnect { .. })));
    }

    #[test]
    fn join_requires_connection() {
        let mut client = ChatClient::new(MockEnv::new());
        let result = client.handle(ClientEvent::JoinConversation { conversation_id: CONVERSATION });
        assert!(matches!(
            result,
            Err(ClientError::Connection(ConnectionError::NotConnected { .. }))
        ));
    }

    #[test]
    fn stale_delivery_after_leave_is_ignored() {
        let mut client = joined_client();
        client.handle(ClientEvent::LeaveConversation { conversation_id: CONVERSATION }).unwrap();

        let actions = client
            .handle(ClientEvent::EventReceived {
                key: TopicKey::conversation(TopicKind::Messages, CONVERSATION),
                event: TopicEvent::Message(incoming(10, 2)),
            })
            .unwrap();
        assert!(actions.is_empty());
        assert_eq!(client.session_count(), 0);
    }

    #[test]
    fn leave_prunes_registry_so_replay_skips_it() {
        let mut client = joined_client();
        client.handle(ClientEvent::LeaveConversation { conversation_id: CONVERSATION }).unwrap();

        client.handle(ClientEvent::TransportClosed).unwrap();
        client.handle(ClientEvent::ReconnectDue).unwrap();
        let actions = client.handle(ClientEvent::TransportOpened).unwrap();

        let subscribes = actions
            .iter()
            .filter(|a| matches!(a, ClientAction::Subscribe { .. }))
            .count();
        assert_eq!(subscribes, 1, "only the user queue remains");
    }

    #[test]
    fn typing_throttle_collapses_repeats() {
        let mut client = joined_client();

        let first = client
            .handle(ClientEvent::SetTyping { conversation_id: CONVERSATION, is_typing: true })
            .unwrap();
        assert_eq!(first.len(), 1);

        let repeat = client
            .handle(ClientEvent::SetTyping { conversation_id: CONVERSATION, is_typing: true })
            .unwrap();
        assert!(repeat.is_empty());
    }

    #[test]
    fn typing_auto_stop_publishes_on_tick() {
        let env = MockEnv::new();
        let mut client = ChatClient::new(env.clone());
        client
            .handle(ClientEvent::Connect { user_id: USER, auth_token: "token".to_string() })
            .unwrap();
        client.handle(ClientEvent::TransportOpened).unwrap();
        client.handle(ClientEvent::JoinConversation { conversation_id: CONVERSATION }).unwrap();
        client
            .handle(ClientEvent::HistoryLoaded {
                conversation_id: CONVERSATION,
                request_id: 1,
                messages: vec![],
            })
            .unwrap();
        for kind in TopicKind::CONVERSATION_KINDS {
            client
                .handle(ClientEvent::SubscribeResult {
                    key: TopicKey::conversation(kind, CONVERSATION),
                    result: Ok(()),
                })
                .unwrap();
        }

        client
            .handle(ClientEvent::SetTyping { conversation_id: CONVERSATION, is_typing: true })
            .unwrap();

        env.advance(std::time::Duration::from_secs(3));
        let actions = client.handle(ClientEvent::Tick).unwrap();
        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::Publish { body: PublishBody::Typing(signal) } if !signal.is_typing
        )));
    }

    #[test]
    fn auth_rejection_surfaces_error_action() {
        let mut client = ChatClient::new(MockEnv::new());
        client
            .handle(ClientEvent::Connect { user_id: USER, auth_token: "bad".to_string() })
            .unwrap();

        let actions = client
            .handle(ClientEvent::HandshakeRejected { reason: "invalid token".to_string() })
            .unwrap();
        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::Error(ClientError::Connection(
                ConnectionError::AuthenticationRejected { .. }
            ))
        )));
        assert!(!actions.iter().any(|a| matches!(a, ClientAction::ScheduleReconnect { .. })));
    }

    #[test]
    fn focused_delivery_marks_read_unfocused_notifies() {
        let mut client = joined_client();

        let actions = client
            .handle(ClientEvent::EventReceived {
                key: TopicKey::conversation(TopicKind::Messages, CONVERSATION),
                event: TopicEvent::Message(incoming(10, 2)),
            })
            .unwrap();
        assert!(actions.iter().any(|a| matches!(a, ClientAction::PersistRead { .. })));

        client.handle(ClientEvent::FocusChanged { focused: false }).unwrap();
        let actions = client
            .handle(ClientEvent::EventReceived {
                key: TopicKey::conversation(TopicKind::Messages, CONVERSATION),
                event: TopicEvent::Message(incoming(11, 2)),
            })
            .unwrap();
        assert!(actions.iter().any(|a| matches!(a, ClientAction::Notify { .. })));

        // Refocusing catches up.
        let actions = client.handle(ClientEvent::FocusChanged { focused: true }).unwrap();
        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::PersistRead { message_ids, .. } if message_ids == &vec![11]
        )));
    }
}
