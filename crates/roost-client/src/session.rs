//! Conversation session state machine.
//!
//! One session per joined conversation. Owns the message timeline, the
//! presence roster, and inbound typing state, and drives the join/leave
//! lifecycle:
//!
//! ```text
//! Idle ──join──> Joining(FetchingHistory) ──history──> Joining(Subscribing)
//!   ^                    │                                    │
//!   │                    │ fetch failed              all four │ any refusal:
//!   │<───────────────────┘                          confirmed │ rollback
//!   │                                                         v
//!   └──────────────────────────leave───────────────────── Joined
//! ```
//!
//! A join is atomic: the session reaches `Joined` only after the history
//! page merged and all four conversation topics confirmed. Any failure
//! rolls back every subscription already confirmed and returns to `Idle`.
//!
//! The timeline is server-echo-only: a sent message appears when its
//! broadcast echo arrives on the messages topic, never before. Dedupe is
//! by server message id, which also makes redeliveries idempotent.

use std::collections::{HashMap, HashSet};

use roost_core::ConnectionError;
use roost_proto::{
    ConversationId, MessageId, TimestampMs, TopicKey, TopicKind, UserId,
    event::PublishBody,
    payloads::{ChatMessage, PresenceAction, PresenceUpdate, ReadReceipt, TypingSignal},
};

use crate::{
    error::ClientError,
    event::ClientAction,
    presence::{PresenceRoster, TypingTracker},
};

/// Longest notification preview, in characters.
const NOTIFY_PREVIEW_CHARS: usize = 80;

/// Phase of an in-flight join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPhase {
    /// History page requested, not yet merged.
    FetchingHistory,
    /// History merged; waiting for topic confirmations.
    Subscribing,
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not joined; no live subscriptions.
    Idle,
    /// Join pipeline in flight.
    Joining(JoinPhase),
    /// Timeline live; all conversation topics confirmed.
    Joined,
}

/// State for one conversation the local user has joined or is joining.
#[derive(Debug, Clone)]
pub struct ConversationSession<I> {
    conversation_id: ConversationId,
    local_user: UserId,
    state: SessionState,
    /// Generation of the pending history request. A stale response
    /// (earlier generation, or arriving after leave) is discarded.
    request_id: u64,
    pending_kinds: HashSet<TopicKind>,
    confirmed_kinds: Vec<TopicKind>,
    /// Timeline ordered by (`created_at`, id).
    messages: Vec<ChatMessage>,
    known_ids: HashSet<MessageId>,
    /// Receipts that arrived before their message. Applied on merge.
    pending_receipts: HashMap<MessageId, (UserId, TimestampMs)>,
    roster: PresenceRoster,
    typing: TypingTracker<I>,
}

impl<I: Copy + Ord> ConversationSession<I> {
    /// Create an idle session for `conversation_id`.
    pub fn new(conversation_id: ConversationId, local_user: UserId) -> Self {
        Self {
            conversation_id,
            local_user,
            state: SessionState::Idle,
            request_id: 0,
            pending_kinds: HashSet::new(),
            confirmed_kinds: Vec::new(),
            messages: Vec::new(),
            known_ids: HashSet::new(),
            pending_receipts: HashMap::new(),
            roster: PresenceRoster::new(),
            typing: TypingTracker::new(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the timeline is live.
    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.state == SessionState::Joined
    }

    /// The ordered timeline.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Whether `user_id` is present in the conversation.
    #[must_use]
    pub fn is_user_online(&self, user_id: UserId) -> bool {
        self.roster.is_online(user_id)
    }

    /// Number of present participants.
    #[must_use]
    pub fn online_count(&self) -> usize {
        self.roster.online_count()
    }

    /// Whether `user_id` is currently typing.
    #[must_use]
    pub fn is_typing(&self, user_id: UserId) -> bool {
        self.typing.is_typing(user_id)
    }

    /// Messages from other participants not yet read by the local user.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.sender_id != self.local_user && m.read_at.is_none())
            .count()
    }

    /// Start the join pipeline.
    ///
    /// Idempotent: joining an already-joined session re-emits `Joined`,
    /// and a second join while one is in flight is a no-op.
    pub fn begin_join(&mut self, request_id: u64) -> Vec<ClientAction> {
        match self.state {
            SessionState::Joined => {
                vec![ClientAction::Joined { conversation_id: self.conversation_id }]
            },
            SessionState::Joining(_) => vec![],
            SessionState::Idle => {
                self.state = SessionState::Joining(JoinPhase::FetchingHistory);
                self.request_id = request_id;
                vec![ClientAction::FetchHistory {
                    conversation_id: self.conversation_id,
                    request_id,
                }]
            },
        }
    }

    /// A history page arrived. Stale generations are discarded.
    pub fn history_loaded(
        &mut self,
        request_id: u64,
        messages: Vec<ChatMessage>,
    ) -> Vec<ClientAction> {
        if self.state != SessionState::Joining(JoinPhase::FetchingHistory)
            || request_id != self.request_id
        {
            return vec![];
        }

        for message in messages {
            self.merge_message(message);
        }

        self.state = SessionState::Joining(JoinPhase::Subscribing);
        self.pending_kinds = TopicKind::CONVERSATION_KINDS.into_iter().collect();
        self.confirmed_kinds.clear();

        let mut actions = Vec::new();
        if !self.messages.is_empty() {
            actions.push(ClientAction::HistoryMerged {
                conversation_id: self.conversation_id,
                messages: self.messages.clone(),
            });
        }
        actions.extend(TopicKind::CONVERSATION_KINDS.into_iter().map(|kind| {
            ClientAction::Subscribe { key: TopicKey::conversation(kind, self.conversation_id) }
        }));
        actions
    }

    /// The history fetch failed. Stale generations are discarded.
    pub fn history_failed(&mut self, request_id: u64, reason: String) -> Vec<ClientAction> {
        if self.state != SessionState::Joining(JoinPhase::FetchingHistory)
            || request_id != self.request_id
        {
            return vec![];
        }

        self.state = SessionState::Idle;
        vec![ClientAction::JoinFailed {
            conversation_id: self.conversation_id,
            error: ClientError::HistoryFetch { conversation_id: self.conversation_id, reason },
        }]
    }

    /// The broker answered one of the join's subscribe requests.
    ///
    /// The final confirmation announces presence and completes the join;
    /// any refusal rolls back every confirmation so far.
    pub fn subscribe_result(
        &mut self,
        kind: TopicKind,
        result: Result<(), String>,
        now_ms: TimestampMs,
    ) -> Vec<ClientAction> {
        if self.state != SessionState::Joining(JoinPhase::Subscribing) {
            return vec![];
        }

        match result {
            Ok(()) => {
                if !self.pending_kinds.remove(&kind) {
                    return vec![];
                }
                self.confirmed_kinds.push(kind);
                if !self.pending_kinds.is_empty() {
                    return vec![];
                }

                self.state = SessionState::Joined;
                vec![
                    ClientAction::Publish {
                        body: PublishBody::Presence(PresenceUpdate {
                            conversation_id: self.conversation_id,
                            user_id: self.local_user,
                            action: PresenceAction::Join,
                            at: now_ms,
                        }),
                    },
                    ClientAction::Joined { conversation_id: self.conversation_id },
                ]
            },
            Err(reason) => {
                let key = TopicKey::conversation(kind, self.conversation_id);
                let mut actions: Vec<ClientAction> = self
                    .confirmed_kinds
                    .drain(..)
                    .map(|confirmed| ClientAction::Unsubscribe {
                        key: TopicKey::conversation(confirmed, self.conversation_id),
                    })
                    .collect();
                self.pending_kinds.clear();
                self.state = SessionState::Idle;

                actions.push(ClientAction::JoinFailed {
                    conversation_id: self.conversation_id,
                    error: ClientError::Subscription { topic: key.path(), reason },
                });
                actions
            },
        }
    }

    /// Leave the conversation. Best-effort from any state.
    ///
    /// From `Joined` this announces departure before dropping the topic
    /// subscriptions; from a pending join it cancels the pipeline. The
    /// session always ends `Idle`.
    pub fn leave(&mut self, now_ms: TimestampMs) -> Vec<ClientAction> {
        let mut actions = Vec::new();

        match self.state {
            SessionState::Idle => return vec![],
            SessionState::Joined => {
                actions.push(ClientAction::Publish {
                    body: PublishBody::Presence(PresenceUpdate {
                        conversation_id: self.conversation_id,
                        user_id: self.local_user,
                        action: PresenceAction::Leave,
                        at: now_ms,
                    }),
                });
            },
            SessionState::Joining(_) => {},
        }

        for kind in self.confirmed_kinds.drain(..) {
            actions.push(ClientAction::Unsubscribe {
                key: TopicKey::conversation(kind, self.conversation_id),
            });
        }

        // Invalidate any in-flight history response.
        self.request_id = self.request_id.wrapping_add(1);
        self.pending_kinds.clear();
        self.state = SessionState::Idle;
        self.roster.clear();
        self.typing.clear();

        actions.push(ClientAction::Left { conversation_id: self.conversation_id });
        actions
    }

    /// The transport dropped. A pending join fails fast; a joined session
    /// stays joined and relies on subscription replay after reconnect.
    pub fn connection_lost(&mut self) -> Vec<ClientAction> {
        self.typing.clear();
        self.roster.clear();

        if let SessionState::Joining(_) = self.state {
            self.state = SessionState::Idle;
            self.request_id = self.request_id.wrapping_add(1);
            self.pending_kinds.clear();
            self.confirmed_kinds.clear();
            return vec![ClientAction::JoinFailed {
                conversation_id: self.conversation_id,
                error: ClientError::Connection(ConnectionError::Transport {
                    reason: "transport lost during join".to_string(),
                }),
            }];
        }
        vec![]
    }

    /// A message arrived on the messages topic (live echo or redelivery).
    pub fn on_message(
        &mut self,
        message: ChatMessage,
        focused: bool,
        now_ms: TimestampMs,
    ) -> Vec<ClientAction> {
        if !self.merge_message(message.clone()) {
            return vec![];
        }

        let mut actions = vec![ClientAction::MessageReceived {
            conversation_id: self.conversation_id,
            message: message.clone(),
        }];

        if message.sender_id != self.local_user {
            if focused {
                actions.extend(self.mark_read(now_ms));
            } else {
                actions.push(ClientAction::Notify {
                    conversation_id: self.conversation_id,
                    sender_id: message.sender_id,
                    preview: message.content.chars().take(NOTIFY_PREVIEW_CHARS).collect(),
                });
            }
        }

        actions
    }

    /// A typing signal arrived. Our own echo is ignored.
    pub fn on_typing(&mut self, signal: &TypingSignal, now: I) -> Vec<ClientAction>
    where
        I: std::ops::Add<std::time::Duration, Output = I>,
    {
        if signal.user_id == self.local_user {
            return vec![];
        }
        if !self.typing.signal(signal.user_id, signal.is_typing, now) {
            return vec![];
        }
        vec![ClientAction::TypingChanged {
            conversation_id: self.conversation_id,
            user_id: signal.user_id,
            is_typing: signal.is_typing,
        }]
    }

    /// A read receipt arrived.
    ///
    /// Read state is monotonic: an already-read message is never reverted
    /// or restamped. Receipts for unknown message ids are buffered and
    /// applied when the message merges.
    pub fn on_receipt(&mut self, receipt: &ReadReceipt) -> Vec<ClientAction> {
        let mut applied = Vec::new();

        for message_id in &receipt.message_ids {
            if self.known_ids.contains(message_id) {
                if self.apply_read(*message_id, receipt.reader_id, receipt.read_at) {
                    applied.push(*message_id);
                }
            } else {
                self.pending_receipts
                    .entry(*message_id)
                    .or_insert((receipt.reader_id, receipt.read_at));
            }
        }

        if applied.is_empty() {
            return vec![];
        }
        vec![ClientAction::ReadReceiptsApplied {
            conversation_id: self.conversation_id,
            reader_id: receipt.reader_id,
            message_ids: applied,
            read_at: receipt.read_at,
        }]
    }

    /// A presence update arrived.
    pub fn on_presence(&mut self, update: &PresenceUpdate) -> Vec<ClientAction> {
        if !self.roster.apply(update) {
            return vec![];
        }
        if update.action == PresenceAction::Leave {
            // A departed participant is no longer typing.
            self.typing.clear_user(update.user_id);
        }
        vec![ClientAction::PresenceChanged {
            conversation_id: self.conversation_id,
            user_id: update.user_id,
            is_online: update.action == PresenceAction::Join,
        }]
    }

    /// Mark every unread incoming message as read: persist, then
    /// broadcast the receipt for other participants.
    pub fn mark_read(&mut self, now_ms: TimestampMs) -> Vec<ClientAction> {
        let unread: Vec<MessageId> = self
            .messages
            .iter()
            .filter(|m| m.sender_id != self.local_user && m.read_at.is_none())
            .map(|m| m.id)
            .collect();
        if unread.is_empty() {
            return vec![];
        }

        for message_id in &unread {
            self.apply_read(*message_id, self.local_user, now_ms);
        }

        vec![
            ClientAction::PersistRead {
                conversation_id: self.conversation_id,
                reader_id: self.local_user,
                message_ids: unread.clone(),
                read_at: now_ms,
            },
            ClientAction::Publish {
                body: PublishBody::ReadReceipt(ReadReceipt {
                    conversation_id: self.conversation_id,
                    reader_id: self.local_user,
                    message_ids: unread,
                    read_at: now_ms,
                }),
            },
        ]
    }

    /// Expire stale typing indicators at `now`.
    pub fn tick(&mut self, now: I) -> Vec<ClientAction> {
        self.typing
            .expire(now)
            .into_iter()
            .map(|user_id| ClientAction::TypingChanged {
                conversation_id: self.conversation_id,
                user_id,
                is_typing: false,
            })
            .collect()
    }

    /// Insert a message into the timeline. Returns `false` for a
    /// duplicate server id.
    fn merge_message(&mut self, mut message: ChatMessage) -> bool {
        if !self.known_ids.insert(message.id) {
            return false;
        }

        if let Some((reader_id, read_at)) = self.pending_receipts.remove(&message.id)
            && message.read_at.is_none()
        {
            message.read_at = Some(read_at);
            message.read_by = Some(reader_id);
        }

        let index = self
            .messages
            .partition_point(|m| (m.created_at, m.id) <= (message.created_at, message.id));
        self.messages.insert(index, message);
        true
    }

    /// Set a message's read state if unread. Returns whether it changed.
    fn apply_read(&mut self, message_id: MessageId, reader_id: UserId, read_at: TimestampMs) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == message_id) else {
            return false;
        };
        if message.read_at.is_some() {
            return false;
        }
        message.read_at = Some(read_at);
        message.read_by = Some(reader_id);
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::{Duration, Instant};

    use roost_proto::payloads::MessageKind;

    use super::*;

    const CONVERSATION: ConversationId = 7;
    const LOCAL: UserId = 1;
    const PEER: UserId = 2;

    fn message(id: MessageId, sender_id: UserId, created_at: TimestampMs) -> ChatMessage {
        ChatMessage {
            id,
            conversation_id: CONVERSATION,
            sender_id,
            content: format!("msg {id}"),
            kind: MessageKind::Text,
            created_at,
            read_at: None,
            read_by: None,
        }
    }

    fn joined_session() -> ConversationSession<Instant> {
        let mut session = ConversationSession::new(CONVERSATION, LOCAL);
        session.begin_join(1);
        session.history_loaded(1, vec![]);
        for kind in TopicKind::CONVERSATION_KINDS {
            session.subscribe_result(kind, Ok(()), 0);
        }
        assert!(session.is_joined());
        session
    }

    #[test]
    fn join_pipeline_reaches_joined_after_all_confirmations() {
        let mut session: ConversationSession<Instant> = ConversationSession::new(CONVERSATION, LOCAL);

        let actions = session.begin_join(1);
        assert_eq!(actions, vec![ClientAction::FetchHistory {
            conversation_id: CONVERSATION,
            request_id: 1,
        }]);

        let actions = session.history_loaded(1, vec![message(10, PEER, 100)]);
        assert!(matches!(
            actions.first(),
            Some(ClientAction::HistoryMerged { messages, .. }) if messages.len() == 1
        ));
        let subscribes =
            actions.iter().filter(|a| matches!(a, ClientAction::Subscribe { .. })).count();
        assert_eq!(subscribes, TopicKind::CONVERSATION_KINDS.len());
        assert_eq!(session.state(), SessionState::Joining(JoinPhase::Subscribing));

        let mut completion = Vec::new();
        for kind in TopicKind::CONVERSATION_KINDS {
            assert!(completion.is_empty(), "joined before all confirmations");
            completion = session.subscribe_result(kind, Ok(()), 500);
        }

        assert!(session.is_joined());
        assert!(matches!(
            completion.first(),
            Some(ClientAction::Publish { body: PublishBody::Presence(update) })
                if update.action == PresenceAction::Join && update.user_id == LOCAL
        ));
        assert_eq!(completion.get(1), Some(&ClientAction::Joined { conversation_id: CONVERSATION }));
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn subscription_refusal_rolls_back_confirmed_topics() {
        let mut session: ConversationSession<Instant> = ConversationSession::new(CONVERSATION, LOCAL);
        session.begin_join(1);
        session.history_loaded(1, vec![]);

        session.subscribe_result(TopicKind::Messages, Ok(()), 0);
        session.subscribe_result(TopicKind::Typing, Ok(()), 0);
        let actions = session.subscribe_result(TopicKind::ReadReceipts, Err("denied".to_string()), 0);

        assert_eq!(session.state(), SessionState::Idle);
        let unsubscribed: Vec<&TopicKey> = actions
            .iter()
            .filter_map(|a| match a {
                ClientAction::Unsubscribe { key } => Some(key),
                _ => None,
            })
            .collect();
        assert_eq!(unsubscribed, vec![
            &TopicKey::conversation(TopicKind::Messages, CONVERSATION),
            &TopicKey::conversation(TopicKind::Typing, CONVERSATION),
        ]);
        assert!(matches!(
            actions.last(),
            Some(ClientAction::JoinFailed { error: ClientError::Subscription { .. }, .. })
        ));
    }

    #[test]
    fn history_failure_aborts_join() {
        let mut session: ConversationSession<Instant> = ConversationSession::new(CONVERSATION, LOCAL);
        session.begin_join(1);

        let actions = session.history_failed(1, "backend down".to_string());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(matches!(
            actions.first(),
            Some(ClientAction::JoinFailed { error: ClientError::HistoryFetch { .. }, .. })
        ));
    }

    #[test]
    fn stale_history_response_is_discarded() {
        let mut session: ConversationSession<Instant> = ConversationSession::new(CONVERSATION, LOCAL);
        session.begin_join(1);
        session.leave(0);
        session.begin_join(2);

        // The response to the cancelled request lands late.
        assert!(session.history_loaded(1, vec![message(10, PEER, 100)]).is_empty());
        assert_eq!(session.state(), SessionState::Joining(JoinPhase::FetchingHistory));
        assert!(session.messages().is_empty());
    }

    #[test]
    fn duplicate_echo_is_idempotent() {
        let mut session = joined_session();

        let first = session.on_message(message(10, LOCAL, 100), true, 100);
        assert_eq!(first.len(), 1);
        let second = session.on_message(message(10, LOCAL, 100), true, 100);
        assert!(second.is_empty());
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn timeline_orders_by_created_at_then_id() {
        let mut session = joined_session();
        session.on_message(message(12, PEER, 300), true, 300);
        session.on_message(message(10, PEER, 100), true, 300);
        session.on_message(message(11, PEER, 100), true, 300);

        let ids: Vec<MessageId> = session.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![10, 11, 12]);
    }

    #[test]
    fn focused_incoming_message_is_marked_read() {
        let mut session = joined_session();
        let actions = session.on_message(message(10, PEER, 100), true, 150);

        assert!(actions.iter().any(|a| matches!(a, ClientAction::PersistRead { .. })));
        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::Publish { body: PublishBody::ReadReceipt(r) } if r.reader_id == LOCAL
        )));
        assert_eq!(session.unread_count(), 0);
    }

    #[test]
    fn unfocused_incoming_message_notifies_instead() {
        let mut session = joined_session();
        let actions = session.on_message(message(10, PEER, 100), false, 150);

        assert!(actions.iter().any(|a| matches!(a, ClientAction::Notify { sender_id: PEER, .. })));
        assert!(!actions.iter().any(|a| matches!(a, ClientAction::PersistRead { .. })));
        assert_eq!(session.unread_count(), 1);
    }

    #[test]
    fn own_echo_never_notifies_or_marks() {
        let mut session = joined_session();
        let actions = session.on_message(message(10, LOCAL, 100), false, 150);
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], ClientAction::MessageReceived { .. }));
    }

    #[test]
    fn read_state_is_monotonic() {
        let mut session = joined_session();
        session.on_message(message(10, LOCAL, 100), true, 100);

        let receipt = ReadReceipt {
            conversation_id: CONVERSATION,
            reader_id: PEER,
            message_ids: vec![10],
            read_at: 200,
        };
        assert_eq!(session.on_receipt(&receipt).len(), 1);

        // A later receipt must not restamp.
        let again = ReadReceipt {
            conversation_id: CONVERSATION,
            reader_id: PEER,
            message_ids: vec![10],
            read_at: 900,
        };
        assert!(session.on_receipt(&again).is_empty());
        assert_eq!(session.messages()[0].read_at, Some(200));
    }

    #[test]
    fn receipt_before_message_is_buffered() {
        let mut session = joined_session();

        let receipt = ReadReceipt {
            conversation_id: CONVERSATION,
            reader_id: PEER,
            message_ids: vec![10],
            read_at: 200,
        };
        assert!(session.on_receipt(&receipt).is_empty());

        session.on_message(message(10, LOCAL, 100), true, 300);
        assert_eq!(session.messages()[0].read_at, Some(200));
        assert_eq!(session.messages()[0].read_by, Some(PEER));
    }

    #[test]
    fn typing_expires_on_tick() {
        let t0 = Instant::now();
        let mut session = joined_session();

        let signal = TypingSignal {
            conversation_id: CONVERSATION,
            user_id: PEER,
            is_typing: true,
            sent_at: 0,
        };
        assert_eq!(session.on_typing(&signal, t0).len(), 1);
        assert!(session.is_typing(PEER));

        assert!(session.tick(t0 + Duration::from_secs(2)).is_empty());
        let expired = session.tick(t0 + Duration::from_secs(3));
        assert_eq!(expired, vec![ClientAction::TypingChanged {
            conversation_id: CONVERSATION,
            user_id: PEER,
            is_typing: false,
        }]);
    }

    #[test]
    fn own_typing_echo_is_ignored() {
        let t0 = Instant::now();
        let mut session = joined_session();
        let signal = TypingSignal {
            conversation_id: CONVERSATION,
            user_id: LOCAL,
            is_typing: true,
            sent_at: 0,
        };
        assert!(session.on_typing(&signal, t0).is_empty());
    }

    #[test]
    fn presence_leave_clears_typing() {
        let t0 = Instant::now();
        let mut session = joined_session();

        session.on_presence(&PresenceUpdate {
            conversation_id: CONVERSATION,
            user_id: PEER,
            action: PresenceAction::Join,
            at: 0,
        });
        session.on_typing(
            &TypingSignal { conversation_id: CONVERSATION, user_id: PEER, is_typing: true, sent_at: 0 },
            t0,
        );

        let actions = session.on_presence(&PresenceUpdate {
            conversation_id: CONVERSATION,
            user_id: PEER,
            action: PresenceAction::Leave,
            at: 0,
        });
        assert_eq!(actions.len(), 1);
        assert!(!session.is_typing(PEER));
        assert!(!session.is_user_online(PEER));
    }

    #[test]
    fn leave_announces_then_unsubscribes() {
        let mut session = joined_session();
        let actions = session.leave(500);

        assert!(matches!(
            actions.first(),
            Some(ClientAction::Publish { body: PublishBody::Presence(update) })
                if update.action == PresenceAction::Leave
        ));
        let unsubscribes =
            actions.iter().filter(|a| matches!(a, ClientAction::Unsubscribe { .. })).count();
        assert_eq!(unsubscribes, TopicKind::CONVERSATION_KINDS.len());
        assert_eq!(actions.last(), Some(&ClientAction::Left { conversation_id: CONVERSATION }));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn connection_loss_fails_pending_join() {
        let mut session: ConversationSession<Instant> = ConversationSession::new(CONVERSATION, LOCAL);
        session.begin_join(1);
        session.history_loaded(1, vec![]);

        let actions = session.connection_lost();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(matches!(actions.first(), Some(ClientAction::JoinFailed { .. })));

        // A joined session survives a drop.
        let mut session = joined_session();
        assert!(session.connection_lost().is_empty());
        assert!(session.is_joined());
    }

    #[test]
    fn mark_read_skips_own_and_already_read() {
        let mut session = joined_session();
        session.on_message(message(10, LOCAL, 100), false, 100);
        session.on_message(message(11, PEER, 200), false, 200);
        session.on_message(message(12, PEER, 300), false, 300);

        let actions = session.mark_read(400);
        assert!(matches!(
            actions.first(),
            Some(ClientAction::PersistRead { message_ids, .. }) if message_ids == &vec![11, 12]
        ));

        // Nothing left to mark.
        assert!(session.mark_read(500).is_empty());
    }
}
