//! Application view state and the handle UIs talk through.

use std::collections::HashMap;

use roost_client::{ClientAction, ClientError, ClientEvent, ConnectionStatus};
use roost_proto::{ConversationId, UserId, payloads::MessageKind};
use tokio::sync::{mpsc, watch};
use tracing::warn;

use crate::state::ConversationView;

/// Application-facing view of the chat client.
///
/// Owned by the [`Runtime`](crate::Runtime), which keeps it current by
/// applying every client action. Interfaces read it through
/// [`Driver::render`](crate::Driver::render) and query helpers; intents
/// go the other way through an [`AppHandle`].
#[derive(Debug)]
pub struct ChatApp {
    local_user: Option<UserId>,
    conversations: HashMap<ConversationId, ConversationView>,
    status_tx: watch::Sender<ConnectionStatus>,
    last_error: Option<ClientError>,
}

impl ChatApp {
    /// Create a disconnected view.
    #[must_use]
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        Self { local_user: None, conversations: HashMap::new(), status_tx, last_error: None }
    }

    /// Subscribe to connection status transitions.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// The authenticated user, once a connect was issued.
    #[must_use]
    pub fn local_user(&self) -> Option<UserId> {
        self.local_user
    }

    /// Whether the connection is currently usable.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.status_tx.borrow() == ConnectionStatus::Connected
    }

    /// The view for `conversation_id`, if any messages or state exist.
    #[must_use]
    pub fn conversation(&self, conversation_id: ConversationId) -> Option<&ConversationView> {
        self.conversations.get(&conversation_id)
    }

    /// The ordered timeline for `conversation_id`.
    #[must_use]
    pub fn timeline(&self, conversation_id: ConversationId) -> &[roost_proto::payloads::ChatMessage] {
        self.conversations.get(&conversation_id).map_or(&[], |view| view.messages.as_slice())
    }

    /// Whether `user_id` is present in `conversation_id`.
    #[must_use]
    pub fn is_user_online(&self, conversation_id: ConversationId, user_id: UserId) -> bool {
        self.conversations
            .get(&conversation_id)
            .is_some_and(|view| view.online.contains(&user_id))
    }

    /// Number of present participants in `conversation_id`.
    #[must_use]
    pub fn online_users_count(&self, conversation_id: ConversationId) -> usize {
        self.conversations.get(&conversation_id).map_or(0, |view| view.online.len())
    }

    /// Whether `user_id` is typing in `conversation_id`.
    #[must_use]
    pub fn is_user_typing(&self, conversation_id: ConversationId, user_id: UserId) -> bool {
        self.conversations
            .get(&conversation_id)
            .is_some_and(|view| view.typing.contains(&user_id))
    }

    /// Unread incoming messages in `conversation_id`.
    #[must_use]
    pub fn unread_count(&self, conversation_id: ConversationId) -> usize {
        match (self.local_user, self.conversations.get(&conversation_id)) {
            (Some(user), Some(view)) => view.unread_count(user),
            _ => 0,
        }
    }

    /// Unread incoming messages across every conversation in view.
    #[must_use]
    pub fn total_unread_count(&self) -> usize {
        let Some(user) = self.local_user else {
            return 0;
        };
        self.conversations.values().map(|view| view.unread_count(user)).sum()
    }

    /// The most recent error surfaced by the client, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&ClientError> {
        self.last_error.as_ref()
    }

    pub(crate) fn record_error(&mut self, error: ClientError) {
        self.last_error = Some(error);
    }

    /// Fold one client action into the view.
    pub(crate) fn apply(&mut self, action: &ClientAction) {
        match action {
            ClientAction::OpenTransport { user_id, .. } => {
                self.local_user = Some(*user_id);
            },
            ClientAction::StatusChanged(status) => {
                // send_replace stores the value even with no receivers;
                // is_connected() reads it back through borrow().
                let _ = self.status_tx.send_replace(*status);
            },
            ClientAction::HistoryMerged { conversation_id, messages } => {
                self.view_mut(*conversation_id).set_timeline(messages.clone());
            },
            ClientAction::MessageReceived { conversation_id, message } => {
                self.view_mut(*conversation_id).add_message(message.clone());
            },
            ClientAction::ReadReceiptsApplied {
                conversation_id,
                reader_id,
                message_ids,
                read_at,
            } => {
                self.view_mut(*conversation_id).apply_receipts(*reader_id, message_ids, *read_at);
            },
            ClientAction::PersistRead { conversation_id, reader_id, message_ids, read_at } => {
                // Local mark-read: reflect it without waiting for an echo.
                self.view_mut(*conversation_id).apply_receipts(*reader_id, message_ids, *read_at);
            },
            ClientAction::TypingChanged { conversation_id, user_id, is_typing } => {
                let view = self.view_mut(*conversation_id);
                if *is_typing {
                    view.typing.insert(*user_id);
                } else {
                    view.typing.remove(user_id);
                }
            },
            ClientAction::PresenceChanged { conversation_id, user_id, is_online } => {
                let view = self.view_mut(*conversation_id);
                if *is_online {
                    view.online.insert(*user_id);
                } else {
                    view.online.remove(user_id);
                }
            },
            ClientAction::Joined { conversation_id } => {
                self.view_mut(*conversation_id).joined = true;
            },
            ClientAction::JoinFailed { conversation_id, error } => {
                self.view_mut(*conversation_id).joined = false;
                self.last_error = Some(error.clone());
            },
            ClientAction::Left { conversation_id } => {
                self.conversations.remove(conversation_id);
            },
            ClientAction::Error(error) => {
                self.last_error = Some(error.clone());
            },
            _ => {},
        }
    }

    fn view_mut(&mut self, conversation_id: ConversationId) -> &mut ConversationView {
        self.conversations
            .entry(conversation_id)
            .or_insert_with(|| ConversationView::new(conversation_id))
    }
}

impl Default for ChatApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for submitting user intents to a running [`Runtime`](crate::Runtime).
///
/// Cheap to clone; all clones feed the same runtime. Intents submitted
/// after the runtime stopped are dropped with a warning.
#[derive(Debug, Clone)]
pub struct AppHandle {
    commands: mpsc::UnboundedSender<ClientEvent>,
}

impl AppHandle {
    pub(crate) fn new(commands: mpsc::UnboundedSender<ClientEvent>) -> Self {
        Self { commands }
    }

    fn submit(&self, event: ClientEvent) {
        if self.commands.send(event).is_err() {
            warn!("runtime stopped; intent dropped");
        }
    }

    /// Connect and authenticate as `user_id`.
    pub fn connect(&self, user_id: UserId, auth_token: impl Into<String>) {
        self.submit(ClientEvent::Connect { user_id, auth_token: auth_token.into() });
    }

    /// Disconnect explicitly.
    pub fn disconnect(&self) {
        self.submit(ClientEvent::Disconnect);
    }

    /// Join a conversation.
    pub fn join_conversation(&self, conversation_id: ConversationId) {
        self.submit(ClientEvent::JoinConversation { conversation_id });
    }

    /// Leave a conversation.
    pub fn leave_conversation(&self, conversation_id: ConversationId) {
        self.submit(ClientEvent::LeaveConversation { conversation_id });
    }

    /// Send a text message.
    pub fn send_message(&self, conversation_id: ConversationId, content: impl Into<String>) {
        self.submit(ClientEvent::SendMessage {
            conversation_id,
            content: content.into(),
            kind: MessageKind::Text,
        });
    }

    /// Signal the local typing state.
    pub fn send_typing(&self, conversation_id: ConversationId, is_typing: bool) {
        self.submit(ClientEvent::SetTyping { conversation_id, is_typing });
    }

    /// Mark every unread incoming message in a conversation as read.
    pub fn mark_as_read(&self, conversation_id: ConversationId) {
        self.submit(ClientEvent::MarkRead { conversation_id });
    }

    /// Report window focus changes for notification routing.
    pub fn set_focused(&self, focused: bool) {
        self.submit(ClientEvent::FocusChanged { focused });
    }
}
