//! Generic runtime for application orchestration.
//!
//! The Runtime drives the event loop, coordinating between:
//! - [`ChatClient`]: the chat state machine
//! - [`ChatApp`]: the observable view state
//! - [`Driver`]: platform-specific I/O
//!
//! All actions returned for one event are executed before the next event
//! is dispatched, so subscription replay and status ordering guarantees
//! made by the client hold at the I/O boundary too.

use std::time::Duration;

use roost_client::{ChatClient, ClientAction, ClientEvent};
use roost_core::{ExpiryTimer, env::Environment};
use tokio::sync::mpsc;
use tracing::warn;

use crate::{
    app::{AppHandle, ChatApp},
    driver::Driver,
};

/// Loop pacing; fine enough for heartbeat and typing deadlines.
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Generic runtime that orchestrates `ChatClient`, `ChatApp`, and a
/// `Driver`.
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    env: E,
    client: ChatClient<E>,
    app: ChatApp,
    commands: mpsc::UnboundedReceiver<ClientEvent>,
    reconnect: ExpiryTimer<E::Instant>,
}

impl<D, E> Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    /// Create a runtime and the handle UIs submit intents through.
    pub fn new(driver: D, env: E) -> (Self, AppHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runtime = Self {
            driver,
            env: env.clone(),
            client: ChatClient::new(env),
            app: ChatApp::new(),
            commands: rx,
            reconnect: ExpiryTimer::new(),
        };
        (runtime, AppHandle::new(tx))
    }

    /// The observable view state.
    #[must_use]
    pub fn app(&self) -> &ChatApp {
        &self.app
    }

    /// Run the event loop until every [`AppHandle`] is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(mut self) -> Result<(), D::Error> {
        self.driver.render(&self.app)?;

        loop {
            let alive = self.step().await?;
            if !alive {
                break;
            }
            self.env.sleep(TICK_INTERVAL).await;
        }

        self.driver.stop();
        Ok(())
    }

    /// Advance one loop turn: drain intents, poll the driver, fire the
    /// reconnect deadline, tick.
    ///
    /// Returns `false` once every handle is gone and the loop should end.
    /// Exposed for embedding UIs and tests that drive time themselves.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn step(&mut self) -> Result<bool, D::Error> {
        loop {
            match self.commands.try_recv() {
                Ok(event) => self.dispatch(event).await?,
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => return Ok(false),
            }
        }

        while let Some(event) = self.driver.poll_event().await? {
            self.dispatch(event).await?;
        }

        if self.reconnect.fire(self.env.now()) {
            self.dispatch(ClientEvent::ReconnectDue).await?;
        }

        self.dispatch(ClientEvent::Tick).await?;
        self.driver.render(&self.app)?;
        Ok(true)
    }

    async fn dispatch(&mut self, event: ClientEvent) -> Result<(), D::Error> {
        match self.client.handle(event) {
            Ok(actions) => {
                for action in actions {
                    self.app.apply(&action);
                    self.execute(action).await?;
                }
            },
            Err(error) => {
                warn!(%error, "client rejected event");
                self.app.record_error(error);
            },
        }
        Ok(())
    }

    async fn execute(&mut self, action: ClientAction) -> Result<(), D::Error> {
        match action {
            ClientAction::OpenTransport { user_id, auth_token } => {
                self.driver.open_transport(user_id, auth_token).await?;
            },
            ClientAction::CloseTransport => self.driver.close_transport().await,
            ClientAction::SendHeartbeat => self.driver.send_heartbeat().await?,
            ClientAction::ScheduleReconnect { delay } => {
                self.reconnect.arm(self.env.now() + delay);
            },
            ClientAction::Subscribe { key } => self.driver.subscribe(key).await?,
            ClientAction::Unsubscribe { key } => self.driver.unsubscribe(key).await,
            ClientAction::Publish { body } => self.driver.publish(body).await?,
            ClientAction::FetchHistory { conversation_id, request_id } => {
                self.driver.fetch_history(conversation_id, request_id).await?;
            },
            ClientAction::PersistRead { conversation_id, reader_id, message_ids, read_at } => {
                self.driver.persist_read(conversation_id, reader_id, message_ids, read_at).await?;
            },
            ClientAction::Notify { conversation_id, sender_id, preview } => {
                self.driver.notify(conversation_id, sender_id, preview).await;
            },
            // View-only actions were already folded into ChatApp.
            ClientAction::StatusChanged(_)
            | ClientAction::HistoryMerged { .. }
            | ClientAction::MessageReceived { .. }
            | ClientAction::TypingChanged { .. }
            | ClientAction::PresenceChanged { .. }
            | ClientAction::ReadReceiptsApplied { .. }
            | ClientAction::Joined { .. }
            | ClientAction::JoinFailed { .. }
            | ClientAction::Left { .. }
            | ClientAction::Error(_) => {},
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;

    use roost_core::env::test_utils::MockEnv;
    use roost_proto::{
        ConversationId, MessageId, TimestampMs, TopicKey, UserId, event::PublishBody,
    };

    use super::*;

    /// What the scripted driver was asked to do, in order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Open(UserId),
        Close,
        Heartbeat,
        Subscribe(TopicKey),
        Unsubscribe(TopicKey),
        Publish,
        FetchHistory(ConversationId, u64),
        PersistRead(ConversationId, Vec<MessageId>),
        Notify(ConversationId),
    }

    /// Driver that records calls and replays a scripted event queue.
    #[derive(Debug, Default)]
    struct ScriptedDriver {
        calls: Vec<Call>,
        inbound: VecDeque<ClientEvent>,
    }

    /// Uninhabited error type: the scripted driver cannot fail.
    #[derive(Debug)]
    enum NoError {}

    impl std::fmt::Display for NoError {
        fn fmt(&self, _: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match *self {}
        }
    }
    impl std::error::Error for NoError {}

    impl Driver for ScriptedDriver {
        type Error = NoError;

        async fn poll_event(&mut self) -> Result<Option<ClientEvent>, NoError> {
            Ok(self.inbound.pop_front())
        }

        async fn open_transport(&mut self, user_id: UserId, _token: String) -> Result<(), NoError> {
            self.calls.push(Call::Open(user_id));
            Ok(())
        }

        async fn close_transport(&mut self) {
            self.calls.push(Call::Close);
        }

        async fn send_heartbeat(&mut self) -> Result<(), NoError> {
            self.calls.push(Call::Heartbeat);
            Ok(())
        }

        async fn subscribe(&mut self, key: TopicKey) -> Result<(), NoError> {
            self.calls.push(Call::Subscribe(key));
            Ok(())
        }

        async fn unsubscribe(&mut self, key: TopicKey) {
            self.calls.push(Call::Unsubscribe(key));
        }

        async fn publish(&mut self, _body: PublishBody) -> Result<(), NoError> {
            self.calls.push(Call::Publish);
            Ok(())
        }

        async fn fetch_history(
            &mut self,
            conversation_id: ConversationId,
            request_id: u64,
        ) -> Result<(), NoError> {
            self.calls.push(Call::FetchHistory(conversation_id, request_id));
            Ok(())
        }

        async fn persist_read(
            &mut self,
            conversation_id: ConversationId,
            _reader_id: UserId,
            message_ids: Vec<MessageId>,
            _read_at: TimestampMs,
        ) -> Result<(), NoError> {
            self.calls.push(Call::PersistRead(conversation_id, message_ids));
            Ok(())
        }

        async fn notify(&mut self, conversation_id: ConversationId, _sender: UserId, _preview: String) {
            self.calls.push(Call::Notify(conversation_id));
        }

        fn render(&mut self, _app: &ChatApp) -> Result<(), NoError> {
            Ok(())
        }

        fn stop(&mut self) {}
    }

    #[tokio::test]
    async fn connect_intent_opens_transport_and_replays_queue() {
        let (mut runtime, handle) =
            Runtime::new(ScriptedDriver::default(), MockEnv::new());

        handle.connect(1, "token");
        runtime.driver.inbound.push_back(ClientEvent::TransportOpened);
        assert!(runtime.step().await.unwrap());

        assert_eq!(runtime.driver.calls.first(), Some(&Call::Open(1)));
        assert!(
            runtime
                .driver
                .calls
                .contains(&Call::Subscribe(TopicKey::notifications(1)))
        );
        assert!(runtime.app().is_connected());
    }

    #[tokio::test]
    async fn join_intent_fetches_history_first() {
        let (mut runtime, handle) =
            Runtime::new(ScriptedDriver::default(), MockEnv::new());

        handle.connect(1, "token");
        runtime.driver.inbound.push_back(ClientEvent::TransportOpened);
        runtime.step().await.unwrap();

        handle.join_conversation(7);
        runtime.step().await.unwrap();

        assert!(runtime.driver.calls.contains(&Call::FetchHistory(7, 1)));
        assert!(
            !runtime
                .driver
                .calls
                .iter()
                .any(|c| matches!(c, Call::Subscribe(key) if key.conversation_id() == Some(7))),
            "conversation topics wait for the history page"
        );
    }

    #[tokio::test]
    async fn history_page_shows_through_the_timeline_once_joined() {
        let (mut runtime, handle) = Runtime::new(ScriptedDriver::default(), MockEnv::new());

        handle.connect(1, "token");
        runtime.driver.inbound.push_back(ClientEvent::TransportOpened);
        runtime.step().await.unwrap();

        handle.join_conversation(7);
        runtime.step().await.unwrap();
        assert!(runtime.driver.calls.contains(&Call::FetchHistory(7, 1)));

        let page = vec![roost_proto::payloads::ChatMessage {
            id: 10,
            conversation_id: 7,
            sender_id: 2,
            content: "is the apartment still available?".to_string(),
            kind: roost_proto::payloads::MessageKind::Text,
            created_at: 100,
            read_at: None,
            read_by: None,
        }];
        runtime.driver.inbound.push_back(ClientEvent::HistoryLoaded {
            conversation_id: 7,
            request_id: 1,
            messages: page,
        });
        for kind in roost_proto::TopicKind::CONVERSATION_KINDS {
            runtime.driver.inbound.push_back(ClientEvent::SubscribeResult {
                key: TopicKey::conversation(kind, 7),
                result: Ok(()),
            });
        }
        runtime.step().await.unwrap();

        let view = runtime.app().conversation(7).unwrap();
        assert!(view.joined);
        assert_eq!(runtime.app().timeline(7).len(), 1);
        assert_eq!(runtime.app().timeline(7)[0].id, 10);
    }

    #[tokio::test]
    async fn reconnect_deadline_is_driven_by_virtual_time() {
        let env = MockEnv::new();
        let (mut runtime, handle) = Runtime::new(ScriptedDriver::default(), env.clone());

        handle.connect(1, "token");
        runtime.driver.inbound.push_back(ClientEvent::TransportOpened);
        runtime.step().await.unwrap();
        runtime.driver.calls.clear();

        runtime.driver.inbound.push_back(ClientEvent::TransportClosed);
        runtime.step().await.unwrap();
        assert!(runtime.driver.calls.is_empty(), "no reconnect before the delay");

        env.advance(Duration::from_secs(5));
        runtime.step().await.unwrap();
        assert_eq!(runtime.driver.calls.first(), Some(&Call::Open(1)));
    }

    #[tokio::test]
    async fn loop_ends_when_all_handles_dropped() {
        let (mut runtime, handle) =
            Runtime::new(ScriptedDriver::default(), MockEnv::new());
        drop(handle);
        assert!(!runtime.step().await.unwrap());
    }
}
