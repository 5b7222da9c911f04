//! Fuzz target for the ConversationSession state machine
//!
//! # Strategy
//!
//! Drive the session with an arbitrary interleaving of lifecycle events,
//! message deliveries, receipts, typing signals, and presence updates.
//!
//! # Invariants
//!
//! - Timeline ids are unique (redelivery is idempotent)
//! - Timeline is ordered by (created_at, id)
//! - Read state is monotonic: a read timestamp never changes once set
//! - No operation panics, whatever the session state

#![no_main]

use std::collections::HashMap;
use std::time::{Duration, Instant};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use roost_client::ConversationSession;
use roost_proto::payloads::{
    ChatMessage, MessageKind, PresenceAction, PresenceUpdate, ReadReceipt, TypingSignal,
};
use roost_proto::TopicKind;

const CONVERSATION: u64 = 1;
const LOCAL: u64 = 1;

#[derive(Debug, Clone, Arbitrary)]
enum SessionOp {
    BeginJoin,
    HistoryLoaded { count: u8 },
    HistoryFailed,
    SubscribeOk { kind_index: u8 },
    SubscribeErr { kind_index: u8 },
    Message { id: u8, sender: u8, created_at: u8, focused: bool },
    Receipt { id: u8, reader: u8, read_at: u8 },
    Typing { user: u8, is_typing: bool },
    Presence { user: u8, join: bool },
    MarkRead { at: u8 },
    Leave,
    ConnectionLost,
    Tick { advance_secs: u8 },
}

fn kind(index: u8) -> TopicKind {
    TopicKind::CONVERSATION_KINDS[usize::from(index) % TopicKind::CONVERSATION_KINDS.len()]
}

fn message(id: u8, sender: u8, created_at: u8) -> ChatMessage {
    ChatMessage {
        id: u64::from(id),
        conversation_id: CONVERSATION,
        sender_id: u64::from(sender),
        content: format!("m{id}"),
        kind: MessageKind::Text,
        created_at: u64::from(created_at),
        read_at: None,
        read_by: None,
    }
}

fuzz_target!(|ops: Vec<SessionOp>| {
    let mut session: ConversationSession<Instant> =
        ConversationSession::new(CONVERSATION, LOCAL);
    let mut now = Instant::now();
    let mut request_id = 0u64;
    let mut read_stamps: HashMap<u64, u64> = HashMap::new();

    for op in ops {
        match op {
            SessionOp::BeginJoin => {
                request_id += 1;
                let _ = session.begin_join(request_id);
            }
            SessionOp::HistoryLoaded { count } => {
                let page = (0..count.min(16)).map(|i| message(i, i % 3, i)).collect();
                let _ = session.history_loaded(request_id, page);
            }
            SessionOp::HistoryFailed => {
                let _ = session.history_failed(request_id, "fuzz".to_string());
            }
            SessionOp::SubscribeOk { kind_index } => {
                let _ = session.subscribe_result(kind(kind_index), Ok(()), 0);
            }
            SessionOp::SubscribeErr { kind_index } => {
                let _ = session.subscribe_result(kind(kind_index), Err("fuzz".to_string()), 0);
            }
            SessionOp::Message { id, sender, created_at, focused } => {
                let _ = session.on_message(
                    message(id, sender, created_at),
                    focused,
                    u64::from(created_at),
                );
            }
            SessionOp::Receipt { id, reader, read_at } => {
                let _ = session.on_receipt(&ReadReceipt {
                    conversation_id: CONVERSATION,
                    reader_id: u64::from(reader),
                    message_ids: vec![u64::from(id)],
                    read_at: u64::from(read_at),
                });
            }
            SessionOp::Typing { user, is_typing } => {
                let _ = session.on_typing(
                    &TypingSignal {
                        conversation_id: CONVERSATION,
                        user_id: u64::from(user),
                        is_typing,
                        sent_at: 0,
                    },
                    now,
                );
            }
            SessionOp::Presence { user, join } => {
                let _ = session.on_presence(&PresenceUpdate {
                    conversation_id: CONVERSATION,
                    user_id: u64::from(user),
                    action: if join { PresenceAction::Join } else { PresenceAction::Leave },
                    at: 0,
                });
            }
            SessionOp::MarkRead { at } => {
                let _ = session.mark_read(u64::from(at));
            }
            SessionOp::Leave => {
                let _ = session.leave(0);
            }
            SessionOp::ConnectionLost => {
                let _ = session.connection_lost();
            }
            SessionOp::Tick { advance_secs } => {
                now += Duration::from_secs(u64::from(advance_secs) % 10);
                let _ = session.tick(now);
            }
        }

        // Timeline invariants hold after every operation.
        let timeline = session.messages();
        for pair in timeline.windows(2) {
            assert!(
                (pair[0].created_at, pair[0].id) < (pair[1].created_at, pair[1].id),
                "timeline out of order or duplicated"
            );
        }
        for entry in timeline {
            match read_stamps.get(&entry.id) {
                Some(stamp) => assert_eq!(
                    entry.read_at,
                    Some(*stamp),
                    "read state regressed or restamped"
                ),
                None => {
                    if let Some(stamp) = entry.read_at {
                        read_stamps.insert(entry.id, stamp);
                    }
                }
            }
        }
    }
});
