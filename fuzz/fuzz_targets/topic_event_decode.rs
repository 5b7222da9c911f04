//! Fuzz target for TopicEvent::decode
//!
//! This fuzzer tests topic payload deserialization (CBOR decoding) with:
//! - Malformed CBOR data
//! - Type confusion (payload bytes decoded under the wrong topic kind)
//! - Oversized strings or collections
//!
//! The fuzzer should NEVER panic. All invalid inputs must return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use roost_proto::{TopicEvent, TopicKind};

fuzz_target!(|data: &[u8]| {
    let kinds = [
        TopicKind::Messages,
        TopicKind::Typing,
        TopicKind::ReadReceipts,
        TopicKind::Presence,
        TopicKind::Notifications,
    ];

    for kind in kinds {
        if let Ok(event) = TopicEvent::decode(kind, data) {
            // A successful decode must report the kind it was decoded
            // under and re-encode without panicking.
            assert_eq!(event.kind(), kind);
            let _ = event.encode();
        }
    }
});
