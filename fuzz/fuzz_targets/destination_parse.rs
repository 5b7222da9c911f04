//! Fuzz target for Destination::parse
//!
//! Arbitrary path strings must either be rejected or parse to a
//! destination whose canonical path round-trips.

#![no_main]

use libfuzzer_sys::fuzz_target;
use roost_proto::Destination;

fuzz_target!(|data: &[u8]| {
    let Ok(path) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(destination) = Destination::parse(path) {
        let canonical = destination.path();
        let reparsed = Destination::parse(&canonical).expect("canonical path must reparse");
        assert_eq!(reparsed, destination);
    }
});
