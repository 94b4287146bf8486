//! Fuzz target for stored document decoding
//!
//! Feeds arbitrary CBOR into the trip and user decoders. Any backend client
//! can write any document, so decoding must fail cleanly.
//!
//! # Invariants
//!
//! - Decoding NEVER panics
//! - A decoded trip has in-range coordinates and survives re-encoding
//! - A decoded user survives re-encoding

#![no_main]

use curbside_core::{Document, Trip, User};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(doc) = ciborium::from_reader::<Document, _>(data) else {
        return;
    };

    if let Ok(trip) = Trip::from_document("p", &doc) {
        assert!(trip.pickup.is_valid() && trip.destination.is_valid(), "{trip:?}");
        let encoded = trip.to_document().expect("decoded trip must encode");
        let again = Trip::from_document("p", &encoded).expect("encoded trip must decode");
        assert_eq!(trip, again);
    }

    if let Ok(user) = User::from_document("u", &doc) {
        let again = User::from_document("u", &user.to_document()).expect("user must decode");
        assert_eq!(user, again);
    }
});
