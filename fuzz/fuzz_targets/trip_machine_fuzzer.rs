//! Fuzz target for the trip lifecycle state machine
//!
//! # Strategy
//!
//! - Arbitrary event sequences, mostly invalid for the current state
//!
//! # Invariants
//!
//! - Accepted events move the state exactly one step forward
//! - Rejected events report the unchanged state
//! - `TripEvent::between` agrees with `transition`
//! - Completed is terminal

#![no_main]

use arbitrary::Arbitrary;
use curbside_core::{TripEvent, TripState, transition};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Event {
    Accept,
    EnterPickup,
    StartTrip,
    EnterDestination,
    DropOff,
}

impl From<Event> for TripEvent {
    fn from(event: Event) -> Self {
        match event {
            Event::Accept => TripEvent::Accept,
            Event::EnterPickup => TripEvent::EnterPickup,
            Event::StartTrip => TripEvent::StartTrip,
            Event::EnterDestination => TripEvent::EnterDestination,
            Event::DropOff => TripEvent::DropOff,
        }
    }
}

fuzz_target!(|events: Vec<Event>| {
    let mut state = TripState::Requested;

    for event in events {
        let event = TripEvent::from(event);
        match transition(state, event) {
            Ok(next) => {
                assert_eq!(u8::from(next), u8::from(state) + 1, "{state:?} -> {next:?}");
                assert_eq!(TripEvent::between(state, next), Some(event));
                state = next;
            },
            Err(err) => {
                assert_eq!(err.state, state);
                assert_eq!(err.event, event);
            },
        }
    }

    if state == TripState::Completed {
        for event in TripEvent::ALL {
            assert!(transition(state, event).is_err());
        }
    }
});
