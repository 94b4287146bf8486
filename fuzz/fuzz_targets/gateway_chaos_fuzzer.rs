//! Fuzz target for trip writes under database failures
//!
//! Drives the gateway's create, claim, advance and delete operations from
//! arbitrary passengers and drivers while the database randomly fails. After
//! every operation the stored records are read back through the unwrapped
//! database.
//!
//! # Strategy
//!
//! - Variable failure rates (0% to 90%)
//! - Up to 4 passengers and 4 drivers contending for the same records
//! - Stale writes from states the trip has already left
//!
//! # Invariants
//!
//! - Gateway NEVER panics on database errors
//! - A failed operation leaves the stored trip unchanged
//! - A driver is recorded exactly when the trip is accepted or later
//! - Only one claim succeeds per created trip
//! - A trip's state only moves forward until it is recreated

#![no_main]

use arbitrary::Arbitrary;
use curbside_backend::{ChaoticDatabase, Gateway, MemoryDatabase};
use curbside_core::{Coordinate, Trip, TripEvent, TripState, transition};
use libfuzzer_sys::fuzz_target;

const PASSENGERS: [&str; 4] = ["p0", "p1", "p2", "p3"];
const DRIVERS: [&str; 4] = ["d0", "d1", "d2", "d3"];

#[derive(Debug, Clone, Arbitrary)]
struct ChaosScenario {
    /// Seed for ChaoticDatabase RNG (deterministic failures)
    chaos_seed: u64,
    /// Failure rate 0-9 maps to 0%-90%
    failure_rate_tenth: u8,
    /// Sequence of operations to perform
    operations: Vec<GatewayOp>,
}

#[derive(Debug, Clone, Arbitrary)]
enum GatewayOp {
    /// Passenger requests a ride
    Request { passenger: u8 },
    /// Driver claims whatever the passenger's record currently holds
    Accept { passenger: u8, driver: u8 },
    /// Advance the stored trip by one step
    Advance { passenger: u8 },
    /// Advance from an arbitrary believed state
    StaleAdvance { passenger: u8, from: u8 },
    /// Passenger cancels, or the trip is cleaned up
    Delete { passenger: u8 },
    /// Read the trip back through the chaotic database
    Fetch { passenger: u8 },
}

/// What we know about one passenger's record between operations
#[derive(Debug, Clone, Default)]
struct Tracked {
    stored: Option<Trip>,
    claims: usize,
}

fn pick<'a>(names: &[&'a str], index: u8) -> &'a str {
    names[usize::from(index) % names.len()]
}

fn next_state(state: TripState) -> Option<TripState> {
    TripEvent::ALL.into_iter().find_map(|event| transition(state, event).ok())
}

fuzz_target!(|scenario: ChaosScenario| {
    let failure_rate = f64::from(scenario.failure_rate_tenth % 10) / 10.0;
    let store = MemoryDatabase::new();
    let truth = Gateway::new(store.clone());
    let gateway =
        Gateway::new(ChaoticDatabase::with_seed(store, failure_rate, scenario.chaos_seed));

    let pickup = Coordinate::new(37.0, -122.0);
    let destination = Coordinate::new(37.1, -122.1);
    let mut tracked: Vec<Tracked> = vec![Tracked::default(); PASSENGERS.len()];

    for op in scenario.operations.iter().take(200) {
        let (passenger, outcome) = match *op {
            GatewayOp::Request { passenger } => {
                let uid = pick(&PASSENGERS, passenger);
                (uid, gateway.create_trip(uid, pickup, destination).map(Some))
            },
            GatewayOp::Accept { passenger, driver } => {
                let uid = pick(&PASSENGERS, passenger);
                let Some(trip) = truth.fetch_trip(uid).expect("truth read") else {
                    continue;
                };
                (uid, gateway.accept_trip(&trip, pick(&DRIVERS, driver)).map(Some))
            },
            GatewayOp::Advance { passenger } => {
                let uid = pick(&PASSENGERS, passenger);
                let Some(trip) = truth.fetch_trip(uid).expect("truth read") else {
                    continue;
                };
                let Some(to) = next_state(trip.state) else {
                    continue;
                };
                (uid, gateway.update_trip_state(uid, trip.state, to).map(Some))
            },
            GatewayOp::StaleAdvance { passenger, from } => {
                let uid = pick(&PASSENGERS, passenger);
                let from = TripState::ALL[usize::from(from) % TripState::ALL.len()];
                let Some(to) = next_state(from) else {
                    continue;
                };
                (uid, gateway.update_trip_state(uid, from, to).map(Some))
            },
            GatewayOp::Delete { passenger } => {
                let uid = pick(&PASSENGERS, passenger);
                (uid, gateway.delete_trip(uid).map(|()| None))
            },
            GatewayOp::Fetch { passenger } => {
                let uid = pick(&PASSENGERS, passenger);
                if let Ok(fetched) = gateway.fetch_trip(uid) {
                    let stored = truth.fetch_trip(uid).expect("truth read");
                    assert_eq!(fetched, stored, "{uid}: fetch disagrees with store");
                }
                continue;
            },
        };

        let index = PASSENGERS.iter().position(|p| *p == passenger).expect("known passenger");
        let before = tracked[index].clone();
        let after = truth.fetch_trip(passenger).expect("truth read");

        match (&outcome, op) {
            (Err(_), _) => {
                assert_eq!(after, before.stored, "{passenger}: failed {op:?} changed the record");
            },
            (Ok(_), GatewayOp::Request { .. }) => {
                assert_eq!(after.as_ref().map(|t| t.state), Some(TripState::Requested));
                tracked[index] = Tracked { stored: after.clone(), claims: 0 };
            },
            (Ok(_), GatewayOp::Accept { .. }) => {
                tracked[index].claims += 1;
                assert_eq!(tracked[index].claims, 1, "{passenger}: trip claimed twice");
            },
            (Ok(_), _) => {},
        }

        if let (Some(old), Some(new)) = (&before.stored, &after)
            && !matches!(op, GatewayOp::Request { .. })
        {
            assert!(new.state >= old.state, "{passenger}: {:?} -> {:?}", old.state, new.state);
        }

        if let Some(trip) = &after {
            assert_eq!(
                trip.driver_uid.is_some(),
                trip.state >= TripState::Accepted,
                "{passenger}: state {:?} with driver {:?}",
                trip.state,
                trip.driver_uid
            );
        }

        tracked[index].stored = after;
    }
});
