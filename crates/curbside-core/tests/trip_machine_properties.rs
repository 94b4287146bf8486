//! Property-based tests for the trip state machine and geofences.
//!
//! Tests verify invariants under arbitrary event sequences and positions.

use curbside_core::{
    AccountType, Coordinate, GeofenceMonitor, GeofenceTransition, Region, RegionKind, RidePanel,
    Trip, TripEvent, TripState, transition,
};
use proptest::prelude::*;

fn event_strategy() -> impl Strategy<Value = TripEvent> {
    prop::sample::select(TripEvent::ALL.to_vec())
}

fn state_strategy() -> impl Strategy<Value = TripState> {
    prop::sample::select(TripState::ALL.to_vec())
}

proptest! {
    /// Property: applying any event sequence never moves a trip backwards and
    /// rejected events leave the state unchanged.
    #[test]
    fn prop_state_never_regresses(events in prop::collection::vec(event_strategy(), 0..40)) {
        let mut state = TripState::Requested;

        for event in events {
            match transition(state, event) {
                Ok(next) => {
                    prop_assert!(next > state);
                    prop_assert_eq!(u8::from(next), u8::from(state) + 1);
                    state = next;
                },
                Err(err) => {
                    prop_assert_eq!(err.state, state);
                    prop_assert_eq!(err.event, event);
                },
            }
        }
    }

    /// Property: each non-terminal state accepts exactly one event.
    #[test]
    fn prop_one_event_per_state(state in state_strategy()) {
        let accepted = TripEvent::ALL.iter().filter(|e| transition(state, **e).is_ok()).count();
        let expected = usize::from(state.is_active());
        prop_assert_eq!(accepted, expected);
    }

    /// Property: every reachable state has a panel for both roles except
    /// completed.
    #[test]
    fn prop_panel_exists_while_active(state in state_strategy()) {
        for viewer in [AccountType::Passenger, AccountType::Driver] {
            prop_assert_eq!(RidePanel::for_trip(viewer, state).is_some(), state.is_active());
        }
    }

    /// Property: state integers survive the document round trip.
    #[test]
    fn prop_trip_document_round_trip(
        state in state_strategy(),
        lat in -89.0f64..89.0,
        lng in -179.0f64..179.0,
        claimed in any::<bool>(),
    ) {
        let mut trip = Trip::request("p", Coordinate::new(lat, lng), Coordinate::new(-lat, -lng));
        trip.state = state;
        if claimed {
            trip.driver_uid = Some("d".into());
        }

        let doc = trip.to_document().expect("encode");
        prop_assert_eq!(Trip::from_document("p", &doc).expect("decode"), trip);
    }

    /// Property: the monitor reports an entry exactly when a fix crosses
    /// from outside to inside.
    #[test]
    fn prop_geofence_entries_match_crossings(
        offsets in prop::collection::vec(-0.001f64..0.001, 1..30),
    ) {
        let center = Coordinate::new(37.0, -122.0);
        let region = Region::new(RegionKind::Pickup, center);
        let mut monitor = GeofenceMonitor::new();
        monitor.arm(region);

        let mut inside = false;
        for offset in offsets {
            let fix = Coordinate::new(37.0 + offset, -122.0);
            let now_inside = region.contains(&fix);
            let transitions = monitor.observe(fix);

            let expected = match (inside, now_inside) {
                (false, true) => vec![GeofenceTransition::Entered(RegionKind::Pickup)],
                (true, false) => vec![GeofenceTransition::Exited(RegionKind::Pickup)],
                _ => vec![],
            };
            prop_assert_eq!(transitions, expected);
            inside = now_inside;
        }
    }
}

#[test]
fn pickup_circle_scenario() {
    let pickup = Coordinate::new(37.0, -122.0);
    let mut monitor = GeofenceMonitor::new();
    monitor.arm(Region::new(RegionKind::Pickup, pickup));

    let entered = monitor.observe(Coordinate::new(37.0001, -122.0));
    assert_eq!(entered, vec![GeofenceTransition::Entered(RegionKind::Pickup)]);

    // Accepted trips advance, requested trips do not
    assert_eq!(transition(TripState::Accepted, TripEvent::EnterPickup), Ok(TripState::DriverArrived));
    assert!(transition(TripState::Requested, TripEvent::EnterPickup).is_err());
    assert_eq!(u8::from(TripState::DriverArrived), 2);
}
