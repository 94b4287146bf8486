//! Integration tests for sessions and bridges over a shared database.
//!
//! # Oracle Pattern
//!
//! Tests end with oracle checks that verify:
//! - Each session's phase and panel reflect the stored trip
//! - The stored trip record matches what both sides believe
//! - Subscriptions are dropped when a session stops observing

use curbside_app::{
    Bridge, DriverPhase, Observation, PassengerPhase, Session, SessionAction, SessionConfig,
    SessionEvent, TRIP_CANCELLED, TRIP_COMPLETED,
};
use curbside_backend::{Gateway, MemoryDatabase};
use curbside_core::{AccountType, Coordinate, TripState, User};

const PICKUP: Coordinate = Coordinate::new(37.0, -122.0);
const DESTINATION: Coordinate = Coordinate::new(37.1, -122.1);
const DRIVER_START: Coordinate = Coordinate::new(37.01, -122.01);

/// One signed-in user: a session plus the bridge that serves it.
struct Party {
    session: Session,
    bridge: Bridge<MemoryDatabase>,
}

impl Party {
    fn new(gateway: &Gateway<MemoryDatabase>, user: User) -> Self {
        gateway.save_user(&user).expect("save user");
        let bridge = Bridge::new(gateway.clone(), user.uid.clone());
        let mut session = Session::for_user(user, SessionConfig::default()).expect("session");
        let actions = session.start();
        let mut party = Self { session, bridge };
        party.process_actions(actions);
        party
    }

    /// Feed one input event and settle.
    fn send(&mut self, event: SessionEvent) {
        let actions = self.session.handle(event);
        self.process_actions(actions);
        self.pump();
    }

    /// Deliver pending subscription items until nothing is left.
    fn pump(&mut self) {
        loop {
            let events = self.bridge.poll_subscriptions();
            if events.is_empty() {
                break;
            }
            for event in events {
                let actions = self.session.handle(event);
                self.process_actions(actions);
            }
        }
    }

    /// Process actions from the session through the bridge.
    fn process_actions(&mut self, actions: Vec<SessionAction>) {
        let mut pending = actions;
        while !pending.is_empty() {
            for action in std::mem::take(&mut pending) {
                for event in self.bridge.process_action(action) {
                    pending.extend(self.session.handle(event));
                }
            }
        }
    }

    fn title(&self) -> Option<String> {
        self.session.panel().map(|p| p.title.clone())
    }

    fn passenger_phase(&self) -> &PassengerPhase {
        match &self.session {
            Session::Passenger(s) => s.phase(),
            Session::Driver(_) => panic!("not a passenger"),
        }
    }

    fn driver_phase(&self) -> &DriverPhase {
        match &self.session {
            Session::Driver(s) => s.phase(),
            Session::Passenger(_) => panic!("not a driver"),
        }
    }
}

struct World {
    gateway: Gateway<MemoryDatabase>,
    passenger: Party,
    driver: Party,
}

impl World {
    fn new() -> Self {
        let gateway = Gateway::new(MemoryDatabase::new());

        let mut dana = User::new("d1", "Dana Reyes", "dana@example.com", AccountType::Driver);
        dana.location = Some(DRIVER_START);
        let driver = Party::new(&gateway, dana);

        let pat = User::new("p1", "Pat Moreno", "pat@example.com", AccountType::Passenger);
        let passenger = Party::new(&gateway, pat);

        Self { gateway, passenger, driver }
    }

    fn settle(&mut self) {
        for _ in 0..4 {
            self.passenger.pump();
            self.driver.pump();
        }
    }

    fn stored_state(&self) -> Option<TripState> {
        self.gateway.fetch_trip("p1").expect("fetch trip").map(|t| t.state)
    }

    /// Passenger requests a ride from PICKUP to DESTINATION.
    fn request(&mut self) {
        self.passenger.send(SessionEvent::LocationUpdated(PICKUP));
        self.passenger.send(SessionEvent::DestinationSelected { destination: DESTINATION });
        self.passenger.send(SessionEvent::ConfirmRide);
        self.settle();
    }

    /// Driver accepts the pending offer.
    fn accept(&mut self) {
        self.driver.send(SessionEvent::AcceptTrip);
        self.settle();
    }

    fn drive_to(&mut self, location: Coordinate) {
        self.driver.send(SessionEvent::LocationUpdated(location));
        self.settle();
    }
}

#[test]
fn passenger_sees_nearby_driver() {
    let world = {
        let mut w = World::new();
        w.passenger.send(SessionEvent::LocationUpdated(PICKUP));
        w
    };

    let Session::Passenger(session) = &world.passenger.session else {
        panic!("passenger session expected");
    };
    let pin = session.annotations().get("d1").expect("driver pin");
    assert_eq!(pin.coordinate, DRIVER_START);
}

#[test]
fn request_reaches_driver_as_offer() {
    let mut world = World::new();
    world.request();

    assert_eq!(world.stored_state(), Some(TripState::Requested));
    assert_eq!(world.passenger.title().as_deref(), Some("Finding your driver"));
    assert!(matches!(world.driver.driver_phase(), DriverPhase::Offered(t) if t.passenger_uid == "p1"));
    assert_eq!(world.driver.title().as_deref(), Some("Would you like to pickup this passenger"));
    assert_eq!(
        world.driver.session.panel().and_then(|p| p.counterpart.as_deref()),
        Some("Pat Moreno")
    );
}

#[test]
fn acceptance_shows_driver_en_route() {
    let mut world = World::new();
    world.request();
    world.accept();

    let trip = world.gateway.fetch_trip("p1").expect("fetch").expect("trip");
    assert_eq!(trip.state, TripState::Accepted);
    assert_eq!(trip.driver_uid.as_deref(), Some("d1"));

    assert_eq!(world.passenger.title().as_deref(), Some("Driver En Route"));
    assert_eq!(
        world.passenger.session.panel().and_then(|p| p.counterpart.as_deref()),
        Some("Dana Reyes")
    );
    assert_eq!(world.driver.title().as_deref(), Some("En Route to Passenger"));
    assert!(world.driver.bridge.is_observing(Observation::Cancellation));
}

#[test]
fn pickup_geofence_only_fires_after_acceptance() {
    let mut world = World::new();
    world.request();

    // Offered but not claimed: entering the pickup circle changes nothing
    world.driver.send(SessionEvent::RegionEntered(curbside_core::RegionKind::Pickup));
    world.settle();
    assert_eq!(world.stored_state(), Some(TripState::Requested));

    world.accept();
    world.drive_to(PICKUP);

    assert_eq!(world.stored_state(), Some(TripState::DriverArrived));
    assert_eq!(world.passenger.title().as_deref(), Some("Driver has arrived"));
    assert_eq!(world.driver.title().as_deref(), Some("Arrived at Passenger Location"));
}

#[test]
fn full_trip_is_deleted_on_completion() {
    let mut world = World::new();
    world.request();
    world.accept();
    world.drive_to(PICKUP);

    world.driver.send(SessionEvent::StartTrip);
    world.settle();
    assert_eq!(world.stored_state(), Some(TripState::InProgress));
    assert_eq!(world.passenger.title().as_deref(), Some("En Route to Destination"));

    world.drive_to(DESTINATION);
    assert_eq!(world.stored_state(), Some(TripState::ArrivedAtDestination));
    assert_eq!(world.passenger.title().as_deref(), Some("Arrived at destination"));

    world.driver.send(SessionEvent::DropOff);
    world.settle();

    assert_eq!(world.stored_state(), None);
    assert_eq!(world.passenger.passenger_phase(), &PassengerPhase::Idle);
    assert_eq!(world.passenger.session.status(), Some(TRIP_COMPLETED));
    assert_eq!(world.driver.driver_phase(), &DriverPhase::Idle);
    assert_eq!(world.driver.session.status(), Some(TRIP_COMPLETED));
    assert!(!world.driver.bridge.is_observing(Observation::Cancellation));
}

#[test]
fn passenger_cancellation_reaches_driver() {
    let mut world = World::new();
    world.request();
    world.accept();

    world.passenger.send(SessionEvent::CancelTrip);
    world.settle();

    assert_eq!(world.stored_state(), None);
    assert_eq!(world.passenger.session.status(), Some(TRIP_CANCELLED));
    assert_eq!(world.driver.driver_phase(), &DriverPhase::Idle);
    assert_eq!(world.driver.session.status(), Some(TRIP_CANCELLED));
    assert!(world.driver.session.panel().is_none());
}

#[test]
fn cancelled_request_is_withdrawn_from_driver() {
    let mut world = World::new();
    world.request();
    assert!(matches!(world.driver.driver_phase(), DriverPhase::Offered(_)));

    world.passenger.send(SessionEvent::CancelTrip);
    world.settle();

    assert_eq!(world.driver.driver_phase(), &DriverPhase::Idle);
}

#[test]
fn second_driver_loses_the_claim() {
    let mut world = World::new();
    let mut rival_user = User::new("d2", "Rae Kim", "rae@example.com", AccountType::Driver);
    rival_user.location = Some(DRIVER_START);
    let mut rival = Party::new(&world.gateway, rival_user);

    world.request();
    rival.pump();
    assert!(matches!(rival.driver_phase(), DriverPhase::Offered(_)));

    world.accept();
    rival.send(SessionEvent::AcceptTrip);

    let trip = world.gateway.fetch_trip("p1").expect("fetch").expect("trip");
    assert_eq!(trip.driver_uid.as_deref(), Some("d1"));
    assert_eq!(rival.driver_phase(), &DriverPhase::Idle);
}

#[test]
fn request_made_mid_trip_is_offered_after_drop_off() {
    let mut world = World::new();
    world.request();
    world.accept();

    let sam = User::new("p2", "Sam Ortiz", "sam@example.com", AccountType::Passenger);
    let mut second = Party::new(&world.gateway, sam);
    second.send(SessionEvent::LocationUpdated(PICKUP));
    second.send(SessionEvent::DestinationSelected { destination: DESTINATION });
    second.send(SessionEvent::ConfirmRide);
    world.settle();
    assert_eq!(world.driver.session.trip().map(|t| t.passenger_uid.as_str()), Some("p1"));

    world.drive_to(PICKUP);
    world.driver.send(SessionEvent::StartTrip);
    world.settle();
    world.drive_to(DESTINATION);
    world.driver.send(SessionEvent::DropOff);
    world.settle();

    let DriverPhase::Offered(offer) = world.driver.driver_phase() else {
        panic!("expected an offer, got {:?}", world.driver.driver_phase());
    };
    assert_eq!(offer.passenger_uid, "p2");
    assert_eq!(world.driver.title().as_deref(), Some("Would you like to pickup this passenger"));

    world.accept();
    second.pump();
    let trip = world.gateway.fetch_trip("p2").expect("fetch").expect("trip");
    assert_eq!(trip.driver_uid.as_deref(), Some("d1"));
    assert_eq!(second.title().as_deref(), Some("Driver En Route"));
}
