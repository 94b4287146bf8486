//! Runtime tests with a scripted device.
//!
//! The same Runtime that drives a mobile shell runs here against a
//! ScriptedDevice and an in-memory database.

use curbside_app::{Bridge, Runtime, Session, SessionConfig, SessionEvent};
use curbside_backend::{Gateway, MemoryDatabase};
use curbside_core::{AccountType, Coordinate, TripState, User};
use curbside_harness::{ScriptedDevice, ScriptedDeviceError};

const PICKUP: Coordinate = Coordinate::new(37.0, -122.0);
const DESTINATION: Coordinate = Coordinate::new(37.1, -122.1);

fn setup() -> (Gateway<MemoryDatabase>, User, User) {
    let gateway = Gateway::new(MemoryDatabase::new());

    let passenger = User::new("p1", "Pat", "pat@example.com", AccountType::Passenger);
    let mut driver = User::new("d1", "Dana", "dana@example.com", AccountType::Driver);
    driver.location = Some(Coordinate::new(37.005, -122.005));

    gateway.save_user(&passenger).expect("save passenger");
    gateway.save_user(&driver).expect("save driver");
    (gateway, passenger, driver)
}

fn runtime(
    gateway: &Gateway<MemoryDatabase>,
    user: User,
    script: Vec<SessionEvent>,
) -> Runtime<ScriptedDevice, MemoryDatabase> {
    let bridge = Bridge::new(gateway.clone(), user.uid.clone());
    let session = Session::for_user(user, SessionConfig::default()).expect("session");
    Runtime::new(ScriptedDevice::new(script), session, bridge)
}

#[tokio::test]
async fn passenger_runtime_requests_a_ride() {
    let (gateway, passenger, driver) = setup();
    gateway.push_driver_location(&driver.uid, Coordinate::new(37.005, -122.005)).expect("push");

    let (session, device) = runtime(&gateway, passenger, vec![
        SessionEvent::LocationUpdated(PICKUP),
        SessionEvent::DestinationSelected { destination: DESTINATION },
        SessionEvent::ConfirmRide,
    ])
    .run()
    .await
    .expect("run");

    let trip = gateway.fetch_trip("p1").expect("fetch").expect("trip");
    assert_eq!(trip.state, TripState::Requested);
    assert_eq!(session.trip(), Some(&trip));

    let Session::Passenger(passenger) = &session else {
        panic!("passenger session expected");
    };
    assert!(passenger.annotations().get("d1").is_some());

    assert_eq!(device.routes(), &[(Some(PICKUP), DESTINATION), (Some(PICKUP), DESTINATION)]);
    insta::assert_snapshot!(device.transcript(), @r"
    -
    Confirm your ride [CONFIRM RIDE]
    Finding your driver [CANCEL RIDE]
    ");
}

#[tokio::test]
async fn driver_runtime_claims_the_offer() {
    let (gateway, passenger, driver) = setup();
    gateway.create_trip(&passenger.uid, PICKUP, DESTINATION).expect("create");

    // The first input lets the replayed offer arrive before accepting it
    let (session, device) = runtime(&gateway, driver, vec![
        SessionEvent::Tick,
        SessionEvent::AcceptTrip,
    ])
    .run()
    .await
    .expect("run");

    let trip = gateway.fetch_trip("p1").expect("fetch").expect("trip");
    assert_eq!(trip.state, TripState::Accepted);
    assert_eq!(trip.driver_uid.as_deref(), Some("d1"));
    assert_eq!(session.trip().map(|t| t.state), Some(TripState::Accepted));

    assert_eq!(device.routes(), &[(None, PICKUP)]);
    insta::assert_snapshot!(device.transcript(), @r"
    -
    Would you like to pickup this passenger (Pat) [ACCEPT TRIP]
    En Route to Passenger (Pat) [GET DIRECTIONS]
    ");
}

#[tokio::test]
async fn finished_runtime_releases_subscriptions() {
    let (gateway, passenger, _driver) = setup();

    runtime(&gateway, passenger, vec![SessionEvent::LocationUpdated(PICKUP)])
        .run()
        .await
        .expect("run");

    assert_eq!(gateway.database().watcher_count(), 0);
}

#[tokio::test]
async fn device_errors_stop_the_runtime() {
    let (gateway, passenger, _driver) = setup();
    let bridge = Bridge::new(gateway.clone(), passenger.uid.clone());
    let session = Session::for_user(passenger, SessionConfig::default()).expect("session");
    let device = ScriptedDevice::new([SessionEvent::Tick]).failing_renders();

    let result = Runtime::new(device, session, bridge).run().await;
    assert_eq!(result.err(), Some(ScriptedDeviceError("render failed".into())));
}

#[tokio::test]
async fn start_is_idempotent() {
    let (gateway, passenger, _driver) = setup();
    let mut rt = runtime(&gateway, passenger, vec![]);

    rt.start().expect("start");
    rt.start().expect("start again");

    assert_eq!(rt.device().frames().len(), 1);
    assert!(!rt.step().await.expect("step"));
}
