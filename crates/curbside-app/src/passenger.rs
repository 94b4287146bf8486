//! Passenger session state machine.
//!
//! Pure: consumes [`SessionEvent`]s and produces [`SessionAction`]s. The
//! passenger owns the trip record. It creates it, watches it, deletes it on
//! cancel, and deletes it after drop-off so the next request starts clean.

use curbside_core::{AccountType, Coordinate, RidePanel, Trip, TripState, User};

use crate::{
    Observation, SessionAction, SessionConfig, SessionEvent,
    state::{Annotations, PassengerPhase},
};

/// Status shown after the driver confirms drop-off.
pub const TRIP_COMPLETED: &str = "Trip completed";

/// Status shown when the trip record disappears mid-trip.
pub const TRIP_CANCELLED: &str = "Trip cancelled";

/// Passenger-side session.
#[derive(Debug, Clone)]
pub struct PassengerSession {
    user: User,
    config: SessionConfig,
    location: Option<Coordinate>,
    phase: PassengerPhase,
    annotations: Annotations,
    panel: Option<RidePanel>,
    driver: Option<User>,
    status: Option<String>,
    observing_nearby: bool,
}

impl PassengerSession {
    /// Create a session for a signed-in passenger.
    pub fn new(user: User, config: SessionConfig) -> Self {
        Self {
            user,
            config,
            location: None,
            phase: PassengerPhase::Idle,
            annotations: Annotations::default(),
            panel: None,
            driver: None,
            status: None,
            observing_nearby: false,
        }
    }

    /// Actions to run once the identity is established.
    pub fn start(&mut self) -> Vec<SessionAction> {
        vec![SessionAction::ObserveTrip { passenger_uid: self.user.uid.clone() }, SessionAction::Render]
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        match event {
            SessionEvent::LocationUpdated(location) => self.on_location(location),
            SessionEvent::Driver(update) => {
                if self.annotations.apply(&update) { vec![SessionAction::Render] } else { vec![] }
            },
            SessionEvent::DestinationSelected { destination } => self.select_destination(destination),
            SessionEvent::DismissDestination => self.dismiss_destination(),
            SessionEvent::ConfirmRide => self.confirm_ride(),
            SessionEvent::CancelTrip => self.cancel_trip(),
            SessionEvent::TripCreated(trip) | SessionEvent::TripChanged(trip) => self.apply_trip(trip),
            SessionEvent::TripRemoved => self.trip_removed(),
            SessionEvent::UserFetched(user) => self.user_fetched(user),
            SessionEvent::Error { message } => self.operation_failed(message),
            SessionEvent::Tick => vec![],
            SessionEvent::RegionEntered(_)
            | SessionEvent::AcceptTrip
            | SessionEvent::DeclineTrip
            | SessionEvent::StartTrip
            | SessionEvent::DropOff
            | SessionEvent::Incoming(_)
            | SessionEvent::TripCancelled
            | SessionEvent::TripClaimed(_)
            | SessionEvent::TripAdvanced(_) => {
                tracing::debug!(?event, "ignoring driver event in passenger session");
                vec![]
            },
        }
    }

    fn on_location(&mut self, location: Coordinate) -> Vec<SessionAction> {
        self.location = Some(location);

        let mut actions = Vec::new();
        if !self.observing_nearby {
            self.observing_nearby = true;
            actions.push(SessionAction::ObserveNearbyDrivers {
                center: location,
                radius_m: self.config.nearby_radius_m,
            });
        }
        actions.push(SessionAction::Render);
        actions
    }

    fn select_destination(&mut self, destination: Coordinate) -> Vec<SessionAction> {
        if !matches!(self.phase, PassengerPhase::Idle | PassengerPhase::Selecting { .. }) {
            tracing::debug!("destination selected during a trip, ignoring");
            return vec![];
        }

        self.phase = PassengerPhase::Selecting { destination };
        self.panel = Some(RidePanel::request_ride());
        vec![
            SessionAction::ShowRoute { from: self.location, to: destination },
            SessionAction::Render,
        ]
    }

    fn dismiss_destination(&mut self) -> Vec<SessionAction> {
        if !matches!(self.phase, PassengerPhase::Selecting { .. }) {
            return vec![];
        }
        self.phase = PassengerPhase::Idle;
        self.panel = None;
        vec![SessionAction::ClearOverlays, SessionAction::Render]
    }

    fn confirm_ride(&mut self) -> Vec<SessionAction> {
        let PassengerPhase::Selecting { destination } = self.phase else {
            return vec![];
        };
        let Some(pickup) = self.location else {
            self.status = Some("Waiting for your location".into());
            return vec![SessionAction::Render];
        };

        self.phase = PassengerPhase::Requesting { destination };
        self.status = None;
        vec![SessionAction::CreateTrip { pickup, destination }, SessionAction::Render]
    }

    fn cancel_trip(&mut self) -> Vec<SessionAction> {
        match &self.phase {
            PassengerPhase::OnTrip(trip) if trip.state.is_active() => {
                vec![SessionAction::DeleteTrip { passenger_uid: self.user.uid.clone() }]
            },
            _ => vec![],
        }
    }

    fn apply_trip(&mut self, trip: Trip) -> Vec<SessionAction> {
        if trip.passenger_uid != self.user.uid {
            return vec![];
        }

        if trip.state == TripState::Completed {
            tracing::info!(uid = %self.user.uid, "trip completed");
            let mut actions = vec![SessionAction::DeleteTrip { passenger_uid: trip.passenger_uid }];
            actions.extend(self.reset(TRIP_COMPLETED));
            return actions;
        }

        let previous = self.trip().map(|t| t.state);
        if previous != Some(trip.state) {
            tracing::info!(uid = %self.user.uid, state = ?trip.state, "trip state changed");
        }

        let mut actions = Vec::new();
        let known_driver = self.driver.as_ref().map(|d| d.uid.clone());
        match &trip.driver_uid {
            Some(driver_uid) if known_driver.as_ref() == Some(driver_uid) => {},
            Some(driver_uid) => {
                self.driver = None;
                actions.push(SessionAction::FetchUser { uid: driver_uid.clone() });
            },
            None => self.driver = None,
        }

        self.panel = self.panel_for(trip.state);
        if previous.is_none() {
            actions.push(SessionAction::ShowRoute { from: Some(trip.pickup), to: trip.destination });
        }
        self.phase = PassengerPhase::OnTrip(trip);
        actions.push(SessionAction::Render);
        actions
    }

    fn trip_removed(&mut self) -> Vec<SessionAction> {
        if !matches!(self.phase, PassengerPhase::OnTrip(_) | PassengerPhase::Requesting { .. }) {
            return vec![];
        }
        tracing::info!(uid = %self.user.uid, "trip cancelled");
        self.reset(TRIP_CANCELLED)
    }

    fn user_fetched(&mut self, user: User) -> Vec<SessionAction> {
        let Some(trip) = self.trip() else {
            return vec![];
        };
        if trip.driver_uid.as_deref() != Some(user.uid.as_str()) {
            return vec![];
        }

        let state = trip.state;
        self.driver = Some(user);
        self.panel = self.panel_for(state);
        vec![SessionAction::Render]
    }

    fn operation_failed(&mut self, message: String) -> Vec<SessionAction> {
        if let PassengerPhase::Requesting { destination } = self.phase {
            self.phase = PassengerPhase::Selecting { destination };
        }
        self.status = Some(message);
        vec![SessionAction::Render]
    }

    fn reset(&mut self, status: &str) -> Vec<SessionAction> {
        self.phase = PassengerPhase::Idle;
        self.panel = None;
        self.driver = None;
        self.status = Some(status.to_owned());
        vec![SessionAction::ClearOverlays, SessionAction::Render]
    }

    fn panel_for(&self, state: TripState) -> Option<RidePanel> {
        let panel = RidePanel::for_trip(AccountType::Passenger, state)?;
        Some(match &self.driver {
            Some(driver) => panel.with_counterpart(driver.fullname.clone()),
            None => panel,
        })
    }

    /// Signed-in passenger.
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Request flow phase.
    pub fn phase(&self) -> &PassengerPhase {
        &self.phase
    }

    /// Current trip, if a record exists.
    pub fn trip(&self) -> Option<&Trip> {
        match &self.phase {
            PassengerPhase::OnTrip(trip) => Some(trip),
            _ => None,
        }
    }

    /// Panel contents. `None` hides the panel.
    pub fn panel(&self) -> Option<&RidePanel> {
        self.panel.as_ref()
    }

    /// Nearby-driver pins.
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Assigned driver's record, once fetched.
    pub fn driver(&self) -> Option<&User> {
        self.driver.as_ref()
    }

    /// Transient status line.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Last location fix.
    pub fn location(&self) -> Option<Coordinate> {
        self.location
    }

    /// Observations this session holds.
    pub fn observations(&self) -> Vec<Observation> {
        let mut observations = vec![Observation::OwnTrip];
        if self.observing_nearby {
            observations.push(Observation::NearbyDrivers);
        }
        observations
    }
}
