//! Driver session state machine.
//!
//! Pure: consumes [`SessionEvent`]s and produces [`SessionAction`]s. The
//! driver publishes its location on every fix, is offered unclaimed trips,
//! claims one atomically and then drives it through the lifecycle. Geofence
//! entries and button taps are mapped to [`TripEvent`]s and validated by the
//! trip state machine before any write is emitted.
//!
//! Every open request the driver hears about is kept until it is withdrawn,
//! declined or lost, so a driver who comes back to idle is offered the next
//! one without waiting for the backend to repeat it.

use std::collections::BTreeMap;

use curbside_backend::IncomingTrip;
use curbside_core::{
    AccountType, Coordinate, GeofenceMonitor, GeofenceTransition, Region, RegionKind, RidePanel,
    Trip, TripEvent, TripState, User, transition,
};

use crate::{
    Observation, SessionAction, SessionConfig, SessionEvent,
    passenger::{TRIP_CANCELLED, TRIP_COMPLETED},
    state::DriverPhase,
};

/// Driver-side session.
#[derive(Debug, Clone)]
pub struct DriverSession {
    user: User,
    config: SessionConfig,
    location: Option<Coordinate>,
    phase: DriverPhase,
    geofences: GeofenceMonitor,
    panel: Option<RidePanel>,
    passenger: Option<User>,
    status: Option<String>,
    /// Open requests by passenger uid
    open_offers: BTreeMap<String, Trip>,
}

impl DriverSession {
    /// Create a session for a signed-in driver.
    pub fn new(user: User, config: SessionConfig) -> Self {
        Self {
            user,
            config,
            location: None,
            phase: DriverPhase::Idle,
            geofences: GeofenceMonitor::new(),
            panel: None,
            passenger: None,
            status: None,
            open_offers: BTreeMap::new(),
        }
    }

    /// Actions to run once the identity is established.
    pub fn start(&mut self) -> Vec<SessionAction> {
        let mut actions = vec![SessionAction::ObserveIncomingTrips];
        if let Some(location) = self.location.or(self.user.location) {
            actions.push(SessionAction::PushLocation(location));
        }
        actions.push(SessionAction::Render);
        actions
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        match event {
            SessionEvent::LocationUpdated(location) => self.on_location(location),
            SessionEvent::RegionEntered(kind) => self.region_entered(kind),
            SessionEvent::Incoming(IncomingTrip::Requested(trip)) => self.offered(trip),
            SessionEvent::Incoming(IncomingTrip::Withdrawn(passenger_uid)) => {
                self.withdrawn(&passenger_uid)
            },
            SessionEvent::DeclineTrip => self.decline(),
            SessionEvent::AcceptTrip => self.accept(),
            SessionEvent::TripClaimed(trip) => self.claimed(trip),
            SessionEvent::StartTrip => self.advance(TripEvent::StartTrip),
            SessionEvent::DropOff => self.advance(TripEvent::DropOff),
            SessionEvent::TripAdvanced(trip) => self.advanced(trip),
            SessionEvent::TripCancelled => self.cancelled(),
            SessionEvent::UserFetched(user) => self.user_fetched(user),
            SessionEvent::Error { message } => self.operation_failed(message),
            SessionEvent::Tick => vec![],
            SessionEvent::DestinationSelected { .. }
            | SessionEvent::DismissDestination
            | SessionEvent::ConfirmRide
            | SessionEvent::CancelTrip
            | SessionEvent::TripChanged(_)
            | SessionEvent::TripRemoved
            | SessionEvent::Driver(_)
            | SessionEvent::TripCreated(_) => {
                tracing::debug!(?event, "ignoring passenger event in driver session");
                vec![]
            },
        }
    }

    fn on_location(&mut self, location: Coordinate) -> Vec<SessionAction> {
        self.location = Some(location);

        let mut actions = vec![SessionAction::PushLocation(location)];
        for crossing in self.geofences.observe(location) {
            if let GeofenceTransition::Entered(kind) = crossing {
                actions.extend(self.region_entered(kind));
            }
        }
        actions
    }

    fn region_entered(&mut self, kind: RegionKind) -> Vec<SessionAction> {
        let event = match kind {
            RegionKind::Pickup => TripEvent::EnterPickup,
            RegionKind::Destination => TripEvent::EnterDestination,
        };
        self.advance(event)
    }

    fn offered(&mut self, trip: Trip) -> Vec<SessionAction> {
        if !trip.is_unclaimed() || trip.state != TripState::Requested {
            return vec![];
        }

        if let DriverPhase::Offered(current) = &mut self.phase
            && current.passenger_uid == trip.passenger_uid
        {
            *current = trip.clone();
        }
        self.open_offers.insert(trip.passenger_uid.clone(), trip);

        if self.phase != DriverPhase::Idle {
            tracing::debug!(open = self.open_offers.len(), "busy, keeping offer");
            return vec![];
        }
        self.present_next()
    }

    /// Offer the first open request. Only while idle.
    fn present_next(&mut self) -> Vec<SessionAction> {
        if self.phase != DriverPhase::Idle {
            return vec![];
        }
        let Some(trip) = self.open_offers.values().next().cloned() else {
            return vec![];
        };

        let passenger_uid = trip.passenger_uid.clone();
        self.panel = RidePanel::for_trip(AccountType::Driver, TripState::Requested);
        self.passenger = None;
        self.phase = DriverPhase::Offered(trip);
        vec![SessionAction::FetchUser { uid: passenger_uid }, SessionAction::Render]
    }

    /// Drop the current offer and move on to the next open one.
    fn next_offer(&mut self) -> Vec<SessionAction> {
        self.phase = DriverPhase::Idle;
        self.panel = None;
        self.passenger = None;

        let actions = self.present_next();
        if actions.is_empty() { vec![SessionAction::Render] } else { actions }
    }

    fn withdrawn(&mut self, passenger_uid: &str) -> Vec<SessionAction> {
        self.open_offers.remove(passenger_uid);

        let offered = matches!(
            &self.phase,
            DriverPhase::Offered(trip) if trip.passenger_uid == passenger_uid
        );
        if !offered {
            return vec![];
        }
        self.next_offer()
    }

    fn decline(&mut self) -> Vec<SessionAction> {
        let DriverPhase::Offered(trip) = &self.phase else {
            return vec![];
        };
        let passenger_uid = trip.passenger_uid.clone();
        self.open_offers.remove(&passenger_uid);
        self.next_offer()
    }

    fn accept(&mut self) -> Vec<SessionAction> {
        let DriverPhase::Offered(trip) = &self.phase else {
            return vec![];
        };
        let trip = trip.clone();
        self.phase = DriverPhase::Claiming(trip.clone());
        vec![SessionAction::ClaimTrip(trip), SessionAction::Render]
    }

    fn claimed(&mut self, trip: Trip) -> Vec<SessionAction> {
        let DriverPhase::Claiming(pending) = &self.phase else {
            return vec![];
        };
        if pending.passenger_uid != trip.passenger_uid {
            return vec![];
        }

        tracing::info!(driver = %self.user.uid, passenger = %trip.passenger_uid, "trip claimed");
        self.open_offers.remove(&trip.passenger_uid);
        let pickup = self.region(RegionKind::Pickup, trip.pickup);
        self.geofences.clear();
        self.geofences.arm(pickup);
        self.status = None;

        let mut actions = vec![
            SessionAction::ObserveCancellation { passenger_uid: trip.passenger_uid.clone() },
            SessionAction::ShowRoute { from: self.location, to: trip.pickup },
        ];
        if self.passenger.as_ref().is_none_or(|p| p.uid != trip.passenger_uid) {
            actions.push(SessionAction::FetchUser { uid: trip.passenger_uid.clone() });
        }
        self.panel = self.panel_for(trip.state);
        self.phase = DriverPhase::OnTrip(trip);
        actions.push(SessionAction::Render);
        actions
    }

    /// Emit a conditional write if `event` is accepted in the current state.
    fn advance(&mut self, event: TripEvent) -> Vec<SessionAction> {
        let DriverPhase::OnTrip(trip) = &self.phase else {
            tracing::debug!(?event, "no claimed trip, ignoring");
            return vec![];
        };

        match transition(trip.state, event) {
            Ok(to) => vec![SessionAction::AdvanceTrip {
                passenger_uid: trip.passenger_uid.clone(),
                from: trip.state,
                to,
            }],
            Err(error) => {
                tracing::debug!(%error, "ignoring event");
                vec![]
            },
        }
    }

    fn advanced(&mut self, trip: Trip) -> Vec<SessionAction> {
        let DriverPhase::OnTrip(current) = &self.phase else {
            return vec![];
        };
        if current.passenger_uid != trip.passenger_uid || trip.state <= current.state {
            return vec![];
        }

        tracing::info!(driver = %self.user.uid, state = ?trip.state, "trip advanced");
        let mut actions = Vec::new();
        match trip.state {
            TripState::DriverArrived => self.geofences.disarm(RegionKind::Pickup),
            TripState::InProgress => {
                let destination = self.region(RegionKind::Destination, trip.destination);
                self.geofences.arm(destination);
                actions.push(SessionAction::ShowRoute { from: self.location, to: trip.destination });
            },
            TripState::ArrivedAtDestination => self.geofences.disarm(RegionKind::Destination),
            TripState::Completed => return self.reset(TRIP_COMPLETED),
            TripState::Requested | TripState::Accepted => {},
        }

        self.panel = self.panel_for(trip.state);
        self.phase = DriverPhase::OnTrip(trip);
        actions.push(SessionAction::Render);
        actions
    }

    fn cancelled(&mut self) -> Vec<SessionAction> {
        if !matches!(self.phase, DriverPhase::OnTrip(_) | DriverPhase::Claiming(_)) {
            return vec![];
        }
        tracing::info!(driver = %self.user.uid, "trip cancelled by passenger");
        self.reset(TRIP_CANCELLED)
    }

    fn user_fetched(&mut self, user: User) -> Vec<SessionAction> {
        let Some(trip) = self.trip() else {
            return vec![];
        };
        if trip.passenger_uid != user.uid {
            return vec![];
        }

        let state = trip.state;
        self.passenger = Some(user);
        self.panel = self.panel_for(state);
        vec![SessionAction::Render]
    }

    fn operation_failed(&mut self, message: String) -> Vec<SessionAction> {
        self.status = Some(message);

        let DriverPhase::Claiming(trip) = &self.phase else {
            return vec![SessionAction::Render];
        };
        // A lost claim is not retried
        let passenger_uid = trip.passenger_uid.clone();
        self.open_offers.remove(&passenger_uid);
        self.next_offer()
    }

    fn reset(&mut self, status: &str) -> Vec<SessionAction> {
        self.geofences.clear();
        self.status = Some(status.to_owned());

        let mut actions =
            vec![SessionAction::StopObserving(Observation::Cancellation), SessionAction::ClearOverlays];
        actions.extend(self.next_offer());
        actions
    }

    fn region(&self, kind: RegionKind, center: Coordinate) -> Region {
        Region::new(kind, center).with_radius(self.config.geofence_radius_m)
    }

    fn panel_for(&self, state: TripState) -> Option<RidePanel> {
        let panel = RidePanel::for_trip(AccountType::Driver, state)?;
        Some(match &self.passenger {
            Some(passenger) => panel.with_counterpart(passenger.fullname.clone()),
            None => panel,
        })
    }

    /// Signed-in driver.
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Pickup flow phase.
    pub fn phase(&self) -> &DriverPhase {
        &self.phase
    }

    /// Offered, pending or claimed trip.
    pub fn trip(&self) -> Option<&Trip> {
        match &self.phase {
            DriverPhase::Idle => None,
            DriverPhase::Offered(trip) | DriverPhase::Claiming(trip) | DriverPhase::OnTrip(trip) => {
                Some(trip)
            },
        }
    }

    /// Panel contents. `None` hides the panel.
    pub fn panel(&self) -> Option<&RidePanel> {
        self.panel.as_ref()
    }

    /// Armed geofences.
    pub fn geofences(&self) -> &GeofenceMonitor {
        &self.geofences
    }

    /// Passenger record, once fetched.
    pub fn passenger(&self) -> Option<&User> {
        self.passenger.as_ref()
    }

    /// Open requests waiting for this driver, by passenger uid.
    pub fn open_offers(&self) -> impl Iterator<Item = &Trip> {
        self.open_offers.values()
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
        let mut observations = vec![Observation::IncomingTrips];
        if matches!(self.phase, DriverPhase::OnTrip(_)) {
            observations.push(Observation::Cancellation);
        }
        observations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PICKUP: Coordinate = Coordinate::new(37.0, -122.0);
    const DESTINATION: Coordinate = Coordinate::new(37.1, -122.1);
    const FAR: Coordinate = Coordinate::new(37.05, -122.05);

    fn session() -> DriverSession {
        let user = User::new("d1", "Dana", "dana@example.com", AccountType::Driver);
        let mut session = DriverSession::new(user, SessionConfig::default());
        session.start();
        session
    }

    fn offer() -> Trip {
        Trip::request("p1", PICKUP, DESTINATION)
    }

    fn claimed(state: TripState) -> Trip {
        let mut trip = offer();
        trip.driver_uid = Some("d1".into());
        trip.state = state;
        trip
    }

    fn on_trip() -> DriverSession {
        let mut s = session();
        s.handle(SessionEvent::LocationUpdated(FAR));
        s.handle(SessionEvent::Incoming(IncomingTrip::Requested(offer())));
        s.handle(SessionEvent::AcceptTrip);
        s.handle(SessionEvent::TripClaimed(claimed(TripState::Accepted)));
        s
    }

    #[test]
    fn every_fix_is_pushed() {
        let mut s = session();
        let actions = s.handle(SessionEvent::LocationUpdated(FAR));
        assert_eq!(actions, vec![SessionAction::PushLocation(FAR)]);
    }

    #[test]
    fn offer_then_accept_claims() {
        let mut s = session();
        s.handle(SessionEvent::Incoming(IncomingTrip::Requested(offer())));
        assert_eq!(
            s.panel().map(|p| p.title.as_str()),
            Some("Would you like to pickup this passenger")
        );

        let actions = s.handle(SessionEvent::AcceptTrip);
        assert_eq!(actions[0], SessionAction::ClaimTrip(offer()));
    }

    #[test]
    fn claim_arms_pickup_and_observes_cancellation() {
        let s = on_trip();
        assert!(s.geofences().region(RegionKind::Pickup).is_some());
        assert!(s.observations().contains(&Observation::Cancellation));
        assert_eq!(s.panel().map(|p| p.title.as_str()), Some("En Route to Passenger"));
    }

    #[test]
    fn pickup_geofence_advances_accepted_trip() {
        let mut s = on_trip();
        let actions = s.handle(SessionEvent::LocationUpdated(PICKUP));
        assert!(actions.contains(&SessionAction::AdvanceTrip {
            passenger_uid: "p1".into(),
            from: TripState::Accepted,
            to: TripState::DriverArrived,
        }));
    }

    #[test]
    fn region_entry_without_claim_is_ignored() {
        let mut s = session();
        s.handle(SessionEvent::Incoming(IncomingTrip::Requested(offer())));
        assert!(s.handle(SessionEvent::RegionEntered(RegionKind::Pickup)).is_empty());
    }

    #[test]
    fn start_trip_requires_arrival() {
        let mut s = on_trip();
        assert!(s.handle(SessionEvent::StartTrip).is_empty());

        s.handle(SessionEvent::TripAdvanced(claimed(TripState::DriverArrived)));
        assert_eq!(s.handle(SessionEvent::StartTrip), vec![SessionAction::AdvanceTrip {
            passenger_uid: "p1".into(),
            from: TripState::DriverArrived,
            to: TripState::InProgress,
        }]);
    }

    #[test]
    fn in_progress_arms_destination() {
        let mut s = on_trip();
        s.handle(SessionEvent::TripAdvanced(claimed(TripState::DriverArrived)));
        let actions = s.handle(SessionEvent::TripAdvanced(claimed(TripState::InProgress)));

        assert!(actions.contains(&SessionAction::ShowRoute { from: Some(FAR), to: DESTINATION }));
        assert!(s.geofences().region(RegionKind::Destination).is_some());
        assert!(s.geofences().region(RegionKind::Pickup).is_none());
    }

    #[test]
    fn completion_resets() {
        let mut s = on_trip();
        for state in [
            TripState::DriverArrived,
            TripState::InProgress,
            TripState::ArrivedAtDestination,
            TripState::Completed,
        ] {
            s.handle(SessionEvent::TripAdvanced(claimed(state)));
        }

        assert_eq!(s.phase(), &DriverPhase::Idle);
        assert!(s.geofences().is_empty());
        assert_eq!(s.status(), Some(TRIP_COMPLETED));
    }

    #[test]
    fn cancellation_resets_and_clears() {
        let mut s = on_trip();
        let actions = s.handle(SessionEvent::TripCancelled);

        assert!(actions.contains(&SessionAction::StopObserving(Observation::Cancellation)));
        assert!(actions.contains(&SessionAction::ClearOverlays));
        assert_eq!(s.status(), Some(TRIP_CANCELLED));
    }

    #[test]
    fn lost_claim_returns_to_idle() {
        let mut s = session();
        s.handle(SessionEvent::Incoming(IncomingTrip::Requested(offer())));
        s.handle(SessionEvent::AcceptTrip);
        s.handle(SessionEvent::Error { message: "already claimed".into() });

        assert_eq!(s.phase(), &DriverPhase::Idle);
        assert!(s.panel().is_none());
    }

    #[test]
    fn withdrawn_offer_disappears() {
        let mut s = session();
        s.handle(SessionEvent::Incoming(IncomingTrip::Requested(offer())));
        s.handle(SessionEvent::Incoming(IncomingTrip::Withdrawn("other".into())));
        assert!(matches!(s.phase(), DriverPhase::Offered(_)));

        s.handle(SessionEvent::Incoming(IncomingTrip::Withdrawn("p1".into())));
        assert_eq!(s.phase(), &DriverPhase::Idle);
    }

    #[test]
    fn busy_driver_keeps_offers_for_later() {
        let mut s = on_trip();
        let other = Trip::request("p2", PICKUP, DESTINATION);
        assert!(s.handle(SessionEvent::Incoming(IncomingTrip::Requested(other.clone()))).is_empty());
        assert_eq!(s.trip().map(|t| t.passenger_uid.as_str()), Some("p1"));

        let actions = s.handle(SessionEvent::TripCancelled);

        assert_eq!(s.phase(), &DriverPhase::Offered(other));
        assert!(actions.contains(&SessionAction::FetchUser { uid: "p2".into() }));
        assert_eq!(s.status(), Some(TRIP_CANCELLED));
        assert_eq!(s.open_offers().count(), 1);
    }

    #[test]
    fn completed_trip_moves_on_to_waiting_request() {
        let mut s = on_trip();
        s.handle(SessionEvent::Incoming(IncomingTrip::Requested(Trip::request(
            "p2",
            PICKUP,
            DESTINATION,
        ))));
        for state in [
            TripState::DriverArrived,
            TripState::InProgress,
            TripState::ArrivedAtDestination,
            TripState::Completed,
        ] {
            s.handle(SessionEvent::TripAdvanced(claimed(state)));
        }

        assert_eq!(s.trip().map(|t| t.passenger_uid.as_str()), Some("p2"));
        assert!(s.geofences().is_empty());
        assert_eq!(
            s.panel().map(|p| p.title.as_str()),
            Some("Would you like to pickup this passenger")
        );
    }

    #[test]
    fn withdrawn_offer_is_replaced_by_next() {
        let mut s = session();
        s.handle(SessionEvent::Incoming(IncomingTrip::Requested(offer())));
        s.handle(SessionEvent::Incoming(IncomingTrip::Requested(Trip::request(
            "p2",
            PICKUP,
            DESTINATION,
        ))));
        assert_eq!(s.trip().map(|t| t.passenger_uid.as_str()), Some("p1"));

        s.handle(SessionEvent::Incoming(IncomingTrip::Withdrawn("p1".into())));
        assert_eq!(s.trip().map(|t| t.passenger_uid.as_str()), Some("p2"));

        s.handle(SessionEvent::Incoming(IncomingTrip::Withdrawn("p2".into())));
        assert_eq!(s.phase(), &DriverPhase::Idle);
        assert_eq!(s.open_offers().count(), 0);
    }

    #[test]
    fn declined_offer_is_not_offered_again() {
        let mut s = session();
        s.handle(SessionEvent::Incoming(IncomingTrip::Requested(offer())));
        s.handle(SessionEvent::Incoming(IncomingTrip::Requested(Trip::request(
            "p2",
            PICKUP,
            DESTINATION,
        ))));

        s.handle(SessionEvent::DeclineTrip);
        assert_eq!(s.trip().map(|t| t.passenger_uid.as_str()), Some("p2"));

        s.handle(SessionEvent::DeclineTrip);
        assert_eq!(s.phase(), &DriverPhase::Idle);
        assert!(s.panel().is_none());
    }

    #[test]
    fn lost_claim_moves_on_to_next_offer() {
        let mut s = session();
        s.handle(SessionEvent::Incoming(IncomingTrip::Requested(offer())));
        s.handle(SessionEvent::Incoming(IncomingTrip::Requested(Trip::request(
            "p2",
            PICKUP,
            DESTINATION,
        ))));
        s.handle(SessionEvent::AcceptTrip);
        s.handle(SessionEvent::Error { message: "already claimed".into() });

        assert_eq!(s.trip().map(|t| t.passenger_uid.as_str()), Some("p2"));
        assert_eq!(s.status(), Some("already claimed"));
    }
}
