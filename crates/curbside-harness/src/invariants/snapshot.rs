//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the stored trip records and what every session believes
//! at a point in time. Invariants operate on snapshots rather than live state
//! to ensure consistent, atomic checks.

use curbside_app::{DriverPhase, Session};
use curbside_core::{AccountType, Trip, TripState};

/// Snapshot of the entire world.
#[derive(Debug, Clone, Default)]
pub struct WorldSnapshot {
    /// Stored trip records.
    pub trips: Vec<StoredTrip>,
    /// Per-session state.
    pub sessions: Vec<SessionSnapshot>,
}

impl WorldSnapshot {
    /// Create an empty snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a stored trip.
    #[must_use]
    pub fn with_trip(mut self, trip: StoredTrip) -> Self {
        self.trips.push(trip);
        self
    }

    /// Add a session.
    #[must_use]
    pub fn with_session(mut self, session: SessionSnapshot) -> Self {
        self.sessions.push(session);
        self
    }

    /// Stored trip of `passenger_uid`.
    pub fn trip(&self, passenger_uid: &str) -> Option<&StoredTrip> {
        self.trips.iter().find(|t| t.passenger_uid == passenger_uid)
    }
}

/// A trip record as stored, plus every state it has been written with since
/// it was created.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTrip {
    /// Owner and record key.
    pub passenger_uid: String,
    /// Current state.
    pub state: TripState,
    /// Claiming driver.
    pub driver_uid: Option<String>,
    /// States in write order.
    pub history: Vec<TripState>,
}

impl StoredTrip {
    /// Snapshot of a decoded record with its write history.
    pub fn new(trip: &Trip, history: Vec<TripState>) -> Self {
        Self {
            passenger_uid: trip.passenger_uid.clone(),
            state: trip.state,
            driver_uid: trip.driver_uid.clone(),
            history,
        }
    }
}

/// What one session believes.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Signed-in user.
    pub uid: String,
    /// Session role.
    pub role: AccountType,
    /// Trip the session is working on.
    pub trip: Option<Trip>,
    /// Driver holds a successful claim on `trip`.
    pub holds_claim: bool,
    /// Panel title, if shown.
    pub panel_title: Option<String>,
}

impl SessionSnapshot {
    /// Capture a live session.
    pub fn capture(session: &Session) -> Self {
        let holds_claim = match session {
            Session::Driver(driver) => matches!(driver.phase(), DriverPhase::OnTrip(_)),
            Session::Passenger(_) => false,
        };

        Self {
            uid: session.user().uid.clone(),
            role: session.role(),
            trip: session.trip().cloned(),
            holds_claim,
            panel_title: session.panel().map(|p| p.title.clone()),
        }
    }

    /// State of the session's trip.
    pub fn trip_state(&self) -> Option<TripState> {
        self.trip.as_ref().map(|t| t.state)
    }
}
