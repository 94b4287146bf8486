//! Session side-effects and intents.
//!
//! This module defines the [`SessionAction`] enum, which represents
//! instructions produced by the sessions for the runtime to execute. Backend
//! operations go through the [`crate::Bridge`]; map and panel effects go to the
//! [`crate::Device`].

use curbside_core::{Coordinate, Trip, TripState};

/// Continuous observations a session can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Observation {
    /// Own trip record (passenger).
    OwnTrip,
    /// Drivers near the passenger.
    NearbyDrivers,
    /// Unclaimed trips (driver).
    IncomingTrips,
    /// Deletion of the claimed trip (driver).
    Cancellation,
}

/// Actions produced by the session state machines.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Render the session.
    Render,

    /// Observe a passenger's trip record.
    ObserveTrip {
        /// Trip key.
        passenger_uid: String,
    },

    /// Observe drivers within a circle.
    ObserveNearbyDrivers {
        /// Query center.
        center: Coordinate,
        /// Query radius in meters.
        radius_m: f64,
    },

    /// Observe unclaimed trips.
    ObserveIncomingTrips,

    /// Observe deletion of a trip.
    ObserveCancellation {
        /// Trip key.
        passenger_uid: String,
    },

    /// Drop an observation.
    StopObserving(Observation),

    /// Create the signed-in passenger's trip.
    CreateTrip {
        /// Pickup point.
        pickup: Coordinate,
        /// Drop-off point.
        destination: Coordinate,
    },

    /// Claim a trip for the signed-in driver.
    ClaimTrip(Trip),

    /// Conditionally move a trip to the next state.
    AdvanceTrip {
        /// Trip key.
        passenger_uid: String,
        /// Expected current state.
        from: TripState,
        /// Next state.
        to: TripState,
    },

    /// Delete a trip.
    DeleteTrip {
        /// Trip key.
        passenger_uid: String,
    },

    /// Publish the signed-in driver's location.
    PushLocation(Coordinate),

    /// Fetch a user record.
    FetchUser {
        /// User to fetch.
        uid: String,
    },

    /// Draw a route on the map.
    ShowRoute {
        /// Start point. `None` if no fix yet.
        from: Option<Coordinate>,
        /// End point.
        to: Coordinate,
    },

    /// Remove routes, pins and region overlays from the map.
    ClearOverlays,
}

impl SessionAction {
    /// Action is executed by the bridge rather than the device.
    pub fn is_backend(&self) -> bool {
        !matches!(self, Self::Render | Self::ShowRoute { .. } | Self::ClearOverlays)
    }
}
