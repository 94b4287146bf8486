//! Session input events.
//!
//! This module defines [`SessionEvent`], the complete set of inputs that drive
//! the passenger and driver sessions.
//!
//! Events originate from two distinct sources:
//! - The device: location fixes, region entries and button taps.
//! - The backend: subscription items and operation results translated by the
//!   [`crate::Bridge`].

use curbside_backend::{DriverUpdate, IncomingTrip};
use curbside_core::{Coordinate, RegionKind, Trip, User};

/// Events processed by the session state machines.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// New location fix from the device.
    LocationUpdated(Coordinate),

    /// Platform geofencing reported a region entry.
    RegionEntered(RegionKind),

    /// Periodic tick.
    Tick,

    /// Passenger picked a destination.
    DestinationSelected {
        /// Where to go.
        destination: Coordinate,
    },

    /// Passenger dismissed the selected destination.
    DismissDestination,

    /// Passenger tapped CONFIRM RIDE.
    ConfirmRide,

    /// Passenger tapped CANCEL RIDE.
    CancelTrip,

    /// Driver tapped ACCEPT TRIP.
    AcceptTrip,

    /// Driver dismissed the pickup offer.
    DeclineTrip,

    /// Driver tapped PICKUP PASSENGER.
    StartTrip,

    /// Driver tapped DROP OFF PASSENGER.
    DropOff,

    /// Own trip record was created or changed.
    TripChanged(Trip),

    /// Own trip record was deleted.
    TripRemoved,

    /// Offer stream item.
    Incoming(IncomingTrip),

    /// The claimed trip's record was deleted.
    TripCancelled,

    /// Nearby driver stream item.
    Driver(DriverUpdate),

    /// Trip request was written.
    TripCreated(Trip),

    /// Claim succeeded.
    TripClaimed(Trip),

    /// State update succeeded.
    TripAdvanced(Trip),

    /// Requested user record arrived.
    UserFetched(User),

    /// A backend operation failed.
    Error {
        /// Error description.
        message: String,
    },
}
