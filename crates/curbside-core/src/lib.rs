//! Curbside core
//!
//! Passive records and pure logic shared by both sides of a ride: the
//! passenger who requests a trip and the driver who claims and completes it.
//!
//! # Components
//!
//! - [`User`], [`Trip`], [`TripState`]: records decoded from backend documents
//! - [`transition`]: the trip lifecycle state machine (no I/O)
//! - [`GeofenceMonitor`]: circular region enter/exit detection
//! - [`RidePanel`]: per-role panel configuration for each trip state
//! - [`Environment`]: randomness abstraction for deterministic simulation

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod document;
pub mod env;
mod error;
pub mod geo;
mod machine;
mod panel;
mod trip;
mod user;

pub use document::Document;
pub use error::{DocumentError, TransitionError};
pub use geo::{
    Coordinate, DEFAULT_GEOFENCE_RADIUS_M, GeofenceMonitor, GeofenceTransition, Region,
    RegionKind,
};
pub use machine::{TripEvent, transition};
pub use panel::{ButtonAction, PanelConfig, RidePanel};
pub use trip::{Trip, TripState};
pub use user::{AccountType, User};
