//! Session configuration.

use curbside_backend::DEFAULT_NEARBY_RADIUS_M;
use curbside_core::DEFAULT_GEOFENCE_RADIUS_M;

/// Tunables shared by both session roles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Radius of the passenger's nearby-driver query, in meters.
    pub nearby_radius_m: f64,
    /// Radius of pickup and destination geofences, in meters.
    pub geofence_radius_m: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { nearby_radius_m: DEFAULT_NEARBY_RADIUS_M, geofence_radius_m: DEFAULT_GEOFENCE_RADIUS_M }
    }
}
