//! Coordinates, distances and geofences.
//!
//! A geofence is a circular [`Region`] watched by a [`GeofenceMonitor`]. The
//! monitor is a pure state machine: feed it location fixes and it returns the
//! boundary crossings they caused.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Mean Earth radius used for great-circle distances.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Radius of the pickup and destination geofences.
pub const DEFAULT_GEOFENCE_RADIUS_M: f64 = 25.0;

/// A point on the Earth's surface in decimal degrees.
///
/// Encoded in documents as a two-element `[latitude, longitude]` array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude in degrees, `[-90, 90]`.
    pub latitude: f64,
    /// Longitude in degrees, `[-180, 180]`.
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate from latitude and longitude.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Both components are finite and within their ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle (haversine) distance to `other`, in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = lat2 - lat1;
        let d_lng = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

impl Serialize for Coordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.latitude, self.longitude).serialize(serializer)
    }
}

/// Rejects points that are not finite or out of range, so a bad record never
/// reaches a geofence.
impl<'de> Deserialize<'de> for Coordinate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (latitude, longitude) = <(f64, f64)>::deserialize(deserializer)?;
        let coordinate = Self { latitude, longitude };
        if !coordinate.is_valid() {
            return Err(serde::de::Error::custom(format!(
                "coordinate {coordinate} out of range"
            )));
        }
        Ok(coordinate)
    }
}

/// Which leg of the trip a region guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// Circle around the passenger's pickup point.
    Pickup,
    /// Circle around the trip destination.
    Destination,
}

/// A circular region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// Region identifier. At most one region per kind is armed.
    pub kind: RegionKind,
    /// Center of the circle.
    pub center: Coordinate,
    /// Radius in meters.
    pub radius_m: f64,
}

impl Region {
    /// Create a region with the default geofence radius.
    pub fn new(kind: RegionKind, center: Coordinate) -> Self {
        Self { kind, center, radius_m: DEFAULT_GEOFENCE_RADIUS_M }
    }

    /// Override the radius.
    #[must_use]
    pub fn with_radius(mut self, radius_m: f64) -> Self {
        self.radius_m = radius_m;
        self
    }

    /// `location` is inside or on the boundary.
    pub fn contains(&self, location: &Coordinate) -> bool {
        self.center.distance_to(location) <= self.radius_m
    }
}

/// A boundary crossing reported by [`GeofenceMonitor::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeofenceTransition {
    /// Moved from outside to inside.
    Entered(RegionKind),
    /// Moved from inside to outside.
    Exited(RegionKind),
}

#[derive(Debug, Clone)]
struct ArmedRegion {
    region: Region,
    inside: bool,
}

/// Watches armed regions and reports enter/exit crossings.
///
/// A freshly armed region counts as "outside", so arming a region around the
/// current position reports `Entered` on the next fix.
#[derive(Debug, Clone, Default)]
pub struct GeofenceMonitor {
    regions: Vec<ArmedRegion>,
}

impl GeofenceMonitor {
    /// Create a monitor with no regions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start monitoring `region`, replacing any region of the same kind.
    pub fn arm(&mut self, region: Region) {
        self.disarm(region.kind);
        self.regions.push(ArmedRegion { region, inside: false });
    }

    /// Stop monitoring the region of `kind`. No-op if not armed.
    pub fn disarm(&mut self, kind: RegionKind) {
        self.regions.retain(|armed| armed.region.kind != kind);
    }

    /// Stop monitoring all regions.
    pub fn clear(&mut self) {
        self.regions.clear();
    }

    /// Region of `kind`. `None` if not armed.
    pub fn region(&self, kind: RegionKind) -> Option<&Region> {
        self.regions.iter().map(|armed| &armed.region).find(|r| r.kind == kind)
    }

    /// Number of armed regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// No regions armed.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Feed a location fix and return the crossings it caused.
    pub fn observe(&mut self, location: Coordinate) -> Vec<GeofenceTransition> {
        let mut transitions = Vec::new();

        for armed in &mut self.regions {
            let inside = armed.region.contains(&location);
            match (armed.inside, inside) {
                (false, true) => transitions.push(GeofenceTransition::Entered(armed.region.kind)),
                (true, false) => transitions.push(GeofenceTransition::Exited(armed.region.kind)),
                _ => {},
            }
            armed.inside = inside;
        }

        transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Roughly 11 meters of latitude.
    const TEN_METERS_LAT: f64 = 0.0001;

    #[test]
    fn distance_between_identical_points_is_zero() {
        let a = Coordinate::new(37.0, -122.0);
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn distance_one_degree_latitude() {
        let a = Coordinate::new(37.0, -122.0);
        let b = Coordinate::new(38.0, -122.0);
        let d = a.distance_to(&b);
        assert!((d - 111_195.0).abs() < 100.0, "got {d}");
    }

    #[test]
    fn validity_bounds() {
        assert!(Coordinate::new(90.0, 180.0).is_valid());
        assert!(!Coordinate::new(90.1, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::NAN).is_valid());
    }

    #[test]
    fn enter_then_exit() {
        let center = Coordinate::new(37.0, -122.0);
        let mut monitor = GeofenceMonitor::new();
        monitor.arm(Region::new(RegionKind::Pickup, center));

        let far = Coordinate::new(37.0 + 10.0 * TEN_METERS_LAT, -122.0);
        assert!(monitor.observe(far).is_empty());

        let near = Coordinate::new(37.0 + TEN_METERS_LAT, -122.0);
        assert_eq!(monitor.observe(near), vec![GeofenceTransition::Entered(RegionKind::Pickup)]);

        // Staying inside does not re-fire
        assert!(monitor.observe(center).is_empty());

        assert_eq!(monitor.observe(far), vec![GeofenceTransition::Exited(RegionKind::Pickup)]);
    }

    #[test]
    fn arming_while_inside_fires_on_next_fix() {
        let center = Coordinate::new(37.0, -122.0);
        let mut monitor = GeofenceMonitor::new();
        monitor.arm(Region::new(RegionKind::Destination, center));

        assert_eq!(monitor.observe(center), vec![GeofenceTransition::Entered(
            RegionKind::Destination
        )]);
    }

    #[test]
    fn arm_replaces_same_kind() {
        let mut monitor = GeofenceMonitor::new();
        monitor.arm(Region::new(RegionKind::Pickup, Coordinate::new(1.0, 1.0)));
        monitor.arm(Region::new(RegionKind::Pickup, Coordinate::new(2.0, 2.0)));

        assert_eq!(monitor.len(), 1);
        assert_eq!(
            monitor.region(RegionKind::Pickup).map(|r| r.center),
            Some(Coordinate::new(2.0, 2.0))
        );

        monitor.disarm(RegionKind::Pickup);
        assert!(monitor.is_empty());
    }
}
