//! Session-visible state types.

use std::collections::BTreeMap;

use curbside_backend::DriverUpdate;
use curbside_core::{Coordinate, Trip};

/// Map pin for one nearby driver.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverAnnotation {
    /// Driver uid.
    pub uid: String,
    /// Last known position.
    pub coordinate: Coordinate,
}

/// Nearby-driver pins, reconciled against live updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    pins: BTreeMap<String, DriverAnnotation>,
}

impl Annotations {
    /// Apply an update. Returns whether any pin changed.
    ///
    /// Enter adds or moves, move moves an existing pin, exit removes.
    pub fn apply(&mut self, update: &DriverUpdate) -> bool {
        match update {
            DriverUpdate::Entered(driver) => {
                let Some(coordinate) = driver.location else {
                    return false;
                };
                let pin = DriverAnnotation { uid: driver.uid.clone(), coordinate };
                self.pins.insert(driver.uid.clone(), pin);
                true
            },
            DriverUpdate::Moved { uid, location } => match self.pins.get_mut(uid) {
                Some(pin) => {
                    pin.coordinate = *location;
                    true
                },
                None => false,
            },
            DriverUpdate::Exited { uid } => self.pins.remove(uid).is_some(),
        }
    }

    /// Pin for a driver.
    pub fn get(&self, uid: &str) -> Option<&DriverAnnotation> {
        self.pins.get(uid)
    }

    /// Pins in uid order.
    pub fn iter(&self) -> impl Iterator<Item = &DriverAnnotation> {
        self.pins.values()
    }

    /// Number of pins.
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    /// No pins.
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Remove every pin.
    pub fn clear(&mut self) {
        self.pins.clear();
    }
}

/// Where a passenger is in the request flow.
#[derive(Debug, Clone, PartialEq)]
pub enum PassengerPhase {
    /// Browsing the map.
    Idle,
    /// Destination chosen, request panel shown.
    Selecting {
        /// Chosen destination.
        destination: Coordinate,
    },
    /// Trip creation in flight.
    Requesting {
        /// Chosen destination.
        destination: Coordinate,
    },
    /// A trip record exists.
    OnTrip(Trip),
}

/// Where a driver is in the pickup flow.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverPhase {
    /// Waiting for offers.
    Idle,
    /// An unclaimed trip is offered.
    Offered(Trip),
    /// Claim in flight.
    Claiming(Trip),
    /// Trip claimed by this driver.
    OnTrip(Trip),
}

#[cfg(test)]
mod tests {
    use curbside_core::{AccountType, User};

    use super::*;

    fn driver(uid: &str, lat: f64) -> User {
        let mut user = User::new(uid, "D", "d@x.y", AccountType::Driver);
        user.location = Some(Coordinate::new(lat, 0.0));
        user
    }

    #[test]
    fn enter_move_exit() {
        let mut pins = Annotations::default();
        assert!(pins.apply(&DriverUpdate::Entered(driver("d1", 1.0))));
        assert!(pins.apply(&DriverUpdate::Moved { uid: "d1".into(), location: Coordinate::new(2.0, 0.0) }));
        assert_eq!(pins.get("d1").map(|p| p.coordinate), Some(Coordinate::new(2.0, 0.0)));

        assert!(pins.apply(&DriverUpdate::Exited { uid: "d1".into() }));
        assert!(pins.is_empty());
    }

    #[test]
    fn reentry_moves_existing_pin() {
        let mut pins = Annotations::default();
        pins.apply(&DriverUpdate::Entered(driver("d1", 1.0)));
        pins.apply(&DriverUpdate::Entered(driver("d1", 3.0)));
        assert_eq!(pins.len(), 1);
        assert_eq!(pins.get("d1").map(|p| p.coordinate.latitude), Some(3.0));
    }

    #[test]
    fn move_of_unknown_driver_is_ignored() {
        let mut pins = Annotations::default();
        assert!(!pins.apply(&DriverUpdate::Moved { uid: "x".into(), location: Coordinate::new(0.0, 0.0) }));
        assert!(!pins.apply(&DriverUpdate::Exited { uid: "x".into() }));
    }
}
