//! The standard ride checks.
//!
//! Each check reports the first offending trip or session it finds.

use curbside_core::{AccountType, RidePanel, TripState};

use super::{Invariant, InvariantResult, Violation, WorldSnapshot};

/// At most one driver holds a claim on a trip, and it is the driver the
/// record names.
pub struct SingleClaim;

impl Invariant for SingleClaim {
    fn name(&self) -> &'static str {
        "single_claim"
    }

    fn check(&self, state: &WorldSnapshot) -> InvariantResult {
        for trip in &state.trips {
            let claimants: Vec<&str> = state
                .sessions
                .iter()
                .filter(|s| s.holds_claim)
                .filter(|s| s.trip.as_ref().is_some_and(|t| t.passenger_uid == trip.passenger_uid))
                .map(|s| s.uid.as_str())
                .collect();

            if claimants.len() > 1 {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "trip {}: claimed by {} drivers {claimants:?}",
                        trip.passenger_uid,
                        claimants.len()
                    ),
                });
            }
            if let Some(driver) = claimants.first()
                && trip.driver_uid.as_deref() != Some(*driver)
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "trip {}: driver {driver} holds a claim but record names {:?}",
                        trip.passenger_uid, trip.driver_uid
                    ),
                });
            }
        }
        Ok(())
    }
}

/// A trip only ever moves one step forward.
///
/// Every write recorded since creation advances the state by exactly one.
pub struct MonotonicState;

impl Invariant for MonotonicState {
    fn name(&self) -> &'static str {
        "monotonic_state"
    }

    fn check(&self, state: &WorldSnapshot) -> InvariantResult {
        for trip in &state.trips {
            if let Some(first) = trip.history.first()
                && *first != TripState::Requested
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("trip {}: created in {first:?}", trip.passenger_uid),
                });
            }
            for window in trip.history.windows(2) {
                if u8::from(window[1]) != u8::from(window[0]) + 1 {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "trip {}: {:?} → {:?}",
                            trip.passenger_uid, window[0], window[1]
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// A driver is recorded exactly when the trip has been accepted.
pub struct ClaimMatchesState;

impl Invariant for ClaimMatchesState {
    fn name(&self) -> &'static str {
        "claim_matches_state"
    }

    fn check(&self, state: &WorldSnapshot) -> InvariantResult {
        for trip in &state.trips {
            let claimed = trip.state >= TripState::Accepted;
            if trip.driver_uid.is_some() != claimed {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "trip {}: state {:?} with driver {:?}",
                        trip.passenger_uid, trip.state, trip.driver_uid
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Every session shows the panel for the trip state it believes in.
pub struct PanelMatchesState;

impl Invariant for PanelMatchesState {
    fn name(&self) -> &'static str {
        "panel_matches_state"
    }

    fn check(&self, state: &WorldSnapshot) -> InvariantResult {
        for session in &state.sessions {
            let Some(trip_state) = session.trip_state() else {
                continue;
            };
            let expected = RidePanel::for_trip(session.role, trip_state).map(|p| p.title);
            if session.panel_title != expected {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{} ({:?}) in {trip_state:?}: panel {:?}, expected {expected:?}",
                        session.uid, session.role, session.panel_title
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Once quiescent, sessions agree with the stored record.
///
/// A passenger's trip and a claiming driver's trip must both match the
/// stored state. Only meaningful after all subscriptions have drained.
pub struct SessionsConverge;

impl Invariant for SessionsConverge {
    fn name(&self) -> &'static str {
        "sessions_converge"
    }

    fn check(&self, state: &WorldSnapshot) -> InvariantResult {
        for session in &state.sessions {
            let relevant = match session.role {
                AccountType::Passenger => session.trip.is_some(),
                AccountType::Driver => session.holds_claim,
            };
            let Some(trip) = session.trip.as_ref().filter(|_| relevant) else {
                continue;
            };

            let stored = state.trip(&trip.passenger_uid).map(|t| t.state);
            if stored != Some(trip.state) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{} believes trip {} is {:?}, stored {stored:?}",
                        session.uid, trip.passenger_uid, trip.state
                    ),
                });
            }
        }
        Ok(())
    }
}
