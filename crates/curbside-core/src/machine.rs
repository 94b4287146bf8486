//! Trip lifecycle state machine.
//!
//! ```text
//! ┌───────────┐ Accept ┌──────────┐ EnterPickup ┌───────────────┐
//! │ Requested │───────>│ Accepted │────────────>│ DriverArrived │
//! └───────────┘        └──────────┘             └───────────────┘
//!                                                       │ StartTrip
//!                                                       ↓
//! ┌───────────┐ DropOff ┌──────────────────────┐  ┌────────────┐
//! │ Completed │<────────│ ArrivedAtDestination │<─│ InProgress │
//! └───────────┘         └──────────────────────┘  └────────────┘
//!                           EnterDestination
//! ```
//!
//! Cancellation deletes the record and is not modelled here. The function is
//! pure: side effects (record writes, geofences, routes) belong to callers.

use crate::{TransitionError, TripState};

/// Inputs that advance a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripEvent {
    /// A driver claims the request.
    Accept,
    /// The driver's position entered the pickup geofence.
    EnterPickup,
    /// The driver started the trip with the passenger on board.
    StartTrip,
    /// The driver's position entered the destination geofence.
    EnterDestination,
    /// The driver confirmed drop-off.
    DropOff,
}

impl TripEvent {
    /// All events.
    pub const ALL: [TripEvent; 5] =
        [Self::Accept, Self::EnterPickup, Self::StartTrip, Self::EnterDestination, Self::DropOff];

    /// The event that moves a trip from `from` to `to`. `None` if no single
    /// event does.
    pub fn between(from: TripState, to: TripState) -> Option<TripEvent> {
        Self::ALL.into_iter().find(|event| transition(from, *event) == Ok(to))
    }
}

/// Apply `event` to a trip in `state`.
///
/// # Errors
///
/// - `TransitionError` if the event is not accepted in `state`. The caller
///   must leave the trip unchanged.
pub fn transition(state: TripState, event: TripEvent) -> Result<TripState, TransitionError> {
    let next = match (state, event) {
        (TripState::Requested, TripEvent::Accept) => TripState::Accepted,
        (TripState::Accepted, TripEvent::EnterPickup) => TripState::DriverArrived,
        (TripState::DriverArrived, TripEvent::StartTrip) => TripState::InProgress,
        (TripState::InProgress, TripEvent::EnterDestination) => TripState::ArrivedAtDestination,
        (TripState::ArrivedAtDestination, TripEvent::DropOff) => TripState::Completed,
        _ => return Err(TransitionError { state, event }),
    };

    debug_assert!(next > state);
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path() {
        let mut state = TripState::Requested;
        for event in TripEvent::ALL {
            state = transition(state, event).expect("valid transition");
        }
        assert_eq!(state, TripState::Completed);
    }

    #[test]
    fn pickup_geofence_before_accept_is_rejected() {
        assert_eq!(
            transition(TripState::Requested, TripEvent::EnterPickup),
            Err(TransitionError { state: TripState::Requested, event: TripEvent::EnterPickup })
        );
    }

    #[test]
    fn completed_is_terminal() {
        for event in TripEvent::ALL {
            assert!(transition(TripState::Completed, event).is_err());
        }
    }

    #[test]
    fn between_finds_single_step() {
        assert_eq!(
            TripEvent::between(TripState::DriverArrived, TripState::InProgress),
            Some(TripEvent::StartTrip)
        );
        assert_eq!(TripEvent::between(TripState::Requested, TripState::DriverArrived), None);
        assert_eq!(TripEvent::between(TripState::Accepted, TripState::Accepted), None);
    }
}
