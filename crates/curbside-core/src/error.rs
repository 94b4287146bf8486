//! Error types for records and the trip state machine.

use thiserror::Error;

use crate::{TripEvent, TripState};

/// Errors decoding or encoding a backend document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// Snapshot value is not a key-value map
    #[error("document is not a map")]
    NotAMap,

    /// Required field is absent
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// Integer does not name a trip state
    #[error("unknown trip state {0}")]
    UnknownState(u8),

    /// Value could not be converted to or from the document model
    #[error("codec error: {0}")]
    Codec(String),
}

/// An event that the trip state machine does not accept in the current state.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot apply {event:?} to a trip in state {state:?}")]
pub struct TransitionError {
    /// State the trip was in
    pub state: TripState,
    /// Event that was rejected
    pub event: TripEvent,
}
