//! Gateway and authentication errors

use curbside_core::{Coordinate, DocumentError, TripState};
use thiserror::Error;

use crate::DatabaseError;

/// Errors from [`crate::Gateway`] operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// Underlying database failed
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Stored or outgoing document could not be converted
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// No trip exists for this passenger
    #[error("no trip for passenger {passenger_uid}")]
    TripNotFound {
        /// Trip key
        passenger_uid: String,
    },

    /// Passenger already has an active trip
    #[error("passenger {passenger_uid} already has an active trip")]
    TripExists {
        /// Trip key
        passenger_uid: String,
    },

    /// Another driver claimed the trip first
    #[error("trip for {passenger_uid} already claimed by {driver_uid}")]
    AlreadyClaimed {
        /// Trip key
        passenger_uid: String,
        /// Winning driver
        driver_uid: String,
    },

    /// Trip was not in the state the write expected
    #[error("trip state conflict: expected {expected:?}, found {actual:?}")]
    Conflict {
        /// State the caller observed
        expected: TripState,
        /// State found in the store
        actual: TripState,
    },

    /// No single lifecycle event moves a trip between these states
    #[error("invalid trip transition {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current state
        from: TripState,
        /// Requested state
        to: TripState,
    },

    /// Coordinate is out of range or not finite
    #[error("invalid coordinate {0}")]
    InvalidCoordinate(Coordinate),
}

impl GatewayError {
    /// Retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Database(e) if e.is_transient())
    }
}

/// Errors from an [`crate::AuthProvider`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Email is empty or has no `@`
    #[error("invalid email address")]
    InvalidEmail,

    /// Password shorter than the minimum length
    #[error("password must be at least {min} characters")]
    WeakPassword {
        /// Minimum accepted length
        min: usize,
    },

    /// An account with this email exists
    #[error("email already in use")]
    EmailInUse,

    /// Unknown email or wrong password
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Shared state was poisoned by a panicking writer
    #[error("auth state poisoned")]
    Poisoned,
}

impl<T> From<std::sync::PoisonError<T>> for AuthError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::Poisoned
    }
}
