//! Role dispatch.
//!
//! A signed-in user gets exactly one session, chosen by account type. A user
//! record without a valid account type cannot start a session.

use curbside_core::{AccountType, Coordinate, RidePanel, Trip, User};

use crate::{
    DriverSession, Observation, PassengerSession, SessionAction, SessionConfig, SessionEvent,
    error::SessionError,
};

/// The active session for the signed-in user.
#[derive(Debug, Clone)]
pub enum Session {
    /// Passenger home screen.
    Passenger(PassengerSession),
    /// Driver home screen.
    Driver(DriverSession),
}

impl Session {
    /// Build the session matching `user`'s account type.
    ///
    /// # Errors
    ///
    /// - `SessionError::UnknownAccountType` if the record has no valid role
    pub fn for_user(user: User, config: SessionConfig) -> Result<Self, SessionError> {
        match user.account_type {
            Some(AccountType::Passenger) => Ok(Self::Passenger(PassengerSession::new(user, config))),
            Some(AccountType::Driver) => Ok(Self::Driver(DriverSession::new(user, config))),
            None => Err(SessionError::UnknownAccountType { uid: user.uid }),
        }
    }

    /// Actions to run once the identity is established.
    pub fn start(&mut self) -> Vec<SessionAction> {
        match self {
            Self::Passenger(s) => s.start(),
            Self::Driver(s) => s.start(),
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        match self {
            Self::Passenger(s) => s.handle(event),
            Self::Driver(s) => s.handle(event),
        }
    }

    /// Role of the signed-in user.
    pub fn role(&self) -> AccountType {
        match self {
            Self::Passenger(_) => AccountType::Passenger,
            Self::Driver(_) => AccountType::Driver,
        }
    }

    /// Signed-in user.
    pub fn user(&self) -> &User {
        match self {
            Self::Passenger(s) => s.user(),
            Self::Driver(s) => s.user(),
        }
    }

    /// Trip the session is working on.
    pub fn trip(&self) -> Option<&Trip> {
        match self {
            Self::Passenger(s) => s.trip(),
            Self::Driver(s) => s.trip(),
        }
    }

    /// Panel contents.
    pub fn panel(&self) -> Option<&RidePanel> {
        match self {
            Self::Passenger(s) => s.panel(),
            Self::Driver(s) => s.panel(),
        }
    }

    /// Transient status line.
    pub fn status(&self) -> Option<&str> {
        match self {
            Self::Passenger(s) => s.status(),
            Self::Driver(s) => s.status(),
        }
    }

    /// Last location fix.
    pub fn location(&self) -> Option<Coordinate> {
        match self {
            Self::Passenger(s) => s.location(),
            Self::Driver(s) => s.location(),
        }
    }

    /// Observations the session holds.
    pub fn observations(&self) -> Vec<Observation> {
        match self {
            Self::Passenger(s) => s.observations(),
            Self::Driver(s) => s.observations(),
        }
    }
}
