//! Application-layer errors.

use curbside_backend::{AuthError, GatewayError};
use thiserror::Error;

/// Errors starting a session or running an account flow.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// User record has no valid account type
    #[error("user {uid} has no account type")]
    UnknownAccountType {
        /// Offending user
        uid: String,
    },

    /// Signed in, but no `users/{uid}` record exists
    #[error("no profile for user {uid}")]
    ProfileMissing {
        /// Authenticated uid
        uid: String,
    },

    /// Authentication failed
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Backend operation failed
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
