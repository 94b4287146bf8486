//! Curbside backend
//!
//! Everything between the session state machines and the realtime backend:
//!
//! - [`Database`]: document store with collection watchers and a geo index,
//!   implemented in memory by [`MemoryDatabase`] and wrapped for fault
//!   injection by [`ChaoticDatabase`]
//! - [`Subscription`]: cancellable handle for continuous observations
//! - [`Gateway`]: typed user/trip operations over any [`Database`]
//! - [`AuthProvider`]: email/password identity, with [`MemoryAuth`]
//! - [`SystemEnv`]: production randomness

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod auth;
pub mod database;
mod error;
mod gateway;
mod subscription;
mod system_env;

pub use auth::{AuthProvider, MIN_PASSWORD_LEN, MemoryAuth};
pub use database::{
    Change, ChangeKind, ChaoticDatabase, Collection, Database, DatabaseError, DocPath, GeoEvent,
    MemoryDatabase,
};
pub use error::{AuthError, GatewayError};
pub use gateway::{
    DEFAULT_NEARBY_RADIUS_M, DriverUpdate, Gateway, IncomingTrip, NearbyDrivers, TripUpdate,
};
pub use subscription::Subscription;
pub use system_env::SystemEnv;
