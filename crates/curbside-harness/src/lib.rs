//! Deterministic simulation harness for Curbside.
//!
//! Seeded implementations of the Environment and Device traits plus a
//! multi-party [`World`] that runs real passenger and driver sessions against
//! one shared database, optionally with injected database failures.
//!
//! # Invariants
//!
//! A [`World`] settles after every input and runs an [`InvariantRegistry`]
//! over a [`WorldSnapshot`]: one claim per trip, forward-only state, panels
//! that match the state each session believes, and sessions that agree with
//! the stored record once quiet.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod scripted_device;
pub mod sim_env;
pub mod world;

pub use invariants::{
    ClaimMatchesState, Invariant, InvariantRegistry, InvariantResult, MonotonicState,
    PanelMatchesState, SessionSnapshot, SessionsConverge, SingleClaim, StoredTrip, Violation,
    WorldSnapshot,
};
pub use scripted_device::{Frame, ScriptedDevice, ScriptedDeviceError};
pub use sim_env::SimEnv;
pub use world::{
    AREA_CENTER, HarnessError, Participant, SimDatabase, World, WorldConfig, WorldStats,
};
