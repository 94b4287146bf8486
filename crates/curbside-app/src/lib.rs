//! Application layer for Curbside
//!
//! Pure passenger and driver state machines plus a generic runtime that
//! connects them to the backend and a frontend device, enabling
//! deterministic simulation testing with the same code that runs in
//! production.
//!
//! # Components
//!
//! - [`Session`]: role dispatch over [`PassengerSession`] and
//!   [`DriverSession`]
//! - [`Bridge`]: executes backend actions and owns subscriptions
//! - [`Device`]: trait for platform-specific I/O abstraction
//! - [`Runtime`]: generic orchestration loop using a Device
//! - [`Container`]: side menu and sign-out confirmation
//! - [`sign_up`], [`sign_in`], [`sign_out`]: account flows

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod account;
mod action;
mod bridge;
mod config;
mod container;
mod device;
mod driver;
mod error;
mod event;
mod passenger;
mod runtime;
mod session;
mod state;

pub use account::{Registration, sign_in, sign_out, sign_up};
pub use action::{Observation, SessionAction};
pub use bridge::Bridge;
pub use config::SessionConfig;
pub use container::{Container, ContainerAction, MenuOption, SIGN_OUT_PROMPT};
pub use device::Device;
pub use driver::DriverSession;
pub use error::SessionError;
pub use event::SessionEvent;
pub use passenger::{PassengerSession, TRIP_CANCELLED, TRIP_COMPLETED};
pub use runtime::Runtime;
pub use session::Session;
pub use state::{Annotations, DriverAnnotation, DriverPhase, PassengerPhase};
