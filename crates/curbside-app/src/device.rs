//! Device trait for abstracting frontend I/O.
//!
//! The [`Device`] trait decouples the session runtime from a concrete
//! frontend. A mobile shell feeds location fixes, region events and taps; a
//! simulation feeds a script. The generic [`crate::Runtime`] handles all
//! orchestration in both cases.

use std::future::Future;

use curbside_core::Coordinate;

use crate::{Session, SessionEvent};

/// Abstracts frontend I/O for the session runtime.
///
/// # Implementations
///
/// - **Mobile shell**: platform location and region monitoring, map view
/// - **Simulation**: scripted inputs with recorded renders
pub trait Device: Send {
    /// Frontend-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Poll for the next input event.
    ///
    /// Returns `None` if no input is ready.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<SessionEvent>, Self::Error>> + Send;

    /// Render the session.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, session: &Session) -> Result<(), Self::Error>;

    /// Draw a route. `from` is `None` if the session has no fix yet.
    fn show_route(&mut self, from: Option<Coordinate>, to: Coordinate) -> Result<(), Self::Error>;

    /// Remove routes, pins and region overlays.
    fn clear_overlays(&mut self) -> Result<(), Self::Error>;

    /// No more input will arrive; the runtime stops once it is idle.
    fn is_closed(&self) -> bool;
}
