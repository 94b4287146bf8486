//! Generic runtime for session orchestration.
//!
//! The Runtime drives one session's event loop, coordinating between:
//! - [`Session`]: passenger or driver state machine
//! - [`Bridge`]: backend operations and subscriptions
//! - [`Device`]: frontend I/O

use curbside_backend::Database;

use crate::{Bridge, Device, Session, SessionAction, SessionEvent};

/// Generic runtime that orchestrates Session, Bridge, and Device.
///
/// # Type Parameters
///
/// - `V`: Frontend device
/// - `D`: Backend database
pub struct Runtime<V, D>
where
    V: Device,
    D: Database,
{
    device: V,
    session: Session,
    bridge: Bridge<D>,
    started: bool,
}

impl<V, D> Runtime<V, D>
where
    V: Device,
    D: Database,
{
    /// Create a runtime for a session and its bridge.
    pub fn new(device: V, session: Session, bridge: Bridge<D>) -> Self {
        Self { device, session, bridge, started: false }
    }

    /// Run until the device closes and no work is pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the device encounters an I/O error.
    pub async fn run(mut self) -> Result<(Session, V), V::Error> {
        self.start()?;

        loop {
            let busy = self.step().await?;
            if !busy {
                if self.device.is_closed() {
                    break;
                }
                tokio::task::yield_now().await;
            }
        }

        self.bridge.release();
        Ok((self.session, self.device))
    }

    /// Emit the session's start actions. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the device fails while executing them.
    pub fn start(&mut self) -> Result<(), V::Error> {
        if self.started {
            return Ok(());
        }
        self.started = true;

        tracing::info!(uid = %self.session.user().uid, role = ?self.session.role(), "session started");
        let actions = self.session.start();
        self.process_actions(actions)
    }

    /// Process one cycle: one device input, then all pending subscription
    /// items.
    ///
    /// Returns `true` if anything was processed.
    ///
    /// # Errors
    ///
    /// Returns an error if the device encounters an I/O error.
    pub async fn step(&mut self) -> Result<bool, V::Error> {
        let mut busy = false;

        if let Some(event) = self.device.poll_event().await? {
            busy = true;
            self.dispatch(event)?;
        }

        // Items may trigger actions that produce further items
        loop {
            let events = self.bridge.poll_subscriptions();
            if events.is_empty() {
                break;
            }
            busy = true;
            for event in events {
                self.dispatch(event)?;
            }
        }

        Ok(busy)
    }

    fn dispatch(&mut self, event: SessionEvent) -> Result<(), V::Error> {
        let actions = self.session.handle(event);
        self.process_actions(actions)
    }

    /// Execute actions, feeding bridge results back into the session.
    fn process_actions(&mut self, initial_actions: Vec<SessionAction>) -> Result<(), V::Error> {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                match action {
                    SessionAction::Render => self.device.render(&self.session)?,
                    SessionAction::ShowRoute { from, to } => self.device.show_route(from, to)?,
                    SessionAction::ClearOverlays => self.device.clear_overlays()?,
                    backend => {
                        for event in self.bridge.process_action(backend) {
                            pending_actions.extend(self.session.handle(event));
                        }
                    },
                }
            }
        }

        Ok(())
    }

    /// Get a reference to the Session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Get a reference to the Bridge
    pub fn bridge(&self) -> &Bridge<D> {
        &self.bridge
    }

    /// Get a reference to the Device
    pub fn device(&self) -> &V {
        &self.device
    }

    /// Get a mutable reference to the Device
    pub fn device_mut(&mut self) -> &mut V {
        &mut self.device
    }
}
