//! Simulation device implementing the Device trait.
//!
//! `ScriptedDevice` replays a queue of inputs and records everything the
//! runtime asks it to draw, so the same [`curbside_app::Runtime`]
//! orchestration code runs in both production and simulation.

use std::collections::VecDeque;

use curbside_app::{Device, Session, SessionEvent};
use curbside_core::Coordinate;
use thiserror::Error;

/// Error type for the scripted device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("scripted device: {0}")]
pub struct ScriptedDeviceError(pub String);

/// What the session looked like when it was rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Panel title, if the panel is shown.
    pub title: Option<String>,
    /// Panel button label, if the panel is shown.
    pub button: Option<String>,
    /// Counterpart name on the panel.
    pub counterpart: Option<String>,
    /// Status line.
    pub status: Option<String>,
}

impl Frame {
    fn capture(session: &Session) -> Self {
        let panel = session.panel();
        Self {
            title: panel.map(|p| p.title.clone()),
            button: panel.map(|p| p.button_label.clone()),
            counterpart: panel.and_then(|p| p.counterpart.clone()),
            status: session.status().map(str::to_owned),
        }
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title.as_deref().unwrap_or("-"))?;
        if let Some(counterpart) = &self.counterpart {
            write!(f, " ({counterpart})")?;
        }
        if let Some(button) = &self.button {
            write!(f, " [{button}]")?;
        }
        if let Some(status) = &self.status {
            write!(f, " <{status}>")?;
        }
        Ok(())
    }
}

/// Scripted input device for deterministic runtime tests.
///
/// The device reports itself closed once the script is exhausted, so
/// [`curbside_app::Runtime::run`] returns when the session goes idle.
#[derive(Debug, Default)]
pub struct ScriptedDevice {
    script: VecDeque<SessionEvent>,
    frames: Vec<Frame>,
    routes: Vec<(Option<Coordinate>, Coordinate)>,
    clears: usize,
    fail_renders: bool,
}

impl ScriptedDevice {
    /// Device that will deliver `script` in order.
    pub fn new(script: impl IntoIterator<Item = SessionEvent>) -> Self {
        Self { script: script.into_iter().collect(), ..Self::default() }
    }

    /// Make every render fail, to exercise error propagation.
    #[must_use]
    pub fn failing_renders(mut self) -> Self {
        self.fail_renders = true;
        self
    }

    /// Append an input to the script.
    pub fn inject_event(&mut self, event: SessionEvent) {
        self.script.push_back(event);
    }

    /// Inputs not yet delivered.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Recorded renders, oldest first.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Last recorded render.
    pub fn last_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Drawn routes, oldest first.
    pub fn routes(&self) -> &[(Option<Coordinate>, Coordinate)] {
        &self.routes
    }

    /// Number of overlay clears.
    pub fn clears(&self) -> usize {
        self.clears
    }

    /// Renders with consecutive duplicates collapsed, one per line.
    pub fn transcript(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        for frame in &self.frames {
            let line = frame.to_string();
            if lines.last() != Some(&line) {
                lines.push(line);
            }
        }
        lines.join("\n")
    }
}

impl Device for ScriptedDevice {
    type Error = ScriptedDeviceError;

    async fn poll_event(&mut self) -> Result<Option<SessionEvent>, Self::Error> {
        Ok(self.script.pop_front())
    }

    fn render(&mut self, session: &Session) -> Result<(), Self::Error> {
        if self.fail_renders {
            return Err(ScriptedDeviceError("render failed".into()));
        }
        self.frames.push(Frame::capture(session));
        Ok(())
    }

    fn show_route(&mut self, from: Option<Coordinate>, to: Coordinate) -> Result<(), Self::Error> {
        self.routes.push((from, to));
        Ok(())
    }

    fn clear_overlays(&mut self) -> Result<(), Self::Error> {
        self.clears += 1;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.script.is_empty()
    }
}
