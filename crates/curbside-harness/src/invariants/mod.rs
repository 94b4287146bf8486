//! Ride invariants.
//!
//! After every simulated step the world settles, reads the stored trip and
//! every session into a [`WorldSnapshot`], and runs each registered
//! [`Invariant`] over it. A check sees only the snapshot, never the live
//! sessions, so a failing snapshot can be rebuilt by hand in a unit test.

mod checks;
mod snapshot;

pub use checks::{
    ClaimMatchesState, MonotonicState, PanelMatchesState, SessionsConverge, SingleClaim,
};
pub use snapshot::{SessionSnapshot, StoredTrip, WorldSnapshot};
use thiserror::Error;

/// Outcome of one check.
pub type InvariantResult = Result<(), Violation>;

/// A broken invariant and what the snapshot showed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{invariant}: {message}")]
pub struct Violation {
    /// Name of the failed check.
    pub invariant: &'static str,
    /// What was observed.
    pub message: String,
}

/// A property of the settled world.
pub trait Invariant: Send + Sync {
    /// Short stable name, used in violations.
    fn name(&self) -> &'static str;

    /// Inspect `state`.
    fn check(&self, state: &WorldSnapshot) -> InvariantResult;
}

/// Checks run after each step.
#[derive(Default)]
pub struct InvariantRegistry {
    checks: Vec<Box<dyn Invariant>>,
}

impl InvariantRegistry {
    /// Registry with no checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// The ride checks: [`SingleClaim`], [`MonotonicState`],
    /// [`ClaimMatchesState`], [`PanelMatchesState`] and [`SessionsConverge`].
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(SingleClaim);
        registry.add(MonotonicState);
        registry.add(ClaimMatchesState);
        registry.add(PanelMatchesState);
        registry.add(SessionsConverge);
        registry
    }

    /// Register `invariant`.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.checks.push(Box::new(invariant));
    }

    /// Names of the registered checks, in run order.
    pub fn names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|check| check.name()).collect()
    }

    /// Run every check. Collects all violations rather than stopping at the
    /// first.
    pub fn check_all(&self, state: &WorldSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<Violation> =
            self.checks.iter().filter_map(|check| check.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Number of registered checks.
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// True if no checks are registered.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}
