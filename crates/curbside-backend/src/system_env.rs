//! Production Environment implementation using the OS RNG.

use curbside_core::env::Environment;

/// Production environment backed by getrandom.
///
/// # Panics
///
/// Panics if the OS RNG fails. Identities drawn from a broken RNG could
/// collide, so there is no safe fallback.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}
