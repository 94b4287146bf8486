//! Seeded Environment implementation for simulation.
//!
//! Every random choice a simulation makes (generated uids, which party acts
//! next, where a driver moves) is drawn from one ChaCha stream, so a seed
//! replays the exact same run.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    ops::Range,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use curbside_core::env::Environment;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic environment backed by a seeded ChaCha8 stream.
///
/// Clones share the stream.
#[derive(Clone)]
pub struct SimEnv {
    seed: u64,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl SimEnv {
    /// Create an environment from a seed.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed, rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))) }
    }

    /// Seed this environment was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform draw from `range`. The range must not be empty.
    pub fn gen_range(&self, range: Range<u64>) -> u64 {
        self.rng().gen_range(range)
    }

    /// Uniform draw from `[0.0, 1.0)`.
    pub fn gen_unit(&self) -> f64 {
        self.rng().r#gen::<f64>()
    }

    fn rng(&self) -> MutexGuard<'_, ChaCha8Rng> {
        // The stream stays usable even if a holder panicked mid-draw
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SimEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimEnv").field("seed", &self.seed).finish_non_exhaustive()
    }
}

impl Environment for SimEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng().fill_bytes(buffer);
    }
}
