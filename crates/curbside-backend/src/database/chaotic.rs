//! Chaotic database wrapper for fault injection testing
//!
//! Randomly fails reads and writes so that sessions and the gateway can be
//! exercised against an unreliable backend. Watch and query registration is
//! never failed; dropped connections surface as failed operations instead.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{Arc, Mutex};

use curbside_core::{Coordinate, Document};

use super::{Change, Collection, Database, DatabaseError, DocPath, GeoEvent};
use crate::Subscription;

/// Database wrapper that randomly injects [`DatabaseError::Io`] failures
///
/// Delegates to an underlying database. Failures are drawn from a seeded LCG
/// so that a chaos run is reproducible.
#[derive(Clone)]
pub struct ChaoticDatabase<D: Database> {
    inner: D,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    rng: Arc<Mutex<ChaoticRng>>,
    injected: Arc<Mutex<usize>>,
}

/// Linear congruential generator for reproducible chaos
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // LCG constants from Numerical Recipes
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<D: Database> ChaoticDatabase<D> {
    /// Wrap `inner` with a fixed default seed.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: D, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Wrap `inner` with an explicit seed.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    #[allow(clippy::panic)]
    pub fn with_seed(inner: D, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            injected: Arc::new(Mutex::new(0)),
        }
    }

    /// Underlying database (for checking invariants after chaos).
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Number of failures injected so far.
    pub fn injected_failures(&self) -> usize {
        self.injected.lock().map(|n| *n).unwrap_or(0)
    }

    fn chaos(&self, operation: &str) -> Result<(), DatabaseError> {
        let fail = self.rng.lock()?.next() < self.failure_rate;
        if !fail {
            return Ok(());
        }

        *self.injected.lock()? += 1;
        tracing::debug!(operation, "injecting database failure");
        Err(DatabaseError::Io("chaotic failure injection".to_string()))
    }
}

impl<D: Database> Database for ChaoticDatabase<D> {
    fn get(&self, path: &DocPath) -> Result<Option<Document>, DatabaseError> {
        self.chaos("get")?;
        self.inner.get(path)
    }

    fn set(&self, path: &DocPath, document: Document) -> Result<(), DatabaseError> {
        self.chaos("set")?;
        self.inner.set(path, document)
    }

    fn update(&self, path: &DocPath, fields: Vec<(String, Document)>) -> Result<(), DatabaseError> {
        self.chaos("update")?;
        self.inner.update(path, fields)
    }

    fn remove(&self, path: &DocPath) -> Result<bool, DatabaseError> {
        self.chaos("remove")?;
        self.inner.remove(path)
    }

    fn transact<F, E>(&self, path: &DocPath, apply: F) -> Result<Document, E>
    where
        F: FnOnce(Option<&Document>) -> Result<Document, E>,
        E: From<DatabaseError>,
    {
        self.chaos("transact")?;
        self.inner.transact(path, apply)
    }

    fn watch<T, F>(&self, collection: Collection, filter: F) -> Result<Subscription<T>, DatabaseError>
    where
        T: Send + 'static,
        F: FnMut(&Change) -> Option<T> + Send + 'static,
    {
        self.inner.watch(collection, filter)
    }

    fn set_location(&self, key: &str, location: Coordinate) -> Result<(), DatabaseError> {
        self.chaos("set_location")?;
        self.inner.set_location(key, location)
    }

    fn remove_location(&self, key: &str) -> Result<bool, DatabaseError> {
        self.chaos("remove_location")?;
        self.inner.remove_location(key)
    }

    fn location(&self, key: &str) -> Result<Option<Coordinate>, DatabaseError> {
        self.chaos("location")?;
        self.inner.location(key)
    }

    fn query_radius<T, F>(
        &self,
        center: Coordinate,
        radius_m: f64,
        filter: F,
    ) -> Result<Subscription<T>, DatabaseError>
    where
        T: Send + 'static,
        F: FnMut(&GeoEvent) -> Option<T> + Send + 'static,
    {
        self.inner.query_radius(center, radius_m, filter)
    }
}
