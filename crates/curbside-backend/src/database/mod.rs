//! Realtime database abstraction
//!
//! Two collections of key-value documents (`users`, `trips`) plus a geo index
//! of driver locations. Every write is visible to later reads and to every
//! registered watcher. Watchers are push-based: the store calls a filter-map
//! closure with each change and forwards what it returns to a
//! [`Subscription`].
//!
//! The trait is synchronous. Async callers wait on the returned
//! subscriptions, not on the operations themselves.

mod chaotic;
mod error;
mod memory;

pub use chaotic::ChaoticDatabase;
use curbside_core::{Coordinate, Document};
pub use error::DatabaseError;
pub use memory::MemoryDatabase;

use crate::Subscription;

/// Top-level document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    /// `users/{uid}`
    Users,
    /// `trips/{passengerUid}`
    Trips,
}

impl Collection {
    /// Path segment of the collection.
    pub fn name(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Trips => "trips",
        }
    }
}

/// Address of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    /// Owning collection
    pub collection: Collection,
    /// Document key
    pub key: String,
}

impl DocPath {
    /// `users/{uid}`
    pub fn user(uid: impl Into<String>) -> Self {
        Self { collection: Collection::Users, key: uid.into() }
    }

    /// `trips/{passengerUid}`
    pub fn trip(passenger_uid: impl Into<String>) -> Self {
        Self { collection: Collection::Trips, key: passenger_uid.into() }
    }
}

impl std::fmt::Display for DocPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection.name(), self.key)
    }
}

/// How a document changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Document appeared (or existed when the watch started)
    Added,
    /// Existing document was overwritten or merged
    Changed,
    /// Document was deleted
    Removed,
}

/// A document change delivered to collection watchers.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// Document key within the watched collection
    pub key: String,
    /// Kind of change
    pub kind: ChangeKind,
    /// New contents, or the last contents for [`ChangeKind::Removed`]
    pub document: Document,
}

/// Geo query notifications, relative to one query circle.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoEvent {
    /// Key is now inside the circle (or was when the query started)
    Entered {
        /// Indexed key
        key: String,
        /// Its location
        location: Coordinate,
    },
    /// Key moved and is still inside
    Moved {
        /// Indexed key
        key: String,
        /// Its new location
        location: Coordinate,
    },
    /// Key left the circle or was removed from the index
    Exited {
        /// Indexed key
        key: String,
    },
}

impl GeoEvent {
    /// Indexed key this event is about.
    pub fn key(&self) -> &str {
        match self {
            Self::Entered { key, .. } | Self::Moved { key, .. } | Self::Exited { key } => key,
        }
    }
}

/// Realtime document store with a geo index
///
/// Must be Clone (sessions on one device share a handle), Send + Sync, and
/// synchronous. Implementations share internal state, so clones see the same
/// documents and watchers.
///
/// # Invariants
///
/// - A successful write is visible to every subsequent read
/// - Watchers see changes in write order
/// - [`Database::transact`] is atomic with respect to all other writes on the
///   same path
pub trait Database: Clone + Send + Sync + 'static {
    /// Current contents of a document. `None` if absent.
    fn get(&self, path: &DocPath) -> Result<Option<Document>, DatabaseError>;

    /// Replace a document.
    fn set(&self, path: &DocPath, document: Document) -> Result<(), DatabaseError>;

    /// Merge fields into a document, creating it if absent. Fields not named
    /// are kept.
    fn update(&self, path: &DocPath, fields: Vec<(String, Document)>) -> Result<(), DatabaseError>;

    /// Delete a document. Returns whether it existed.
    fn remove(&self, path: &DocPath) -> Result<bool, DatabaseError>;

    /// Atomic read-modify-write of one document.
    ///
    /// `apply` sees the current contents and returns the replacement. If it
    /// returns an error the document is left untouched and the error is
    /// passed through.
    fn transact<F, E>(&self, path: &DocPath, apply: F) -> Result<Document, E>
    where
        F: FnOnce(Option<&Document>) -> Result<Document, E>,
        E: From<DatabaseError>;

    /// Watch every change in a collection.
    ///
    /// Existing documents are delivered first as [`ChangeKind::Added`].
    /// `filter` maps each change to an item, or `None` to skip it.
    fn watch<T, F>(&self, collection: Collection, filter: F) -> Result<Subscription<T>, DatabaseError>
    where
        T: Send + 'static,
        F: FnMut(&Change) -> Option<T> + Send + 'static;

    /// Set or move a key in the geo index.
    fn set_location(&self, key: &str, location: Coordinate) -> Result<(), DatabaseError>;

    /// Remove a key from the geo index. Returns whether it was indexed.
    fn remove_location(&self, key: &str) -> Result<bool, DatabaseError>;

    /// Indexed location of a key.
    fn location(&self, key: &str) -> Result<Option<Coordinate>, DatabaseError>;

    /// Continuous radius query over the geo index.
    ///
    /// Keys already inside are delivered first as [`GeoEvent::Entered`].
    fn query_radius<T, F>(
        &self,
        center: Coordinate,
        radius_m: f64,
        filter: F,
    ) -> Result<Subscription<T>, DatabaseError>
    where
        T: Send + 'static,
        F: FnMut(&GeoEvent) -> Option<T> + Send + 'static;
}
