//! Database error types

use thiserror::Error;

/// Errors that can occur during database operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    /// Backend unreachable or the write was rejected
    #[error("I/O error: {0}")]
    Io(String),

    /// Shared state was poisoned by a panicking writer
    #[error("database state poisoned")]
    Poisoned,
}

impl DatabaseError {
    /// Retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl<T> From<std::sync::PoisonError<T>> for DatabaseError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::Poisoned
    }
}
