//! Error types for the pandora-store crate.
//!
//! All storage operations return [`StoreError`] via [`StoreResult`].
//! Any error raised inside a write transaction means the transaction was
//! dropped without committing, so callers never see partial state.

use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the storage engine.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An invalid argument was provided to a store operation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested record was not found.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A create collided with an existing record. `id` is the existing one.
    #[error("{entity} already exists: {key} (id {id})")]
    AlreadyExists {
        entity: &'static str,
        key: String,
        id: u64,
    },

    /// A trigger rename collided with a trigger owned by another factoid.
    #[error("trigger {trigger:?} already belongs to factoid {id}")]
    Conflict { trigger: String, id: u64 },

    /// Stored bytes are corrupt or structurally incompatible.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The engine could not be opened or a transaction could not begin.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// An index-based response query went past the available matches.
    #[error("response index {index} out of range ({count} available)")]
    OutOfRange { index: u64, count: u64 },

    /// A table, read, write or commit failed inside a transaction.
    #[error("engine error: {0}")]
    Engine(String),
}

impl StoreError {
    /// Shorthand for a [`StoreError::NotFound`] keyed by a numeric id.
    pub(crate) fn not_found(entity: &'static str, id: u64) -> Self {
        Self::NotFound {
            entity,
            key: id.to_string(),
        }
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<redb::DatabaseError> for StoreError {
    fn from(err: redb::DatabaseError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(err: redb::TransactionError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<redb::TableError> for StoreError {
    fn from(err: redb::TableError) -> Self {
        Self::Engine(err.to_string())
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(err: redb::StorageError) -> Self {
        Self::Engine(err.to_string())
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(err: redb::CommitError) -> Self {
        Self::Engine(err.to_string())
    }
}
