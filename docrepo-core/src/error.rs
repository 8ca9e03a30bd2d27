//! Error types and result types for repository operations.
//!
//! Use [`RepositoryResult<T>`] as the return type for fallible operations. A lookup
//! that finds nothing is not an error: it is reported as `None` or an empty `Vec`.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when working with a repository.
///
/// Store failures are propagated unchanged. The repository never retries and never
/// recovers silently.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Serialization/deserialization error when converting between entities and records.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during backend initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The store rejected a payload (missing or mistyped field).
    #[error("Validation error: {0}")]
    Validation(String),
    /// An operation was invoked on a collection that has no bound model,
    /// or on a repository whose session was closed.
    #[error("Repository for collection {0} is not bound")]
    UnboundRepository(String),
    /// A model was bound twice for the same collection.
    #[error("Model already bound for collection {0}")]
    ModelAlreadyBound(String),
    /// The schema handed to `bind_model` is malformed.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    /// A dynamic query value could not be classified as exactly one lookup shape.
    #[error("Ambiguous query shape: {0}")]
    AmbiguousQueryShape(String),
    /// A filter, range or sort is malformed.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// A record or payload does not have the expected structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<BsonError> for RepositoryError {
    fn from(err: BsonError) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for RepositoryError {
    fn from(err: SerdeJsonError) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
