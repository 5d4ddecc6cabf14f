use std::time::Duration;

use docrepo_store::StoreError;

/// Errors from document id generation.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Short string ids must be between 1 and `max` characters.
    #[error("id length {length} out of range 1..={max}")]
    LengthOutOfRange { length: u16, max: u16 },

    /// Every attempt drew an id already present in the collection.
    #[error("no free id in {collection} after {attempts} attempts")]
    Exhausted { collection: String, attempts: u32 },

    /// The sequential counter lock was not acquired in time.
    #[error("id counter for {collection} not acquired within {waited:?}")]
    LockTimeout { collection: String, waited: Duration },

    /// Every integer id up to `i64::MAX` has been handed out.
    #[error("sequential ids exhausted in {collection}")]
    CounterOverflow { collection: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result alias for id generation.
pub type IdResult<T> = Result<T, IdError>;

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// No document with this id exists (update target missing).
    #[error("document not found in {collection}: {id}")]
    NotFound { collection: String, id: String },

    /// The operation needs a persisted entity but its id is empty.
    #[error("entity in {collection} has no id")]
    MissingId { collection: String },

    /// The store rejected a write as a uniqueness violation.
    #[error("conflict in {collection}: {field} = {value} already exists")]
    Conflict {
        collection: String,
        field: String,
        value: String,
    },

    #[error("id generation failed: {0}")]
    Id(#[from] IdError),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<StoreError> for RepositoryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateKey {
                collection,
                field,
                value,
            } => RepositoryError::Conflict {
                collection,
                field,
                value,
            },
            other => RepositoryError::Store(other),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(e: serde_json::Error) -> Self {
        RepositoryError::Serialization(e.to_string())
    }
}

/// Result alias for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;
