use std::time::Duration;

use thiserror::Error;

use docrepo_repository::{IdError, RepositoryError};
use docrepo_store::StoreError;

#[derive(Debug, Error)]
pub enum DbError {
    /// One-time configuration did not finish within the configured bound.
    #[error("configuration did not complete within {0:?}")]
    ConfigurationTimeout(Duration),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A startup procedure's action failed; its record was not marked done.
    #[error("procedure {id} failed: {source}")]
    Procedure {
        id: i64,
        #[source]
        source: anyhow::Error,
    },

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<IdError> for DbError {
    fn from(e: IdError) -> Self {
        DbError::Repository(RepositoryError::Id(e))
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
