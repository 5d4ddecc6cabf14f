/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A write would create a second document with the same unique key.
    #[error("duplicate key in {collection}: {field} = {value}")]
    DuplicateKey {
        collection: String,
        field: String,
        value: String,
    },

    /// `create_collection` was called for a name that already exists.
    #[error("collection already exists: {0}")]
    CollectionExists(String),

    /// The document shape is not acceptable to the store.
    #[error("invalid document in {collection}: {reason}")]
    InvalidDocument { collection: String, reason: String },

    /// Connecting to or opening the backend failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Any other backend failure.
    #[error("store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Returns `true` if this is a uniqueness violation on `field`.
    pub fn is_duplicate_of(&self, field: &str) -> bool {
        matches!(self, StoreError::DuplicateKey { field: f, .. } if f == field)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
