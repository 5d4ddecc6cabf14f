/// Creation options for a collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectionOptions {
    /// Maximum total size in bytes. `Some` makes the collection capped:
    /// insertion-ordered, with the oldest documents evicted once full.
    pub capped_size: Option<u64>,
}

impl CollectionOptions {
    pub fn capped(max_bytes: u64) -> Self {
        Self {
            capped_size: Some(max_bytes),
        }
    }
}

/// Ascending single-field index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub field: String,
    pub unique: bool,
}

impl IndexSpec {
    pub fn ascending(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Acknowledgment level requested for a write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WriteConcern {
    /// Fire and forget.
    Unacknowledged,
    /// Primary acknowledgment only (`w: 1`).
    Acknowledged,
    /// Acknowledged by a majority of the replica set.
    #[default]
    Majority,
}

/// Result of a replace or single-field update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
    /// Identifier of the document inserted by an upsert, if any.
    pub upserted_id: Option<String>,
}

impl UpdateOutcome {
    /// Returns `true` if a document was matched or inserted.
    pub fn touched(&self) -> bool {
        self.matched > 0 || self.upserted_id.is_some()
    }
}
