use std::sync::Arc;

use async_trait::async_trait;
use docrepo_types::ObjectId;
use serde_json::Value;

use crate::error::StoreResult;
use crate::filter::{Document, Filter, FindOptions};
use crate::options::{CollectionOptions, IndexSpec, UpdateOutcome, WriteConcern};

/// Entry point to a document store deployment.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    /// Connect to `connection` and return a handle to database `name`.
    ///
    /// Handles for the same database share state: data written through one is
    /// visible through every other.
    async fn open_database(
        &self,
        connection: &str,
        name: &str,
    ) -> StoreResult<Arc<dyn DocumentStore>>;
}

/// One database of a document store.
///
/// Implementations must satisfy these invariants:
/// - `_id` is unique within a collection; inserting or upserting a second
///   document with the same `_id` fails with `StoreError::DuplicateKey`.
/// - Unique indexes are enforced the same way on their field.
/// - Collections spring into existence on first write.
/// - Documents keep their natural (insertion) position when replaced.
/// - All failures are propagated, never silently ignored.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name of the database this handle addresses.
    fn database_name(&self) -> &str;

    /// Explicitly create a collection. Fails if it already exists.
    async fn create_collection(&self, name: &str, options: CollectionOptions) -> StoreResult<()>;

    /// Names of all existing collections, sorted.
    async fn list_collection_names(&self) -> StoreResult<Vec<String>>;

    /// Whether a collection with this name exists.
    async fn collection_exists(&self, name: &str) -> StoreResult<bool> {
        Ok(self
            .list_collection_names()
            .await?
            .iter()
            .any(|existing| existing == name))
    }

    /// Remove every collection of this database.
    async fn drop_database(&self) -> StoreResult<()>;

    async fn insert_one(
        &self,
        collection: &str,
        doc: Document,
        concern: WriteConcern,
    ) -> StoreResult<()>;

    /// Ordered batch insert: stops at the first failure, keeping the
    /// documents inserted before it.
    async fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
        concern: WriteConcern,
    ) -> StoreResult<()>;

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>>;

    /// First document matching `filter` in natural order.
    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        Ok(self
            .find(collection, filter, FindOptions::default().limit(1))
            .await?
            .into_iter()
            .next())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    /// Replace the first match with `doc`; insert it when nothing matches and
    /// `upsert` is set.
    async fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        doc: Document,
        upsert: bool,
    ) -> StoreResult<UpdateOutcome>;

    /// Set `field` to `value` on the first match; when nothing matches and
    /// `upsert` is set, insert a document built from the filter's equality
    /// terms plus the field.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        field: &str,
        value: Value,
        upsert: bool,
    ) -> StoreResult<UpdateOutcome>;

    /// Delete the first match. Returns the number of documents removed.
    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    /// Create an index. Creating an index that already exists is a no-op.
    async fn create_index(&self, collection: &str, index: IndexSpec) -> StoreResult<()>;

    /// A natively unique identifier.
    fn new_object_id(&self) -> ObjectId {
        ObjectId::new()
    }
}
