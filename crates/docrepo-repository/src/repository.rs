use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use docrepo_store::{Document, DocumentStore, Filter, FindOptions, IndexSpec, WriteConcern};
use docrepo_types::{Entity, DELETED_FIELD, ID_FIELD, NAME_FIELD};

use crate::error::{RepositoryError, RepositoryResult};
use crate::id::{IdGenerator, IdStrategy, MAX_SHORT_ID_ATTEMPTS};

/// Behaviour shared by every repository of one façade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryOptions {
    /// Physically remove documents on delete instead of marking them.
    pub delete_forever: bool,
    pub id_strategy: IdStrategy,
    /// Length of [`IdStrategy::ShortString`] ids.
    pub id_length: u16,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            delete_forever: false,
            id_strategy: IdStrategy::ObjectId,
            id_length: 5,
        }
    }
}

/// Typed access to the collection of entity type `T`.
///
/// Reads never return soft-deleted documents. Ids are assigned at creation
/// by the configured [`IdStrategy`] and never changed afterwards.
pub struct Repository<T: Entity> {
    store: Arc<dyn DocumentStore>,
    options: RepositoryOptions,
    collection: String,
    ids: IdGenerator,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("collection", &self.collection)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn to_document<T: Entity>(entity: &T, collection: &str) -> RepositoryResult<Document> {
    match serde_json::to_value(entity)? {
        Value::Object(doc) => Ok(doc),
        other => Err(RepositoryError::Serialization(format!(
            "{collection}: entity serialized to {other}, expected an object"
        ))),
    }
}

fn from_document<T: Entity>(doc: Document) -> RepositoryResult<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

fn not_deleted(filter: Option<Filter>) -> Filter {
    let visible = Filter::exists(DELETED_FIELD, false);
    match filter {
        Some(filter) => filter.and(visible),
        None => visible,
    }
}

impl<T: Entity> Repository<T> {
    /// Open the repository on `store`: ensure the name index and, for
    /// sequential ids, seed the counter.
    #[instrument(skip(store), fields(collection = %T::collection_name()))]
    pub async fn open(
        store: Arc<dyn DocumentStore>,
        options: RepositoryOptions,
    ) -> RepositoryResult<Self> {
        let collection = T::collection_name();
        store
            .create_index(
                &collection,
                IndexSpec::ascending(format!("{collection}_{NAME_FIELD}"), NAME_FIELD),
            )
            .await?;
        let ids =
            IdGenerator::open(options.id_strategy, options.id_length, store.as_ref(), &collection)
                .await?;
        debug!(strategy = ?options.id_strategy, "repository opened");
        Ok(Self {
            store,
            options,
            collection,
            ids,
            _entity: PhantomData,
        })
    }

    /// Swap in a generator, e.g. one with a shorter counter lock bound.
    pub fn with_id_generator(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }

    /// All visible documents matching `filter`, in store order.
    pub async fn find_all(&self, filter: Option<Filter>) -> RepositoryResult<Vec<T>> {
        self.store
            .find(&self.collection, &not_deleted(filter), FindOptions::default())
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// First visible document matching `filter`.
    pub async fn find(&self, filter: Option<Filter>) -> RepositoryResult<Option<T>> {
        self.store
            .find_one(&self.collection, &not_deleted(filter))
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<T>> {
        self.find(Some(Filter::eq(ID_FIELD, id))).await
    }

    /// Number of visible documents matching `filter`.
    pub async fn count(&self, filter: Option<Filter>) -> RepositoryResult<u64> {
        Ok(self.store.count(&self.collection, &not_deleted(filter)).await?)
    }

    /// Assign a fresh id to `entity` and insert it.
    #[instrument(skip(self, entity), fields(collection = %self.collection))]
    pub async fn create(&self, mut entity: T) -> RepositoryResult<T> {
        let retries = self.options.id_strategy.retries_on_collision();
        let mut attempt = 0;
        loop {
            attempt += 1;
            entity.set_id(self.new_id().await?);
            let doc = to_document(&entity, &self.collection)?;
            match self
                .store
                .insert_one(&self.collection, doc, WriteConcern::default())
                .await
            {
                Ok(()) => return Ok(entity),
                Err(e) if retries && e.is_duplicate_of(ID_FIELD) => {
                    if attempt >= MAX_SHORT_ID_ATTEMPTS {
                        warn!(attempt, "giving up on colliding ids");
                        return Err(e.into());
                    }
                    debug!(attempt, id = entity.id(), "id taken at insert, redrawing");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Assign fresh ids to every entity and insert them as one ordered batch.
    pub async fn create_many(&self, entities: Vec<T>) -> RepositoryResult<Vec<T>> {
        let mut created = Vec::with_capacity(entities.len());
        let mut docs = Vec::with_capacity(entities.len());
        for mut entity in entities {
            entity.set_id(self.new_id().await?);
            docs.push(to_document(&entity, &self.collection)?);
            created.push(entity);
        }
        self.store
            .insert_many(&self.collection, docs, WriteConcern::default())
            .await?;
        Ok(created)
    }

    /// Replace the stored document with the same id.
    pub async fn update(&self, entity: T) -> RepositoryResult<T> {
        if entity.id().is_empty() {
            return Err(RepositoryError::MissingId {
                collection: self.collection.clone(),
            });
        }
        let doc = to_document(&entity, &self.collection)?;
        let outcome = self
            .store
            .replace_one(&self.collection, &Filter::eq(ID_FIELD, entity.id()), doc, false)
            .await?;
        if !outcome.touched() {
            return Err(RepositoryError::NotFound {
                collection: self.collection.clone(),
                id: entity.id().to_string(),
            });
        }
        Ok(entity)
    }

    /// Replace the stored document with the same id, inserting it when
    /// absent. An empty id is assigned first.
    pub async fn create_or_update(&self, mut entity: T) -> RepositoryResult<T> {
        if entity.id().is_empty() {
            entity.set_id(self.new_id().await?);
        }
        let doc = to_document(&entity, &self.collection)?;
        self.store
            .replace_one(&self.collection, &Filter::eq(ID_FIELD, entity.id()), doc, true)
            .await?;
        Ok(entity)
    }

    /// Remove `entity`: physically when `delete_forever` is set, otherwise by
    /// marking it deleted.
    pub async fn delete(&self, entity: &T) -> RepositoryResult<()> {
        if entity.id().is_empty() {
            return Err(RepositoryError::MissingId {
                collection: self.collection.clone(),
            });
        }
        let by_id = Filter::eq(ID_FIELD, entity.id());
        if self.options.delete_forever {
            let removed = self.store.delete_one(&self.collection, &by_id).await?;
            debug!(collection = %self.collection, id = entity.id(), removed, "hard delete");
        } else {
            self.store
                .update_one(&self.collection, &by_id, DELETED_FIELD, Value::Bool(true), true)
                .await?;
            debug!(collection = %self.collection, id = entity.id(), "soft delete");
        }
        Ok(())
    }

    /// Draw an id from this collection's generator.
    pub async fn new_id(&self) -> RepositoryResult<String> {
        Ok(self.ids.next_id(self.store.as_ref()).await?)
    }

    /// The underlying store handle.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }
}
