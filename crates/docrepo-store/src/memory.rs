use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use docrepo_types::{ObjectId, ID_FIELD};

use crate::error::{StoreError, StoreResult};
use crate::filter::{compare_for_sort, lookup, Document, Filter, FindOptions, Sort};
use crate::options::{CollectionOptions, IndexSpec, UpdateOutcome, WriteConcern};
use crate::traits::{DocumentClient, DocumentStore};

/// In-memory [`DocumentClient`].
///
/// Accepts any connection string of the form `scheme://...` and hands out one
/// shared [`InMemoryDatabase`] per database name, so two façades opened on
/// the same client see the same data, like two processes on one server.
#[derive(Debug, Default)]
pub struct InMemoryClient {
    databases: RwLock<HashMap<String, Arc<InMemoryDatabase>>>,
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the databases opened so far, sorted.
    pub fn database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .databases
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl DocumentClient for InMemoryClient {
    async fn open_database(
        &self,
        connection: &str,
        name: &str,
    ) -> StoreResult<Arc<dyn DocumentStore>> {
        if !connection.contains("://") {
            return Err(StoreError::Connection(format!(
                "invalid connection string: {connection:?}"
            )));
        }
        if name.is_empty() {
            return Err(StoreError::Connection("database name is empty".into()));
        }
        let mut databases = self.databases.write().expect("lock poisoned");
        let db = databases
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(InMemoryDatabase::new(name)))
            .clone();
        debug!(connection, database = name, "opened in-memory database");
        Ok(db)
    }
}

/// In-memory, HashMap-based [`DocumentStore`].
///
/// Intended for tests and embedding. Collections live behind one `RwLock`;
/// documents are cloned on read and write.
pub struct InMemoryDatabase {
    name: String,
    collections: RwLock<HashMap<String, Collection>>,
}

#[derive(Default)]
struct Collection {
    /// Natural order: insertion sequence -> (document, serialized size).
    docs: BTreeMap<u64, (Document, u64)>,
    /// Canonical `_id` -> insertion sequence.
    ids: HashMap<String, u64>,
    next_seq: u64,
    bytes: u64,
    capped_size: Option<u64>,
    indexes: Vec<IndexSpec>,
}

fn id_key(value: &Value) -> String {
    value.to_string()
}

fn document_size(doc: &Document) -> StoreResult<u64> {
    Ok(serde_json::to_vec(doc)?.len() as u64)
}

/// Set a possibly dotted path, creating intermediate objects.
fn set_path(doc: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(inner) = child {
                set_path(inner, rest, value);
            }
        }
    }
}

impl Collection {
    fn duplicate(name: &str, field: &str, value: &Value) -> StoreError {
        StoreError::DuplicateKey {
            collection: name.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    fn check_unique(&self, name: &str, doc: &Document, skip: Option<u64>) -> StoreResult<()> {
        if let Some(id) = doc.get(ID_FIELD) {
            if let Some(&seq) = self.ids.get(&id_key(id)) {
                if Some(seq) != skip {
                    return Err(Self::duplicate(name, ID_FIELD, id));
                }
            }
        }
        for index in self.indexes.iter().filter(|i| i.unique) {
            let Some(value) = lookup(doc, &index.field) else {
                continue;
            };
            let probe = Filter::Eq(index.field.clone(), value.clone());
            let clash = self
                .docs
                .iter()
                .any(|(seq, (other, _))| Some(*seq) != skip && probe.matches(other));
            if clash {
                return Err(Self::duplicate(name, &index.field, value));
            }
        }
        Ok(())
    }

    fn insert(&mut self, name: &str, mut doc: Document) -> StoreResult<String> {
        let id = doc
            .entry(ID_FIELD.to_string())
            .or_insert_with(|| Value::String(ObjectId::new().to_hex()))
            .clone();
        self.check_unique(name, &doc, None)?;
        let size = document_size(&doc)?;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.docs.insert(seq, (doc, size));
        self.ids.insert(id_key(&id), seq);
        self.bytes += size;
        self.evict(name);
        Ok(match id {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    fn evict(&mut self, name: &str) {
        let Some(cap) = self.capped_size else {
            return;
        };
        let mut evicted = 0usize;
        while self.bytes > cap && self.docs.len() > 1 {
            if let Some((_, (doc, size))) = self.docs.pop_first() {
                if let Some(id) = doc.get(ID_FIELD) {
                    self.ids.remove(&id_key(id));
                }
                self.bytes -= size;
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!(collection = name, evicted, "capped collection evicted oldest documents");
        }
    }

    fn first_match(&self, filter: &Filter) -> Option<u64> {
        self.docs
            .iter()
            .find(|(_, (doc, _))| filter.matches(doc))
            .map(|(seq, _)| *seq)
    }

    /// Overwrite the document at `seq`, keeping its natural position.
    fn overwrite(&mut self, name: &str, seq: u64, doc: Document) -> StoreResult<bool> {
        self.check_unique(name, &doc, Some(seq))?;
        let size = document_size(&doc)?;
        let Some(slot) = self.docs.get_mut(&seq) else {
            return Ok(false);
        };
        let changed = slot.0 != doc;
        self.bytes = self.bytes - slot.1 + size;
        *slot = (doc, size);
        Ok(changed)
    }

    fn remove(&mut self, seq: u64) -> bool {
        match self.docs.remove(&seq) {
            Some((doc, size)) => {
                if let Some(id) = doc.get(ID_FIELD) {
                    self.ids.remove(&id_key(id));
                }
                self.bytes -= size;
                true
            }
            None => false,
        }
    }
}

impl InMemoryDatabase {
    /// Create a new empty database.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Number of documents in a collection (deleted-marked ones included).
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .expect("lock poisoned")
            .get(collection)
            .map_or(0, |c| c.docs.len())
    }

    /// Returns `true` if the collection holds no documents.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Serialized bytes currently held by a collection.
    pub fn total_bytes(&self, collection: &str) -> u64 {
        self.collections
            .read()
            .expect("lock poisoned")
            .get(collection)
            .map_or(0, |c| c.bytes)
    }

    /// Indexes defined on a collection.
    pub fn indexes(&self, collection: &str) -> Vec<IndexSpec> {
        self.collections
            .read()
            .expect("lock poisoned")
            .get(collection)
            .map(|c| c.indexes.clone())
            .unwrap_or_default()
    }

    /// Capacity of a capped collection, `None` if uncapped or missing.
    pub fn capped_size(&self, collection: &str) -> Option<u64> {
        self.collections
            .read()
            .expect("lock poisoned")
            .get(collection)
            .and_then(|c| c.capped_size)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDatabase {
    fn database_name(&self) -> &str {
        &self.name
    }

    async fn create_collection(&self, name: &str, options: CollectionOptions) -> StoreResult<()> {
        let mut collections = self.collections.write().expect("lock poisoned");
        if collections.contains_key(name) {
            return Err(StoreError::CollectionExists(name.to_string()));
        }
        collections.insert(
            name.to_string(),
            Collection {
                capped_size: options.capped_size,
                ..Collection::default()
            },
        );
        debug!(database = %self.name, collection = name, capped = ?options.capped_size, "collection created");
        Ok(())
    }

    async fn list_collection_names(&self) -> StoreResult<Vec<String>> {
        let collections = self.collections.read().expect("lock poisoned");
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn drop_database(&self) -> StoreResult<()> {
        self.collections.write().expect("lock poisoned").clear();
        debug!(database = %self.name, "database dropped");
        Ok(())
    }

    async fn insert_one(
        &self,
        collection: &str,
        doc: Document,
        concern: WriteConcern,
    ) -> StoreResult<()> {
        let mut collections = self.collections.write().expect("lock poisoned");
        let coll = collections.entry(collection.to_string()).or_default();
        let id = coll.insert(collection, doc)?;
        trace!(collection, %id, ?concern, "inserted document");
        Ok(())
    }

    async fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
        concern: WriteConcern,
    ) -> StoreResult<()> {
        let mut collections = self.collections.write().expect("lock poisoned");
        let coll = collections.entry(collection.to_string()).or_default();
        let count = docs.len();
        for doc in docs {
            coll.insert(collection, doc)?;
        }
        trace!(collection, count, ?concern, "inserted documents");
        Ok(())
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().expect("lock poisoned");
        let Some(coll) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut matched: Vec<Document> = coll
            .docs
            .values()
            .filter(|(doc, _)| filter.matches(doc))
            .map(|(doc, _)| doc.clone())
            .collect();
        drop(collections);

        match &options.sort {
            None | Some(Sort::Natural) => {}
            Some(Sort::NaturalDescending) => matched.reverse(),
            Some(Sort::Ascending(field)) => {
                matched.sort_by(|a, b| compare_for_sort(lookup(a, field), lookup(b, field)))
            }
            Some(Sort::Descending(field)) => {
                matched.sort_by(|a, b| compare_for_sort(lookup(b, field), lookup(a, field)))
            }
        }

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(matched.into_iter().skip(skip).take(limit).collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let collections = self.collections.read().expect("lock poisoned");
        Ok(collections.get(collection).map_or(0, |coll| {
            coll.docs.values().filter(|(doc, _)| filter.matches(doc)).count() as u64
        }))
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        mut doc: Document,
        upsert: bool,
    ) -> StoreResult<UpdateOutcome> {
        let mut collections = self.collections.write().expect("lock poisoned");
        let coll = collections.entry(collection.to_string()).or_default();

        if let Some(seq) = coll.first_match(filter) {
            let existing_id = coll.docs[&seq].0.get(ID_FIELD).cloned();
            let new_id = doc.get(ID_FIELD).cloned();
            match (new_id, existing_id) {
                (Some(new), Some(old)) if new != old => {
                    return Err(StoreError::InvalidDocument {
                        collection: collection.to_string(),
                        reason: format!("_id is immutable ({old} -> {new})"),
                    });
                }
                (None, Some(old)) => {
                    doc.insert(ID_FIELD.to_string(), old);
                }
                _ => {}
            }
            let changed = coll.overwrite(collection, seq, doc)?;
            return Ok(UpdateOutcome {
                matched: 1,
                modified: u64::from(changed),
                upserted_id: None,
            });
        }

        if !upsert {
            return Ok(UpdateOutcome::default());
        }
        if !doc.contains_key(ID_FIELD) {
            if let Some((_, id)) = filter.equalities().into_iter().find(|(f, _)| *f == ID_FIELD) {
                doc.insert(ID_FIELD.to_string(), id.clone());
            }
        }
        let id = coll.insert(collection, doc)?;
        Ok(UpdateOutcome {
            matched: 0,
            modified: 0,
            upserted_id: Some(id),
        })
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        field: &str,
        value: Value,
        upsert: bool,
    ) -> StoreResult<UpdateOutcome> {
        if field == ID_FIELD {
            return Err(StoreError::InvalidDocument {
                collection: collection.to_string(),
                reason: "_id is immutable".into(),
            });
        }
        let mut collections = self.collections.write().expect("lock poisoned");
        let coll = collections.entry(collection.to_string()).or_default();

        if let Some(seq) = coll.first_match(filter) {
            let mut doc = coll.docs[&seq].0.clone();
            set_path(&mut doc, field, value);
            let changed = coll.overwrite(collection, seq, doc)?;
            return Ok(UpdateOutcome {
                matched: 1,
                modified: u64::from(changed),
                upserted_id: None,
            });
        }

        if !upsert {
            return Ok(UpdateOutcome::default());
        }
        let mut doc = Document::new();
        for (f, v) in filter.equalities() {
            set_path(&mut doc, f, v.clone());
        }
        set_path(&mut doc, field, value);
        let id = coll.insert(collection, doc)?;
        Ok(UpdateOutcome {
            matched: 0,
            modified: 0,
            upserted_id: Some(id),
        })
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let mut collections = self.collections.write().expect("lock poisoned");
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(0);
        };
        Ok(match coll.first_match(filter) {
            Some(seq) => u64::from(coll.remove(seq)),
            None => 0,
        })
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> StoreResult<()> {
        let mut collections = self.collections.write().expect("lock poisoned");
        let coll = collections.entry(collection.to_string()).or_default();
        if coll.indexes.iter().any(|i| i.name == index.name) {
            return Ok(());
        }
        if index.unique {
            let docs: Vec<&Document> = coll.docs.values().map(|(doc, _)| doc).collect();
            for (i, doc) in docs.iter().enumerate() {
                let Some(value) = lookup(doc, &index.field) else {
                    continue;
                };
                let probe = Filter::Eq(index.field.clone(), value.clone());
                if docs[i + 1..].iter().any(|other| probe.matches(other)) {
                    return Err(Collection::duplicate(collection, &index.field, value));
                }
            }
        }
        debug!(collection, index = %index.name, field = %index.field, unique = index.unique, "index created");
        coll.indexes.push(index);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.collections.read().expect("lock poisoned").len();
        f.debug_struct("InMemoryDatabase")
            .field("name", &self.name)
            .field("collection_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    async fn ids(db: &InMemoryDatabase, coll: &str, options: FindOptions) -> Vec<Value> {
        db.find(coll, &Filter::All, options)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d[ID_FIELD].clone())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Client
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn client_shares_database_by_name() {
        let client = InMemoryClient::new();
        let a = client.open_database("memory://local", "app").await.unwrap();
        let b = client.open_database("memory://local", "app").await.unwrap();
        a.insert_one("Things", doc(json!({ "_id": "1" })), WriteConcern::default())
            .await
            .unwrap();
        assert_eq!(b.count("Things", &Filter::All).await.unwrap(), 1);
        assert_eq!(client.database_names(), vec!["app".to_string()]);
    }

    #[tokio::test]
    async fn client_rejects_malformed_connection() {
        let client = InMemoryClient::new();
        let err = client.open_database("localhost", "app").await.err().unwrap();
        assert!(matches!(err, StoreError::Connection(_)));
    }

    // -----------------------------------------------------------------------
    // Insert / find
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn insert_assigns_missing_id() {
        let db = InMemoryDatabase::new("t");
        db.insert_one("C", doc(json!({ "name": "x" })), WriteConcern::default())
            .await
            .unwrap();
        let found = db.find_one("C", &Filter::eq("name", "x")).await.unwrap().unwrap();
        assert_eq!(found[ID_FIELD].as_str().unwrap().len(), 24);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let db = InMemoryDatabase::new("t");
        db.insert_one("C", doc(json!({ "_id": "a" })), WriteConcern::default())
            .await
            .unwrap();
        let err = db
            .insert_one("C", doc(json!({ "_id": "a" })), WriteConcern::default())
            .await
            .unwrap_err();
        assert!(err.is_duplicate_of(ID_FIELD));
        assert_eq!(db.len("C"), 1);
    }

    #[tokio::test]
    async fn string_and_numeric_ids_are_distinct() {
        let db = InMemoryDatabase::new("t");
        db.insert_one("C", doc(json!({ "_id": "1" })), WriteConcern::default())
            .await
            .unwrap();
        db.insert_one("C", doc(json!({ "_id": 1 })), WriteConcern::default())
            .await
            .unwrap();
        assert_eq!(db.len("C"), 2);
    }

    #[tokio::test]
    async fn insert_many_stops_at_first_failure() {
        let db = InMemoryDatabase::new("t");
        let docs = vec![
            doc(json!({ "_id": "a" })),
            doc(json!({ "_id": "a" })),
            doc(json!({ "_id": "b" })),
        ];
        assert!(db.insert_many("C", docs, WriteConcern::default()).await.is_err());
        assert_eq!(db.len("C"), 1);
    }

    #[tokio::test]
    async fn find_applies_sort_skip_limit() {
        let db = InMemoryDatabase::new("t");
        for (id, n) in [("a", 3), ("b", 1), ("c", 2), ("d", 5)] {
            db.insert_one("C", doc(json!({ "_id": id, "n": n })), WriteConcern::default())
                .await
                .unwrap();
        }
        assert_eq!(
            ids(&db, "C", FindOptions::default().sorted(Sort::NaturalDescending)).await,
            vec![json!("d"), json!("c"), json!("b"), json!("a")]
        );
        assert_eq!(
            ids(
                &db,
                "C",
                FindOptions::default()
                    .sorted(Sort::Ascending("n".into()))
                    .skip(1)
                    .limit(2)
            )
            .await,
            vec![json!("c"), json!("a")]
        );
        assert_eq!(
            ids(&db, "C", FindOptions::default().sorted(Sort::Descending("n".into())).limit(1)).await,
            vec![json!("d")]
        );
    }

    #[tokio::test]
    async fn find_on_missing_collection_is_empty() {
        let db = InMemoryDatabase::new("t");
        assert!(db.find("Nope", &Filter::All, FindOptions::default()).await.unwrap().is_empty());
        assert_eq!(db.count("Nope", &Filter::All).await.unwrap(), 0);
    }

    // -----------------------------------------------------------------------
    // Replace / update / delete
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn replace_keeps_natural_position() {
        let db = InMemoryDatabase::new("t");
        for id in ["a", "b", "c"] {
            db.insert_one("C", doc(json!({ "_id": id, "v": 0 })), WriteConcern::default())
                .await
                .unwrap();
        }
        let outcome = db
            .replace_one("C", &Filter::eq(ID_FIELD, "a"), doc(json!({ "v": 9 })), false)
            .await
            .unwrap();
        assert_eq!(outcome.matched, 1);
        assert_eq!(outcome.modified, 1);
        assert_eq!(
            ids(&db, "C", FindOptions::default()).await,
            vec![json!("a"), json!("b"), json!("c")]
        );
        let a = db.find_one("C", &Filter::eq(ID_FIELD, "a")).await.unwrap().unwrap();
        assert_eq!(a["v"], 9);
    }

    #[tokio::test]
    async fn replace_without_match_is_noop_unless_upsert() {
        let db = InMemoryDatabase::new("t");
        let miss = db
            .replace_one("C", &Filter::eq(ID_FIELD, "x"), doc(json!({ "_id": "x" })), false)
            .await
            .unwrap();
        assert!(!miss.touched());
        assert!(db.is_empty("C"));

        let up = db
            .replace_one("C", &Filter::eq(ID_FIELD, "x"), doc(json!({ "v": 1 })), true)
            .await
            .unwrap();
        assert_eq!(up.upserted_id.as_deref(), Some("x"));
        assert_eq!(db.len("C"), 1);
    }

    #[tokio::test]
    async fn replace_cannot_change_id() {
        let db = InMemoryDatabase::new("t");
        db.insert_one("C", doc(json!({ "_id": "a" })), WriteConcern::default())
            .await
            .unwrap();
        let err = db
            .replace_one("C", &Filter::eq(ID_FIELD, "a"), doc(json!({ "_id": "b" })), false)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument { .. }));
    }

    #[tokio::test]
    async fn update_sets_field_and_upserts_from_equalities() {
        let db = InMemoryDatabase::new("t");
        db.insert_one("C", doc(json!({ "_id": "a" })), WriteConcern::default())
            .await
            .unwrap();
        let hit = db
            .update_one("C", &Filter::eq(ID_FIELD, "a"), "deleted", json!(true), true)
            .await
            .unwrap();
        assert_eq!(hit.matched, 1);
        let a = db.find_one("C", &Filter::eq(ID_FIELD, "a")).await.unwrap().unwrap();
        assert_eq!(a["deleted"], true);

        let up = db
            .update_one("C", &Filter::eq(ID_FIELD, "z"), "deleted", json!(true), true)
            .await
            .unwrap();
        assert_eq!(up.upserted_id.as_deref(), Some("z"));
        let z = db.find_one("C", &Filter::eq(ID_FIELD, "z")).await.unwrap().unwrap();
        assert_eq!(z["deleted"], true);
    }

    #[tokio::test]
    async fn update_supports_dotted_fields() {
        let db = InMemoryDatabase::new("t");
        db.insert_one("C", doc(json!({ "_id": "a", "meta": 1 })), WriteConcern::default())
            .await
            .unwrap();
        db.update_one("C", &Filter::All, "meta.tag", json!("x"), false)
            .await
            .unwrap();
        let a = db.find_one("C", &Filter::All).await.unwrap().unwrap();
        assert_eq!(a["meta"]["tag"], "x");
    }

    #[tokio::test]
    async fn delete_removes_first_match_only() {
        let db = InMemoryDatabase::new("t");
        for id in ["a", "b"] {
            db.insert_one("C", doc(json!({ "_id": id, "k": 1 })), WriteConcern::default())
                .await
                .unwrap();
        }
        assert_eq!(db.delete_one("C", &Filter::eq("k", 1)).await.unwrap(), 1);
        assert_eq!(ids(&db, "C", FindOptions::default()).await, vec![json!("b")]);
        assert_eq!(db.delete_one("C", &Filter::eq("k", 2)).await.unwrap(), 0);
        // The freed id can be reused.
        db.insert_one("C", doc(json!({ "_id": "a" })), WriteConcern::default())
            .await
            .unwrap();
    }

    // -----------------------------------------------------------------------
    // Collections, capping, indexes
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn create_collection_twice_fails() {
        let db = InMemoryDatabase::new("t");
        db.create_collection("Logs", CollectionOptions::capped(1024))
            .await
            .unwrap();
        assert!(db.collection_exists("Logs").await.unwrap());
        assert_eq!(db.capped_size("Logs"), Some(1024));
        let err = db
            .create_collection("Logs", CollectionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CollectionExists(_)));
    }

    #[tokio::test]
    async fn capped_collection_evicts_oldest() {
        let db = InMemoryDatabase::new("t");
        db.create_collection("Logs", CollectionOptions::capped(100))
            .await
            .unwrap();
        for i in 0..10 {
            db.insert_one(
                "Logs",
                doc(json!({ "_id": i, "msg": "0123456789" })),
                WriteConcern::Acknowledged,
            )
            .await
            .unwrap();
        }
        assert!(db.total_bytes("Logs") <= 100);
        let remaining = ids(&db, "Logs", FindOptions::default()).await;
        assert!(remaining.len() < 10);
        assert_eq!(remaining.last(), Some(&json!(9)));
    }

    #[tokio::test]
    async fn unique_index_is_enforced() {
        let db = InMemoryDatabase::new("t");
        db.create_index("C", IndexSpec::ascending("C_name", "name").unique())
            .await
            .unwrap();
        db.insert_one("C", doc(json!({ "_id": "a", "name": "x" })), WriteConcern::default())
            .await
            .unwrap();
        let err = db
            .insert_one("C", doc(json!({ "_id": "b", "name": "x" })), WriteConcern::default())
            .await
            .unwrap_err();
        assert!(err.is_duplicate_of("name"));
    }

    #[tokio::test]
    async fn unique_index_over_duplicates_fails() {
        let db = InMemoryDatabase::new("t");
        for id in ["a", "b"] {
            db.insert_one("C", doc(json!({ "_id": id, "name": "same" })), WriteConcern::default())
                .await
                .unwrap();
        }
        let err = db
            .create_index("C", IndexSpec::ascending("C_name", "name").unique())
            .await
            .unwrap_err();
        assert!(err.is_duplicate_of("name"));
        assert!(db.indexes("C").is_empty());
    }

    #[tokio::test]
    async fn create_index_is_idempotent() {
        let db = InMemoryDatabase::new("t");
        let spec = IndexSpec::ascending("C_name", "name");
        db.create_index("C", spec.clone()).await.unwrap();
        db.create_index("C", spec).await.unwrap();
        assert_eq!(db.indexes("C").len(), 1);
    }

    #[tokio::test]
    async fn drop_database_removes_everything() {
        let db = InMemoryDatabase::new("t");
        db.insert_one("A", doc(json!({})), WriteConcern::default())
            .await
            .unwrap();
        db.insert_one("B", doc(json!({})), WriteConcern::default())
            .await
            .unwrap();
        assert_eq!(db.list_collection_names().await.unwrap(), vec!["A", "B"]);
        db.drop_database().await.unwrap();
        assert!(db.list_collection_names().await.unwrap().is_empty());
    }

    #[test]
    fn debug_format() {
        let db = InMemoryDatabase::new("t");
        let debug = format!("{db:?}");
        assert!(debug.contains("InMemoryDatabase"));
        assert!(debug.contains("collection_count"));
    }
}
