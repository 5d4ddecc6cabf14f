use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use docrepo_store::Filter;
use docrepo_types::{short_type_name, Parameter, NAME_FIELD};

use crate::db::DocumentDb;
use crate::error::DbResult;

fn key<T>(name: Option<&str>) -> String {
    name.map_or_else(|| short_type_name::<T>().to_string(), str::to_string)
}

fn list_key<T>(name: Option<&str>) -> String {
    format!("{}s", key::<T>(name))
}

impl DocumentDb {
    async fn put_parameter(&self, name: String, value: serde_json::Value) -> DbResult<()> {
        let repo = self.repository::<Parameter>().await?;
        // Lookup and write must not interleave with another writer.
        let _guard = self.parameter_writes.lock().await;
        let parameter = match repo.find(Some(Filter::eq(NAME_FIELD, name.as_str()))).await? {
            Some(mut existing) => {
                existing.value = value;
                existing
            }
            None => Parameter::new(name, value),
        };
        let saved = repo.create_or_update(parameter).await?;
        debug!(name = %saved.name, id = %saved.id, "parameter set");
        Ok(())
    }

    async fn load_parameter(&self, name: &str) -> DbResult<Option<Parameter>> {
        let repo = self.repository::<Parameter>().await?;
        Ok(repo.find(Some(Filter::eq(NAME_FIELD, name))).await?)
    }

    /// Store `value` under `name`, defaulting to the short type name of `T`.
    pub async fn set_parameter<T: Serialize>(&self, value: &T, name: Option<&str>) -> DbResult<()> {
        self.put_parameter(key::<T>(name), serde_json::to_value(value)?)
            .await
    }

    /// Store a list under `name` + `"s"`, defaulting to the type name + `"s"`.
    pub async fn set_parameter_values<T: Serialize>(
        &self,
        values: &[T],
        name: Option<&str>,
    ) -> DbResult<()> {
        self.put_parameter(list_key::<T>(name), serde_json::to_value(values)?)
            .await
    }

    /// The value stored under `name`; `None` when absent or of another shape.
    pub async fn get_parameter<T: DeserializeOwned>(&self, name: Option<&str>) -> DbResult<Option<T>> {
        Ok(self
            .load_parameter(&key::<T>(name))
            .await?
            .and_then(|p| serde_json::from_value(p.value).ok()))
    }

    /// The list stored by [`set_parameter_values`](Self::set_parameter_values);
    /// empty when absent or of another shape.
    pub async fn get_parameter_values<T: DeserializeOwned>(
        &self,
        name: Option<&str>,
    ) -> DbResult<Vec<T>> {
        Ok(self
            .load_parameter(&list_key::<T>(name))
            .await?
            .and_then(|p| serde_json::from_value(p.value).ok())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docrepo_store::{
        CollectionOptions, Document, DocumentClient, DocumentStore, FindOptions, IndexSpec,
        InMemoryClient, InMemoryDatabase, StoreResult, UpdateOutcome, WriteConcern,
    };
    use docrepo_types::Entity;
    use serde::Deserialize;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    /// In-memory store whose reads yield before answering, so concurrent
    /// writers interleave between lookup and write.
    struct SlowReads(InMemoryDatabase);

    #[async_trait]
    impl DocumentStore for SlowReads {
        fn database_name(&self) -> &str {
            self.0.database_name()
        }
        async fn create_collection(&self, name: &str, options: CollectionOptions) -> StoreResult<()> {
            self.0.create_collection(name, options).await
        }
        async fn list_collection_names(&self) -> StoreResult<Vec<String>> {
            self.0.list_collection_names().await
        }
        async fn drop_database(&self) -> StoreResult<()> {
            self.0.drop_database().await
        }
        async fn insert_one(&self, c: &str, doc: Document, w: WriteConcern) -> StoreResult<()> {
            self.0.insert_one(c, doc, w).await
        }
        async fn insert_many(&self, c: &str, docs: Vec<Document>, w: WriteConcern) -> StoreResult<()> {
            self.0.insert_many(c, docs, w).await
        }
        async fn find(&self, c: &str, f: &Filter, o: FindOptions) -> StoreResult<Vec<Document>> {
            let found = self.0.find(c, f, o).await?;
            tokio::time::sleep(Duration::from_millis(2)).await;
            Ok(found)
        }
        async fn count(&self, c: &str, f: &Filter) -> StoreResult<u64> {
            self.0.count(c, f).await
        }
        async fn replace_one(
            &self,
            c: &str,
            f: &Filter,
            doc: Document,
            upsert: bool,
        ) -> StoreResult<UpdateOutcome> {
            self.0.replace_one(c, f, doc, upsert).await
        }
        async fn update_one(
            &self,
            c: &str,
            f: &Filter,
            field: &str,
            value: Value,
            upsert: bool,
        ) -> StoreResult<UpdateOutcome> {
            self.0.update_one(c, f, field, value, upsert).await
        }
        async fn delete_one(&self, c: &str, f: &Filter) -> StoreResult<u64> {
            self.0.delete_one(c, f).await
        }
        async fn create_index(&self, c: &str, index: IndexSpec) -> StoreResult<()> {
            self.0.create_index(c, index).await
        }
    }

    struct SlowClient;

    #[async_trait]
    impl DocumentClient for SlowClient {
        async fn open_database(
            &self,
            _connection: &str,
            name: &str,
        ) -> StoreResult<Arc<dyn DocumentStore>> {
            Ok(Arc::new(SlowReads(InMemoryDatabase::new(name))))
        }
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct AppName {
        name: String,
        version: String,
    }

    fn app(version: &str) -> AppName {
        AppName {
            name: "billing".into(),
            version: version.into(),
        }
    }

    fn facade() -> DocumentDb {
        DocumentDb::new(Arc::new(InMemoryClient::new()))
    }

    #[tokio::test]
    async fn set_then_get_by_type_name() {
        let db = facade();
        db.set_parameter(&app("1.0.0"), None).await.unwrap();
        let got: Option<AppName> = db.get_parameter(None).await.unwrap();
        assert_eq!(got, Some(app("1.0.0")));

        let raw = db.get_values::<Parameter>(None).await.unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].name, "AppName");
    }

    #[tokio::test]
    async fn set_is_idempotent_per_name() {
        let db = facade();
        db.set_parameter(&app("1.0.0"), None).await.unwrap();
        db.set_parameter(&app("1.0.1"), None).await.unwrap();
        db.set_parameter(&app("1.0.1"), None).await.unwrap();
        let repo = db.repository::<Parameter>().await.unwrap();
        assert_eq!(repo.count(None).await.unwrap(), 1);
        let got: Option<AppName> = db.get_parameter(None).await.unwrap();
        assert_eq!(got.unwrap().version, "1.0.1");
    }

    #[tokio::test]
    async fn explicit_name_overrides_type_name() {
        let db = facade();
        db.set_parameter(&"2024-05-01T00:00:00Z", Some("LastStartDate"))
            .await
            .unwrap();
        let got: Option<String> = db.get_parameter(Some("LastStartDate")).await.unwrap();
        assert_eq!(got.as_deref(), Some("2024-05-01T00:00:00Z"));
        let by_type: Option<String> = db.get_parameter(None).await.unwrap();
        assert!(by_type.is_none());
    }

    #[tokio::test]
    async fn lists_are_stored_under_plural_key() {
        let db = facade();
        let apps = vec![app("1"), app("2")];
        db.set_parameter_values(&apps, None).await.unwrap();
        let repo = db.repository::<Parameter>().await.unwrap();
        let stored = repo.find(None).await.unwrap().unwrap();
        assert_eq!(stored.name(), "AppNames");

        let got: Vec<AppName> = db.get_parameter_values(None).await.unwrap();
        assert_eq!(got, apps);
        let named: Vec<AppName> = db.get_parameter_values(Some("Other")).await.unwrap();
        assert!(named.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sets_keep_one_document_per_name() {
        let db = Arc::new(DocumentDb::new(Arc::new(SlowClient)));
        let mut handles = Vec::new();
        for i in 0..8_u32 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.set_parameter(&i, Some("X")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        let repo = db.repository::<Parameter>().await.unwrap();
        let named_x = repo
            .count(Some(Filter::eq(NAME_FIELD, "X")))
            .await
            .unwrap();
        assert_eq!(named_x, 1);
        let value: Option<u32> = db.get_parameter(Some("X")).await.unwrap();
        assert!(value.is_some_and(|v| v < 8));
    }

    #[tokio::test]
    async fn shape_mismatch_reads_as_absent() {
        let db = facade();
        db.set_parameter(&42_u32, Some("AppName")).await.unwrap();
        let got: Option<AppName> = db.get_parameter(None).await.unwrap();
        assert!(got.is_none());
        db.set_parameter(&"not a list", Some("AppNames")).await.unwrap();
        let list: Vec<AppName> = db.get_parameter_values(None).await.unwrap();
        assert!(list.is_empty());
    }
}
