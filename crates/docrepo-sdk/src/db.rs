use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument};

use docrepo_repository::Repository;
use docrepo_store::{CollectionOptions, DocumentClient, DocumentStore, Filter, StoreError};
use docrepo_types::Entity;

use crate::config::DbConfig;
use crate::error::{DbError, DbResult};
use crate::procedure::{self, Procedure};
use crate::registry::Registry;

/// Collection holding log entries, capped at `log_collection_size` bytes.
pub const LOG_COLLECTION: &str = "Logs";

struct Configured {
    config: DbConfig,
    store: Arc<dyn DocumentStore>,
}

/// Entry point of the persistence layer.
///
/// A `DocumentDb` is configured exactly once: by an explicit
/// [`configure`](Self::configure) or implicitly, with [`DbConfig::default`],
/// by the first operation that needs the store. Concurrent first callers
/// wait for the same initialization. Repositories are created lazily, one
/// per entity type, and shared by every caller.
pub struct DocumentDb {
    client: Arc<dyn DocumentClient>,
    state: OnceCell<Configured>,
    registry: Registry,
    /// Serializes parameter writes so each name maps to one document.
    pub(crate) parameter_writes: Mutex<()>,
}

impl fmt::Debug for DocumentDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentDb")
            .field("configuration", &self.configuration())
            .field("repositories", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl DocumentDb {
    pub fn new(client: Arc<dyn DocumentClient>) -> Self {
        Self {
            client,
            state: OnceCell::new(),
            registry: Registry::default(),
            parameter_writes: Mutex::new(()),
        }
    }

    /// Configure with `config`, or the defaults when `None`.
    ///
    /// Only the first successful call has an effect; later calls return
    /// immediately. Initialization that outlasts `configure_timeout` fails
    /// with [`DbError::ConfigurationTimeout`] and leaves the façade
    /// unconfigured.
    pub async fn configure(&self, config: Option<DbConfig>) -> DbResult<()> {
        self.configured_with(config).await.map(|_| ())
    }

    /// The active configuration, once configured.
    pub fn configuration(&self) -> Option<&DbConfig> {
        self.state.get().map(|c| &c.config)
    }

    async fn configured_with(&self, config: Option<DbConfig>) -> DbResult<&Configured> {
        if let Some(configured) = self.state.get() {
            return Ok(configured);
        }
        let config = config.unwrap_or_default();
        let bound = config.configure_timeout;
        let init = self
            .state
            .get_or_try_init(|| Self::initialize(self.client.as_ref(), config));
        match tokio::time::timeout(bound, init).await {
            Ok(result) => result,
            Err(_) => Err(DbError::ConfigurationTimeout(bound)),
        }
    }

    async fn configured(&self) -> DbResult<&Configured> {
        self.configured_with(None).await
    }

    #[instrument(skip_all, fields(database = %config.database))]
    async fn initialize(client: &dyn DocumentClient, config: DbConfig) -> DbResult<Configured> {
        info!(connection = %config.connection_string, "configuring document store");
        let store = client
            .open_database(&config.connection_string, &config.database)
            .await?;
        ensure_log_collection(store.as_ref(), config.log_collection_size).await?;
        for procedure in &config.init_procedures {
            procedure::run(store.as_ref(), procedure).await?;
        }
        info!(
            id_generator = ?config.id_generator,
            delete_forever = config.delete_forever,
            procedures = config.init_procedures.len(),
            "document store configured"
        );
        Ok(Configured { config, store })
    }

    /// The database handle, configuring first if needed.
    pub async fn store(&self) -> DbResult<Arc<dyn DocumentStore>> {
        Ok(self.configured().await?.store.clone())
    }

    pub async fn collection_names(&self) -> DbResult<Vec<String>> {
        Ok(self.configured().await?.store.list_collection_names().await?)
    }

    /// The shared repository for entity type `T`.
    pub async fn repository<T: Entity>(&self) -> DbResult<Arc<Repository<T>>> {
        let configured = self.configured().await?;
        let slot = self.registry.slot::<T>()?;
        let repo = slot
            .get_or_try_init(|| async {
                let repo = Repository::<T>::open(
                    configured.store.clone(),
                    configured.config.repository_options(),
                )
                .await?;
                Ok::<_, DbError>(Arc::new(repo))
            })
            .await?;
        Ok(repo.clone())
    }

    /// Drop the whole database, recreate the log collection and forget all
    /// repositories. Sequential id counters reseed on next use.
    ///
    /// Repositories obtained before the call are detached from the façade:
    /// discard them and fetch new ones with [`repository`](Self::repository).
    /// A stale [`IdStrategy::Long`](docrepo_repository::IdStrategy::Long)
    /// handle keeps its old counter and collides with the fresh one.
    pub async fn clean(&self) -> DbResult<()> {
        let configured = self.configured().await?;
        configured.store.drop_database().await?;
        ensure_log_collection(configured.store.as_ref(), configured.config.log_collection_size)
            .await?;
        self.registry.clear();
        info!(database = %configured.config.database, "database cleaned");
        Ok(())
    }

    /// Run one startup procedure now. Returns whether its action ran.
    pub async fn run_procedure(&self, procedure: &Procedure) -> DbResult<bool> {
        let configured = self.configured().await?;
        procedure::run(configured.store.as_ref(), procedure).await
    }

    /// Visible documents of type `T` matching `filter`.
    pub async fn get_values<T: Entity>(&self, filter: Option<Filter>) -> DbResult<Vec<T>> {
        Ok(self.repository::<T>().await?.find_all(filter).await?)
    }

    pub async fn get_value<T: Entity>(&self, filter: Option<Filter>) -> DbResult<Option<T>> {
        Ok(self.repository::<T>().await?.find(filter).await?)
    }

    pub async fn create_or_update<T: Entity>(&self, doc: T) -> DbResult<T> {
        Ok(self.repository::<T>().await?.create_or_update(doc).await?)
    }
}

async fn ensure_log_collection(store: &dyn DocumentStore, capacity: u64) -> DbResult<()> {
    if store.collection_exists(LOG_COLLECTION).await? {
        return Ok(());
    }
    match store
        .create_collection(LOG_COLLECTION, CollectionOptions::capped(capacity))
        .await
    {
        // Another process created it between the check and the create.
        Ok(()) | Err(StoreError::CollectionExists(_)) => {
            debug!(capacity, "log collection ready");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
