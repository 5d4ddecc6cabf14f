use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use docrepo_store::{DocumentStore, Filter};
use docrepo_types::{ProcedureRecord, ID_FIELD};

use crate::error::{DbError, DbResult};

/// Behaviour of a startup procedure.
///
/// Plain closures returning `anyhow::Result<()>` implement this trait; types
/// that need to await implement it directly.
#[async_trait]
pub trait ProcedureAction: Send + Sync {
    async fn run(&self) -> anyhow::Result<()>;
}

#[async_trait]
impl<F> ProcedureAction for F
where
    F: Fn() -> anyhow::Result<()> + Send + Sync,
{
    async fn run(&self) -> anyhow::Result<()> {
        (self)()
    }
}

/// A startup procedure: a stable id paired with the code to run.
///
/// Only the id and the completion flag are persisted (as a
/// [`ProcedureRecord`]); the action is supplied again on every start.
#[derive(Clone)]
pub struct Procedure {
    pub id: i64,
    /// Run on every configuration instead of only until it first succeeds.
    pub run_every_time: bool,
    action: Arc<dyn ProcedureAction>,
}

impl Procedure {
    pub fn new<F>(id: i64, run_every_time: bool, action: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::with_action(id, run_every_time, Arc::new(action))
    }

    pub fn with_action(id: i64, run_every_time: bool, action: Arc<dyn ProcedureAction>) -> Self {
        Self {
            id,
            run_every_time,
            action,
        }
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("id", &self.id)
            .field("run_every_time", &self.run_every_time)
            .finish_non_exhaustive()
    }
}

/// Run `procedure` against `store` unless its record says it is done.
///
/// Returns whether the action ran. A failing action leaves the record
/// untouched, so the procedure is attempted again next time.
pub(crate) async fn run(store: &dyn DocumentStore, procedure: &Procedure) -> DbResult<bool> {
    let by_id = Filter::eq(ID_FIELD, procedure.id);
    let stored: Option<ProcedureRecord> = store
        .find_one(ProcedureRecord::COLLECTION, &by_id)
        .await?
        .map(|doc| serde_json::from_value(Value::Object(doc)))
        .transpose()?;

    if !ProcedureRecord::needs_run(stored.as_ref(), procedure.run_every_time) {
        debug!(id = procedure.id, "procedure already done, skipping");
        return Ok(false);
    }

    procedure
        .action
        .run()
        .await
        .map_err(|source| DbError::Procedure {
            id: procedure.id,
            source,
        })?;

    let record = ProcedureRecord {
        id: procedure.id,
        run_every_time: procedure.run_every_time,
        is_done: true,
    };
    let Value::Object(doc) = serde_json::to_value(record)? else {
        return Err(DbError::Serialization(format!(
            "procedure {} record is not an object",
            procedure.id
        )));
    };
    store
        .replace_one(ProcedureRecord::COLLECTION, &by_id, doc, true)
        .await?;
    info!(id = procedure.id, every_time = procedure.run_every_time, "procedure ran");
    Ok(true)
}
