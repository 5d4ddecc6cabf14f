use serde::{Deserialize, Serialize};

/// Persisted state of a startup procedure.
///
/// Only the completion flag survives between runs; the behaviour itself is
/// supplied by the caller each time the store is configured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureRecord {
    /// Caller-assigned identifier, stable across runs.
    #[serde(rename = "_id")]
    pub id: i64,
    #[serde(default)]
    pub run_every_time: bool,
    #[serde(default)]
    pub is_done: bool,
}

impl ProcedureRecord {
    /// Collection holding procedure records.
    pub const COLLECTION: &'static str = "InitProcedures";

    pub fn new(id: i64, run_every_time: bool) -> Self {
        Self {
            id,
            run_every_time,
            is_done: false,
        }
    }

    /// Whether the procedure must run given the stored record (if any).
    pub fn needs_run(stored: Option<&ProcedureRecord>, run_every_time: bool) -> bool {
        match stored {
            None => true,
            Some(record) => !record.is_done || run_every_time,
        }
    }
}
