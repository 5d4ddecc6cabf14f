//! High-level façade of docrepo.
//!
//! [`DocumentDb`] is the main entry point for applications. It owns the one
//! database handle of a process (configured lazily, exactly once), hands
//! out typed [`Repository`] instances per entity type, and carries three
//! built-in stores:
//!
//! - a capped, append-only log ([`DocumentDb::write_log`], [`DocumentDb::get_logs`])
//! - named parameters ([`DocumentDb::set_parameter`], [`DocumentDb::get_parameter`])
//! - startup procedures that run once, or on every start ([`Procedure`])
//!
//! ```no_run
//! # async fn demo() -> docrepo_sdk::DbResult<()> {
//! use std::sync::Arc;
//! use docrepo_sdk::{DbConfig, DocumentDb, IdStrategy, InMemoryClient, LogEntry, LogLevel};
//!
//! let db = DocumentDb::new(Arc::new(InMemoryClient::new()));
//! db.configure(Some(DbConfig::default().with_id_generator(IdStrategy::Guid)))
//!     .await?;
//! db.write_log(LogEntry::new(LogLevel::Info, "started")).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod logs;
pub mod parameters;
pub mod procedure;
mod registry;

pub use config::DbConfig;
pub use db::{DocumentDb, LOG_COLLECTION};
pub use error::{DbError, DbResult};
pub use logs::LogQuery;
pub use procedure::{Procedure, ProcedureAction};

// Re-export key types
pub use docrepo_repository::{IdStrategy, Repository, RepositoryError, RepositoryOptions};
pub use docrepo_store::{DocumentClient, DocumentStore, Filter, InMemoryClient, StoreError};
pub use docrepo_types::{Entity, EntityBase, LogEntry, LogLevel, ObjectId, Parameter};
