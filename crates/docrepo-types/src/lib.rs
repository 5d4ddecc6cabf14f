//! Foundation types for docrepo.
//!
//! This crate provides the document shapes shared by every other docrepo
//! crate. Nothing in here talks to a store; it only fixes how documents look
//! once they are serialized.
//!
//! # Key Types
//!
//! - [`Entity`] -- Contract every repository-managed document satisfies
//! - [`EntityBase`] -- Ready-made `_id` + `name` pair for embedding
//! - [`ObjectId`] -- 12-byte natively unique identifier (timestamp + random + counter)
//! - [`LogEntry`] / [`LogLevel`] -- Records of the capped log collection
//! - [`Parameter`] -- Named key/value document
//! - [`ProcedureRecord`] -- Persisted completion flag of a startup procedure

pub mod entity;
pub mod error;
pub mod log;
pub mod object;
pub mod parameter;
pub mod procedure;

pub use entity::{short_type_name, Entity, EntityBase, DELETED_FIELD, ID_FIELD, NAME_FIELD};
pub use error::TypeError;
pub use log::{LogEntry, LogLevel, LEVEL_FIELD};
pub use object::ObjectId;
pub use parameter::Parameter;
pub use procedure::ProcedureRecord;
