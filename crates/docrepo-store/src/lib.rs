//! Document store interface for docrepo.
//!
//! The persistence core never talks to a concrete database. Everything it
//! needs from one is captured by two traits:
//!
//! - [`DocumentClient`] -- connects and hands out database handles
//! - [`DocumentStore`] -- collections, filtered finds, replace/update/delete,
//!   indexes, capped collections, write concern, native ids
//!
//! # Storage Backends
//!
//! - [`InMemoryClient`] / [`InMemoryDatabase`] -- `HashMap`-based store for
//!   tests and embedding
//!
//! # Design Rules
//!
//! 1. `_id` is unique per collection; violations surface as
//!    [`StoreError::DuplicateKey`], never as silent overwrites.
//! 2. Natural order is insertion order and survives replaces.
//! 3. Capped collections evict their oldest documents; the core never does.
//! 4. Filters are plain data ([`Filter`]) so any backend can translate them.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod filter;
pub mod memory;
pub mod options;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use filter::{Document, Filter, FindOptions, Sort};
pub use memory::{InMemoryClient, InMemoryDatabase};
pub use options::{CollectionOptions, IndexSpec, UpdateOutcome, WriteConcern};
pub use traits::{DocumentClient, DocumentStore};
