//! Generic typed repositories over a [`DocumentStore`](docrepo_store::DocumentStore).
//!
//! A [`Repository<T>`] maps one [`Entity`](docrepo_types::Entity) type onto
//! its collection. It assigns ids at creation through an [`IdGenerator`],
//! hides soft-deleted documents from every read, and keeps an ascending index
//! on the entity name.
//!
//! # Id Strategies
//!
//! - [`IdStrategy::ObjectId`] -- store-native 12-byte ids, hex encoded (default)
//! - [`IdStrategy::ShortString`] -- short random alphanumerics, probed for collisions
//! - [`IdStrategy::Long`] -- per-collection counter seeded from the stored maximum
//! - [`IdStrategy::Guid`] -- random UUIDs

pub mod error;
pub mod id;
pub mod repository;

pub use error::{IdError, IdResult, RepositoryError, RepositoryResult};
pub use id::{
    short_string, IdGenerator, IdStrategy, ALPHABET, LONG_LOCK_WAIT, MAX_SHORT_ID_ATTEMPTS,
    MAX_SHORT_ID_LENGTH,
};
pub use repository::{Repository, RepositoryOptions};
