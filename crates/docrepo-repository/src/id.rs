//! Document id generation strategies.
//!
//! | Strategy | Shape | Uniqueness |
//! |----------|-------|------------|
//! | [`IdStrategy::ObjectId`] | 24 hex chars | by construction (store-native) |
//! | [`IdStrategy::ShortString`] | `id_length` alphanumerics | probed against the collection, bounded retries |
//! | [`IdStrategy::Long`] | decimal integer | per-collection counter seeded from stored ids |
//! | [`IdStrategy::Guid`] | hyphenated UUID v4 | probabilistic |

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use docrepo_store::{DocumentStore, Filter, FindOptions};
use docrepo_types::ID_FIELD;

use crate::error::{IdError, IdResult};

/// Symbols drawn for short string ids.
pub const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz1234567890";

/// Longest accepted short string id.
pub const MAX_SHORT_ID_LENGTH: u16 = 36;

/// Draws per short string id before giving up.
pub const MAX_SHORT_ID_ATTEMPTS: u32 = 32;

/// Bound on waiting for the sequential counter.
pub const LONG_LOCK_WAIT: Duration = Duration::from_secs(1);

/// How new document ids are produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdStrategy {
    #[default]
    ObjectId,
    ShortString,
    Long,
    Guid,
}

impl IdStrategy {
    /// Whether a store-rejected duplicate should be retried with a new draw.
    pub fn retries_on_collision(self) -> bool {
        matches!(self, IdStrategy::ShortString)
    }
}

/// Random alphanumeric string of `length` characters.
pub fn short_string(length: u16) -> IdResult<String> {
    if length == 0 || length > MAX_SHORT_ID_LENGTH {
        return Err(IdError::LengthOutOfRange {
            length,
            max: MAX_SHORT_ID_LENGTH,
        });
    }
    let mut rng = rand::thread_rng();
    Ok((0..length)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect())
}

/// Id generator bound to one collection.
///
/// For [`IdStrategy::Long`] it owns the collection's counter: seeded once
/// from the highest stored integer id, then advanced under a lock whose
/// acquisition is bounded by [`LONG_LOCK_WAIT`]. The counter lives as long as
/// the generator; a new generator reseeds from the store.
#[derive(Debug)]
pub struct IdGenerator {
    strategy: IdStrategy,
    id_length: u16,
    collection: String,
    /// Next id to hand out; `None` once the `i64` range is used up.
    counter: Mutex<Option<i64>>,
    lock_wait: Duration,
}

impl IdGenerator {
    /// Create a generator for `collection`, seeding the counter when the
    /// strategy is [`IdStrategy::Long`].
    pub async fn open(
        strategy: IdStrategy,
        id_length: u16,
        store: &dyn DocumentStore,
        collection: &str,
    ) -> IdResult<Self> {
        let generator = Self {
            strategy,
            id_length,
            collection: collection.to_string(),
            counter: Mutex::new(Some(0)),
            lock_wait: LONG_LOCK_WAIT,
        };
        if strategy == IdStrategy::Long {
            generator.seed(store).await?;
        }
        Ok(generator)
    }

    /// Override the counter lock bound.
    pub fn with_lock_wait(mut self, lock_wait: Duration) -> Self {
        self.lock_wait = lock_wait;
        self
    }

    pub fn strategy(&self) -> IdStrategy {
        self.strategy
    }

    async fn lock_counter(&self) -> IdResult<MutexGuard<'_, Option<i64>>> {
        tokio::time::timeout(self.lock_wait, self.counter.lock())
            .await
            .map_err(|_| IdError::LockTimeout {
                collection: self.collection.clone(),
                waited: self.lock_wait,
            })
    }

    /// Set the counter one past the largest integer id in the collection.
    ///
    /// Ids are compared numerically, so `"10"` outranks `"9"`. Soft-deleted
    /// documents count: their ids stay taken.
    async fn seed(&self, store: &dyn DocumentStore) -> IdResult<()> {
        let mut counter = self.lock_counter().await?;
        let docs = store
            .find(&self.collection, &Filter::All, FindOptions::default())
            .await?;
        let max = docs
            .iter()
            .filter_map(|doc| match doc.get(ID_FIELD)? {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            })
            .max();
        *counter = match max {
            Some(m) => m.checked_add(1),
            None => Some(0),
        };
        debug!(collection = %self.collection, next = ?*counter, "sequential id counter seeded");
        Ok(())
    }

    /// Produce the next id for this collection.
    pub async fn next_id(&self, store: &dyn DocumentStore) -> IdResult<String> {
        match self.strategy {
            IdStrategy::ObjectId => Ok(store.new_object_id().to_hex()),
            IdStrategy::Guid => Ok(Uuid::new_v4().to_string()),
            IdStrategy::ShortString => self.next_short(store).await,
            IdStrategy::Long => {
                let mut counter = self.lock_counter().await?;
                let id = (*counter).ok_or_else(|| IdError::CounterOverflow {
                    collection: self.collection.clone(),
                })?;
                *counter = id.checked_add(1);
                Ok(id.to_string())
            }
        }
    }

    async fn next_short(&self, store: &dyn DocumentStore) -> IdResult<String> {
        for attempt in 1..=MAX_SHORT_ID_ATTEMPTS {
            let candidate = short_string(self.id_length)?;
            let taken = store
                .count(&self.collection, &Filter::eq(ID_FIELD, candidate.as_str()))
                .await?;
            if taken == 0 {
                return Ok(candidate);
            }
            debug!(collection = %self.collection, attempt, %candidate, "short id collision");
        }
        Err(IdError::Exhausted {
            collection: self.collection.clone(),
            attempts: MAX_SHORT_ID_ATTEMPTS,
        })
    }
}
