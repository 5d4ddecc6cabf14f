use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::OnceCell;

use docrepo_repository::Repository;
use docrepo_types::Entity;

use crate::error::{DbError, DbResult};

type Slot<T> = OnceCell<Arc<Repository<T>>>;

/// One repository slot per entity type.
///
/// Slots are created under the write lock, so concurrent first requests for
/// a type share one slot; the repository itself is built inside the slot's
/// `OnceCell`, at most once.
#[derive(Default)]
pub(crate) struct Registry {
    slots: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Registry {
    pub(crate) fn slot<T: Entity>(&self) -> DbResult<Arc<Slot<T>>> {
        let key = TypeId::of::<T>();
        let existing = self
            .slots
            .read()
            .expect("lock poisoned")
            .get(&key)
            .cloned();
        let erased = match existing {
            Some(slot) => slot,
            None => self
                .slots
                .write()
                .expect("lock poisoned")
                .entry(key)
                .or_insert_with(|| Arc::new(Slot::<T>::new()))
                .clone(),
        };
        // The TypeId key guarantees the slot type.
        erased.downcast::<Slot<T>>().map_err(|_| {
            DbError::Internal(format!(
                "repository slot type mismatch for {}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Forget every repository; the next request builds a fresh one.
    pub(crate) fn clear(&self) {
        self.slots.write().expect("lock poisoned").clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.read().expect("lock poisoned").len()
    }
}
