use async_trait::async_trait;

use super::ResourceBackend;
use crate::{error::RequestError, models::Entity, store::EntityStore};

/// Strategy that reads and writes a process-local [`EntityStore`]. Never fails.
pub struct InMemoryResource<T: Entity> {
    store: EntityStore<T>,
}

impl<T: Entity> InMemoryResource<T> {
    /// Serve `store`; clones of the store observe every write.
    pub fn new(store: EntityStore<T>) -> Self {
        Self { store }
    }

    /// Underlying store handle.
    pub fn store(&self) -> &EntityStore<T> {
        &self.store
    }
}

#[async_trait]
impl<T: Entity> ResourceBackend<T> for InMemoryResource<T> {
    async fn list(&self) -> Result<Vec<T>, RequestError> {
        Ok(self.store.all())
    }

    async fn get(&self, id: &str) -> Result<Option<T>, RequestError> {
        Ok(self.store.get(id))
    }

    async fn create(&self, draft: &T::Draft) -> Result<T, RequestError> {
        Ok(self.store.insert(draft.clone()))
    }

    async fn update(&self, id: &str, patch: &T::Patch) -> Result<Option<T>, RequestError> {
        Ok(self.store.update(id, patch.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool, RequestError> {
        Ok(self.store.remove(id))
    }
}
