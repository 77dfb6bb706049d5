use std::sync::Arc;

use tracing::{info, warn};

use super::{InMemoryResource, RemoteResource, ResourceBackend};
use crate::{error::RequestError, models::Entity, store::EntityStore, transport::ApiTransport};

/// Resource client for one collection.
///
/// Reads never fail: when the backend errors, the fallback store answers and
/// the failure is only logged. Writes always go to the backend and surface
/// its errors; the fallback store is never written on their behalf.
pub struct ResourceClient<T: Entity> {
    backend: Arc<dyn ResourceBackend<T>>,
    fallback: EntityStore<T>,
}

impl<T: Entity> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            fallback: self.fallback.clone(),
        }
    }
}

impl<T: Entity> ResourceClient<T> {
    /// Client over any strategy, with `fallback` answering failed reads.
    pub fn with_backend(backend: Arc<dyn ResourceBackend<T>>, fallback: EntityStore<T>) -> Self {
        Self { backend, fallback }
    }

    /// Client that reads and writes `store` only.
    pub fn in_memory(store: EntityStore<T>) -> Self {
        Self::with_backend(Arc::new(InMemoryResource::new(store.clone())), store)
    }

    /// Client that talks to the backend behind `transport`, reading `fallback` on failure.
    pub fn remote(transport: ApiTransport, fallback: EntityStore<T>) -> Self {
        Self::with_backend(Arc::new(RemoteResource::<T>::new(transport)), fallback)
    }

    /// Store consulted when a read fails.
    pub fn fallback(&self) -> &EntityStore<T> {
        &self.fallback
    }

    /// Every record, from the backend or else from the fallback store.
    pub async fn get_all(&self) -> Vec<T> {
        match self.backend.list().await {
            Ok(records) => records,
            Err(err) => {
                warn!(collection = T::COLLECTION, %err, "listing failed, using fallback data");
                self.fallback.all()
            }
        }
    }

    /// Record with `id`, from the backend or else from the fallback store.
    pub async fn get_by_id(&self, id: &str) -> Option<T> {
        match self.backend.get(id).await {
            Ok(record) => record,
            Err(err) => {
                warn!(collection = T::COLLECTION, id, %err, "lookup failed, using fallback data");
                self.fallback.get(id)
            }
        }
    }

    /// Create a record; the caller re-fetches to resync its view.
    pub async fn create(&self, draft: &T::Draft) -> Result<T, RequestError> {
        let record = self.backend.create(draft).await?;
        info!(collection = T::COLLECTION, id = record.id(), "record created");
        Ok(record)
    }

    /// Merge `patch` over the record with `id`; `None` when it does not exist.
    pub async fn update(&self, id: &str, patch: &T::Patch) -> Result<Option<T>, RequestError> {
        let updated = self.backend.update(id, patch).await?;
        if updated.is_some() {
            info!(collection = T::COLLECTION, id, "record updated");
        }
        Ok(updated)
    }

    /// Remove the record with `id`.
    pub async fn delete(&self, id: &str) -> Result<bool, RequestError> {
        let removed = self.backend.delete(id).await?;
        if removed {
            info!(collection = T::COLLECTION, id, "record deleted");
        }
        Ok(removed)
    }
}
