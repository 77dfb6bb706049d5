//! Resource clients for the four console collections.
//!
//! [`ResourceBackend`] is the strategy seam: [`RemoteResource`] talks to the
//! REST backend, [`InMemoryResource`] to an [`EntityStore`](crate::store::EntityStore).
//! [`ResourceClient`] applies the read-fallback / write-fail policy on top.

use async_trait::async_trait;

use crate::{error::RequestError, models::Entity};

/// Policy layer used by the console.
pub mod client;
/// Store-backed strategy.
pub mod memory;
/// HTTP strategy.
pub mod remote;

pub use client::ResourceClient;
pub use memory::InMemoryResource;
pub use remote::RemoteResource;

/// One place a collection of `T` can live.
#[async_trait]
pub trait ResourceBackend<T: Entity>: Send + Sync {
    /// Every record.
    async fn list(&self) -> Result<Vec<T>, RequestError>;

    /// Record with `id`, or `None` when absent.
    async fn get(&self, id: &str) -> Result<Option<T>, RequestError>;

    /// Persist a new record and return it with its assigned id.
    async fn create(&self, draft: &T::Draft) -> Result<T, RequestError>;

    /// Merge `patch` over the record with `id`; `None` when absent.
    async fn update(&self, id: &str, patch: &T::Patch) -> Result<Option<T>, RequestError>;

    /// Remove the record with `id`; `false` when nothing was removed.
    async fn delete(&self, id: &str) -> Result<bool, RequestError>;
}
