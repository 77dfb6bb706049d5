use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::Method;

use super::ResourceBackend;
use crate::{error::RequestError, models::Entity, transport::ApiTransport};

/// Strategy that maps each operation onto `/<collection>[/:id]`.
///
/// A `404` on get, update or delete means "absent" rather than an error.
pub struct RemoteResource<T: Entity> {
    transport: ApiTransport,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> RemoteResource<T> {
    /// Serve `T::COLLECTION` through `transport`.
    pub fn new(transport: ApiTransport) -> Self {
        Self {
            transport,
            _entity: PhantomData,
        }
    }
}

fn absent_on_not_found<V>(
    result: Result<V, RequestError>,
    absent: V,
) -> Result<V, RequestError> {
    match result {
        Err(err) if err.is_not_found() => Ok(absent),
        other => other,
    }
}

#[async_trait]
impl<T: Entity> ResourceBackend<T> for RemoteResource<T> {
    async fn list(&self) -> Result<Vec<T>, RequestError> {
        let request = self.transport.request(Method::GET, &[T::COLLECTION]);
        self.transport.json(request).await
    }

    async fn get(&self, id: &str) -> Result<Option<T>, RequestError> {
        let request = self.transport.request(Method::GET, &[T::COLLECTION, id]);
        absent_on_not_found(self.transport.json(request).await, None)
    }

    async fn create(&self, draft: &T::Draft) -> Result<T, RequestError> {
        let request = self
            .transport
            .request(Method::POST, &[T::COLLECTION])
            .json(draft);
        self.transport.json(request).await
    }

    async fn update(&self, id: &str, patch: &T::Patch) -> Result<Option<T>, RequestError> {
        let request = self
            .transport
            .request(Method::PUT, &[T::COLLECTION, id])
            .json(patch);
        absent_on_not_found(self.transport.json(request).await, None)
    }

    async fn delete(&self, id: &str) -> Result<bool, RequestError> {
        let request = self.transport.request(Method::DELETE, &[T::COLLECTION, id]);
        let sent = self.transport.send(request).await.map(|_| true);
        absent_on_not_found(sent, false)
    }
}
