//! Shared HTTP plumbing for every backend client.

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{config::ApiConfig, error::RequestError};

/// HTTP client bound to one backend base URL.
///
/// Clones share the connection pool and the session token, so a login through
/// one handle authenticates every resource client built from it.
#[derive(Clone)]
pub struct ApiTransport {
    client: Client,
    base_url: Url,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiTransport {
    /// Build a transport from the `[api]` config section.
    pub fn new(config: &ApiConfig) -> Result<Self, RequestError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|_| RequestError::InvalidUrl(config.base_url.clone()))?;
        if base_url.cannot_be_a_base() {
            return Err(RequestError::InvalidUrl(config.base_url.clone()));
        }
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(RequestError::Client)?;
        Ok(Self {
            client,
            base_url,
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// Base URL every path is appended to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for `segments` below the base URL. Segments are percent-encoded.
    pub fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        url
    }

    /// Store the bearer token returned by the login endpoint.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    /// True while a backend session token is held.
    pub fn has_token(&self) -> bool {
        self.token.read().is_some()
    }

    /// Drop the session token; returns whether one was held.
    pub fn clear_token(&self) -> bool {
        self.token.write().take().is_some()
    }

    /// Request builder carrying the bearer token when one is held.
    pub(crate) fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.url(segments);
        debug!("backend request {} {}", method, url);
        let builder = self.client.request(method, url);
        match self.token.read().as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send `builder`, turning non-success statuses into [`RequestError::Status`].
    pub(crate) async fn send(&self, builder: RequestBuilder) -> Result<Response, RequestError> {
        let response = builder.send().await?;
        ensure_success(response).await
    }

    /// Send `builder` and decode a JSON body.
    pub(crate) async fn json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, RequestError> {
        let response = self.send(builder).await?;
        Ok(response.json::<T>().await?)
    }
}

async fn ensure_success(response: Response) -> Result<Response, RequestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(RequestError::Status {
        status: status.as_u16(),
        body,
    })
}
