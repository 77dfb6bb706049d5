//! Login against the backend, with the demo accounts as a fallback.

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    config::LoginFlavor,
    error::RequestError,
    fixtures::{self, FixtureCredential},
    models::User,
    transport::ApiTransport,
};

/// Shared, mutable list of demo accounts.
///
/// Passwords are compared in plaintext; only ever used for the offline/demo path.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<RwLock<Vec<FixtureCredential>>>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(fixtures::credentials())
    }
}

impl CredentialStore {
    /// Store holding `credentials`.
    pub fn new(credentials: Vec<FixtureCredential>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(credentials)),
        }
    }

    /// User whose username and password both match.
    pub fn verify(&self, username: &str, password: &str) -> Option<User> {
        self.inner
            .read()
            .iter()
            .find(|entry| entry.user.username == username && entry.password == password)
            .map(|entry| entry.user.clone())
    }

    /// Replace the password of `username` when `current` matches; `false` otherwise.
    pub fn change_password(&self, username: &str, current: &str, new: &str) -> bool {
        let mut inner = self.inner.write();
        match inner
            .iter_mut()
            .find(|entry| entry.user.username == username && entry.password == current)
        {
            Some(entry) => {
                entry.password = new.to_string();
                true
            }
            None => false,
        }
    }
}

/// Accepted credentials, before the backend token is put to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    /// The account that logged in.
    pub user: User,
    /// Bearer token issued by the backend, when it sent one.
    pub token: Option<String>,
}

/// Body of a successful login: either a session envelope or a bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LoginPayload {
    Session { token: String, user: User },
    User(User),
}

#[derive(Clone)]
struct RemoteLogin {
    transport: ApiTransport,
    flavor: LoginFlavor,
}

impl RemoteLogin {
    async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Authenticated>, RequestError> {
        let body = match self.flavor {
            LoginFlavor::Administrador => json!({ "correo": username, "contrasena": password }),
            LoginFlavor::Auth => json!({ "username": username, "password": password }),
        };
        let response = self
            .transport
            .request(Method::POST, self.flavor.segments())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            info!(%status, path = self.flavor.path(), "login rejected");
            return Ok(None);
        }

        let text = response.text().await?;
        let payload: LoginPayload = serde_json::from_str(&text)
            .map_err(|err| RequestError::Decode(format!("login payload: {err}")))?;
        let accepted = match payload {
            LoginPayload::Session { token, user } => Authenticated {
                user,
                token: Some(token),
            },
            LoginPayload::User(user) => Authenticated { user, token: None },
        };
        Ok(Some(accepted))
    }
}

/// Validates credentials and yields the authenticated [`User`].
#[derive(Clone)]
pub struct AuthClient {
    remote: Option<RemoteLogin>,
    credentials: Option<CredentialStore>,
}

impl AuthClient {
    /// Client that only knows the demo accounts.
    pub fn fixtures(credentials: CredentialStore) -> Self {
        Self {
            remote: None,
            credentials: Some(credentials),
        }
    }

    /// Client that asks the backend; `fallback` answers while the backend is unreachable.
    pub fn remote(
        transport: ApiTransport,
        flavor: LoginFlavor,
        fallback: Option<CredentialStore>,
    ) -> Self {
        Self {
            remote: Some(RemoteLogin { transport, flavor }),
            credentials: fallback,
        }
    }

    /// Demo accounts consulted by this client, if any.
    pub fn credentials(&self) -> Option<&CredentialStore> {
        self.credentials.as_ref()
    }

    /// Check credentials without touching the token currently in use.
    ///
    /// `Ok(None)` on rejected credentials; errors only for unusable responses,
    /// or for an unreachable backend when no fallback accounts are configured.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Authenticated>, RequestError> {
        let Some(remote) = &self.remote else {
            return Ok(self.fixture_login(username, password));
        };

        match remote.login(username, password).await {
            Err(err) if err.is_connectivity() && self.credentials.is_some() => {
                warn!(%err, "login backend unreachable, checking demo accounts");
                Ok(self.fixture_login(username, password))
            }
            other => other,
        }
    }

    /// [`AuthClient::authenticate`], then send the issued token with later requests.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, RequestError> {
        let Some(accepted) = self.authenticate(username, password).await? else {
            return Ok(None);
        };
        self.adopt_token(accepted.token);
        Ok(Some(accepted.user))
    }

    /// Replace the token sent to the backend; `None` drops it.
    pub fn adopt_token(&self, token: Option<String>) {
        if let Some(remote) = &self.remote {
            remote.transport.set_token(token);
        }
    }

    /// Forget the backend session token. Returns whether one was held.
    pub fn logout(&self) -> bool {
        self.remote
            .as_ref()
            .map(|remote| remote.transport.clear_token())
            .unwrap_or(false)
    }

    fn fixture_login(&self, username: &str, password: &str) -> Option<Authenticated> {
        self.credentials
            .as_ref()
            .and_then(|store| store.verify(username, password))
            .map(|user| Authenticated { user, token: None })
    }
}
