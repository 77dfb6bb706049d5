//! Account profile and password management.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    auth::CredentialStore,
    error::{ConsoleError, ValidationError},
    models::deserialize_optional_date,
    session::Session,
    transport::ApiTransport,
};

/// The logged-in account as shown on the profile page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Account identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// Wire role label (`admin`, `super-admin`, `driver`, ...).
    pub role: String,
    /// Contact phone; empty when unknown.
    #[serde(default)]
    pub phone: String,
    /// Account creation date, when the backend reports it.
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub created_at: Option<NaiveDate>,
    /// Last successful login.
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

/// Fields the profile form can change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// New display name.
    pub name: String,
    /// New contact phone.
    pub phone: String,
}

impl ProfileUpdate {
    /// The name cannot be blanked.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::field("name", "must not be empty"));
        }
        Ok(())
    }
}

/// Password form contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordChange {
    /// Password in use now.
    pub current: String,
    /// Replacement.
    pub new: String,
    /// Replacement, typed again.
    pub confirm: String,
}

impl PasswordChange {
    /// Checked before any request is issued.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.new != self.confirm {
            return Err(ValidationError::PasswordMismatch);
        }
        if self.new.trim().is_empty() {
            return Err(ValidationError::EmptyPassword);
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordBody<'a> {
    current_password: &'a str,
    new_password: &'a str,
}

/// Reads and edits the profile of the session's account.
///
/// With a backend, reads fall back to a profile derived from the session user
/// and writes surface their errors. Without one, edits live in memory until
/// the process exits.
#[derive(Clone)]
pub struct ProfileClient {
    remote: Option<ApiTransport>,
    credentials: Option<CredentialStore>,
    local: Arc<RwLock<HashMap<String, ProfileUpdate>>>,
}

impl ProfileClient {
    /// Profile kept in memory; passwords checked against `credentials`.
    pub fn fixtures(credentials: CredentialStore) -> Self {
        Self {
            remote: None,
            credentials: Some(credentials),
            local: Arc::default(),
        }
    }

    /// Profile served by the backend behind `transport`.
    pub fn remote(transport: ApiTransport) -> Self {
        Self {
            remote: Some(transport),
            credentials: None,
            local: Arc::default(),
        }
    }

    /// Profile of `session`'s account.
    pub async fn fetch(&self, session: &Session) -> Profile {
        let Some(transport) = &self.remote else {
            return self.local_profile(session);
        };
        let request = transport.request(Method::GET, &["profile"]);
        match transport.json(request).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!(%err, "profile lookup failed, using session data");
                self.local_profile(session)
            }
        }
    }

    /// Save name and phone.
    pub async fn update(
        &self,
        session: &Session,
        update: ProfileUpdate,
    ) -> Result<Profile, ConsoleError> {
        update.validate()?;
        let username = &session.user().username;
        let profile = match &self.remote {
            Some(transport) => {
                let request = transport.request(Method::PUT, &["profile"]).json(&update);
                transport.json::<Profile>(request).await?
            }
            None => {
                self.local.write().insert(session.user().id.clone(), update);
                self.local_profile(session)
            }
        };
        info!(username = %username, "profile updated");
        Ok(profile)
    }

    /// Replace the account password after checking the form locally.
    pub async fn change_password(
        &self,
        session: &Session,
        change: &PasswordChange,
    ) -> Result<(), ConsoleError> {
        change.validate()?;
        let username = &session.user().username;
        match (&self.remote, &self.credentials) {
            (Some(transport), _) => {
                let body = PasswordBody {
                    current_password: &change.current,
                    new_password: &change.new,
                };
                let request = transport
                    .request(Method::PUT, &["profile", "password"])
                    .json(&body);
                transport.send(request).await?;
            }
            (None, Some(credentials)) => {
                if !credentials.change_password(username, &change.current, &change.new) {
                    return Err(ConsoleError::InvalidCredentials);
                }
            }
            (None, None) => return Err(ConsoleError::InvalidCredentials),
        }
        info!(username = %username, "password changed");
        Ok(())
    }

    fn local_profile(&self, session: &Session) -> Profile {
        let user = session.user();
        let mut profile = Profile {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            phone: String::new(),
            created_at: None,
            last_login: Some(session.started_at()),
        };
        if let Some(edit) = self.local.read().get(&user.id) {
            profile.name = edit.name.clone();
            profile.phone = edit.phone.clone();
        }
        profile
    }
}
