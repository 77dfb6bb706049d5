use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{info, warn};

use super::gate::{permits, Action, Principal};
use crate::{
    auth::AuthClient,
    error::{ConsoleError, SessionError},
    models::User,
};

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// An authenticated user together with their validated role.
///
/// Each login yields a distinct session; clones compare equal to it, sessions
/// of other logins never do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    serial: u64,
    user: User,
    principal: Principal,
    started_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for `user`; fails for a driver account without `driverId`.
    ///
    /// Only [`SessionManager::login`] hands sessions out.
    pub(crate) fn new(user: User) -> Result<Self, SessionError> {
        let principal = Principal::from_user(&user)?;
        Ok(Self {
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
            user,
            principal,
            started_at: Utc::now(),
        })
    }

    /// The user returned by the login.
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Validated role.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// When the login succeeded.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether the role gate lets this session perform `action`.
    pub fn permits(&self, action: Action) -> bool {
        permits(&self.principal, action)
    }

    /// Like [`Session::permits`], as a `Result` for `?` chains.
    pub fn authorize(&self, action: Action) -> Result<(), ConsoleError> {
        if self.permits(action) {
            Ok(())
        } else {
            warn!(username = %self.user.username, %action, "action refused");
            Err(ConsoleError::Forbidden(action))
        }
    }
}

/// Published session state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Nobody is logged in.
    #[default]
    LoggedOut,
    /// A login succeeded and has not been closed.
    LoggedIn(Session),
}

impl SessionState {
    /// The live session, if any.
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::LoggedIn(session) => Some(session),
            Self::LoggedOut => None,
        }
    }
}

/// Owns the one live session of the process and publishes every change.
///
/// Cloned handles share the same state. Observers call
/// [`SessionManager::subscribe`] and read immutable snapshots.
#[derive(Clone)]
pub struct SessionManager {
    state: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    /// Manager starting logged out.
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::LoggedOut);
        Self {
            state: Arc::new(state),
        }
    }

    /// Receiver notified on every login and logout.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// The live session, if any.
    pub fn current(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    /// The live session, or [`SessionError::NotLoggedIn`].
    pub fn require(&self) -> Result<Session, SessionError> {
        self.current().ok_or(SessionError::NotLoggedIn)
    }

    /// Whether `session` is the one currently logged in.
    pub fn is_live(&self, session: &Session) -> bool {
        self.state.borrow().session() == Some(session)
    }

    /// Gate check for `session`, which must also still be the live session.
    ///
    /// A session kept past its logout, or from an earlier login, is refused
    /// with [`SessionError::NotLoggedIn`].
    pub fn authorize(&self, session: &Session, action: Action) -> Result<(), ConsoleError> {
        if !self.is_live(session) {
            warn!(username = %session.user.username, %action, "session is not live");
            return Err(SessionError::NotLoggedIn.into());
        }
        session.authorize(action)
    }

    /// Authenticate through `auth` and publish the new session.
    ///
    /// `Ok(None)` on rejected credentials; the previous state is kept on any failure.
    pub async fn login(
        &self,
        auth: &AuthClient,
        username: &str,
        password: &str,
    ) -> Result<Option<Session>, ConsoleError> {
        let Some(accepted) = auth.authenticate(username, password).await? else {
            info!(username, "login rejected");
            return Ok(None);
        };
        // The token of a refused login is dropped; the live one stays in place.
        let session = Session::new(accepted.user)?;
        auth.adopt_token(accepted.token);
        info!(
            username = %session.user.username,
            role = session.user.role.label(),
            "logged in"
        );
        self.state
            .send_replace(SessionState::LoggedIn(session.clone()));
        Ok(Some(session))
    }

    /// Close the live session and forget the backend token.
    ///
    /// Returns whether a session was open.
    pub fn logout(&self, auth: &AuthClient) -> bool {
        auth.logout();
        match self.state.send_replace(SessionState::LoggedOut) {
            SessionState::LoggedIn(session) => {
                info!(username = %session.user.username, "logged out");
                true
            }
            SessionState::LoggedOut => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;

    use super::*;
    use crate::{auth::CredentialStore, config::LoginFlavor, models::Role, testing::MockBackend};

    fn fixture_auth() -> AuthClient {
        AuthClient::fixtures(CredentialStore::default())
    }

    #[tokio::test]
    async fn login_publishes_session_and_logout_clears_it() -> anyhow::Result<()> {
        let manager = SessionManager::new();
        let mut updates = manager.subscribe();
        let auth = fixture_auth();

        let session = manager
            .login(&auth, "admin", "admin123")
            .await?
            .ok_or_else(|| anyhow::anyhow!("admin rejected"))?;
        assert_eq!(session.principal(), &Principal::Admin);
        assert_eq!(session.user().role, Role::Admin);

        updates.changed().await?;
        assert_eq!(
            updates.borrow_and_update().session().map(|s| s.user().username.clone()),
            Some("admin".to_string())
        );

        assert!(manager.logout(&auth));
        assert_eq!(manager.state(), SessionState::LoggedOut);
        assert!(!manager.logout(&auth));
        Ok(())
    }

    #[tokio::test]
    async fn rejected_login_keeps_state() -> anyhow::Result<()> {
        let manager = SessionManager::new();
        let auth = fixture_auth();
        assert!(manager.login(&auth, "admin", "wrong").await?.is_none());
        assert!(manager.current().is_none());
        assert!(matches!(manager.require(), Err(SessionError::NotLoggedIn)));

        manager.login(&auth, "readmin", "readmin123").await?;
        assert!(manager.login(&auth, "readmin", "nope").await?.is_none());
        assert_eq!(
            manager.current().map(|s| s.principal().clone()),
            Some(Principal::ReadOnlyAdmin)
        );
        Ok(())
    }

    #[tokio::test]
    async fn driver_session_carries_driver_record() -> anyhow::Result<()> {
        let manager = SessionManager::new();
        let session = manager
            .login(&fixture_auth(), "chofer", "chofer123")
            .await?
            .ok_or_else(|| anyhow::anyhow!("driver rejected"))?;
        assert_eq!(session.principal().driver_id(), Some("d1"));
        assert!(session.permits(Action::ViewAssignedBus));
        assert!(matches!(
            session.authorize(Action::ViewFleet),
            Err(ConsoleError::Forbidden(Action::ViewFleet))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn only_the_live_session_is_authorized() -> anyhow::Result<()> {
        let manager = SessionManager::new();
        let auth = fixture_auth();
        let first = manager
            .login(&auth, "admin", "admin123")
            .await?
            .ok_or_else(|| anyhow::anyhow!("admin rejected"))?;
        manager.authorize(&first, Action::ManageAdmins)?;

        let second = manager
            .login(&auth, "admin", "admin123")
            .await?
            .ok_or_else(|| anyhow::anyhow!("admin rejected"))?;
        assert!(manager.is_live(&second));
        assert!(matches!(
            manager.authorize(&first, Action::ViewFleet),
            Err(ConsoleError::Session(SessionError::NotLoggedIn))
        ));

        manager.logout(&auth);
        assert!(matches!(
            manager.authorize(&second, Action::ViewFleet),
            Err(ConsoleError::Session(SessionError::NotLoggedIn))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn refused_login_keeps_the_live_token() -> anyhow::Result<()> {
        let backend = MockBackend::start().await?;
        let transport = backend.transport()?;
        let auth = AuthClient::remote(transport.clone(), LoginFlavor::Administrador, None);
        let manager = SessionManager::new();

        let admin = manager
            .login(&auth, "admin", "admin123")
            .await?
            .ok_or_else(|| anyhow::anyhow!("admin rejected"))?;

        let ghost = manager.login(&auth, "ghost", "ghost123").await;
        assert!(matches!(
            ghost,
            Err(ConsoleError::Session(SessionError::MissingDriverId(_)))
        ));
        assert!(manager.is_live(&admin));

        transport.send(transport.request(Method::GET, &["buses"])).await?;
        assert_eq!(
            backend.last_authorization().as_deref(),
            Some("Bearer tok-admin")
        );
        Ok(())
    }

    #[test]
    fn driver_without_record_cannot_start_a_session() {
        let user = User {
            id: "7".to_string(),
            username: "ghost".to_string(),
            name: "Ghost".to_string(),
            email: "ghost@etransa.com".to_string(),
            role: Role::Driver,
            driver_id: None,
        };
        assert_eq!(
            Session::new(user),
            Err(SessionError::MissingDriverId("ghost".to_string()))
        );
    }
}
