//! Role-checked entry point used by the view layer.
//!
//! [`FleetConsole`] bundles the resource clients with the session manager and
//! refuses every operation the current session's role does not permit, so a
//! hidden control in the view is never the only line of defence.

use tracing::info;

use crate::{
    auth::{AuthClient, CredentialStore},
    config::{AppConfig, DataSource},
    driver::{DriverDesk, DriverView},
    error::{ConsoleError, RequestError},
    fixtures,
    models::{
        Admin, AdminPatch, Bus, BusPatch, BusStatus, Driver, DriverContact, DriverPatch, Entity,
        Route, RoutePatch,
    },
    notice::Locale,
    profile::{PasswordChange, Profile, ProfileClient, ProfileUpdate},
    resource::ResourceClient,
    session::{Action, Section, Session, SessionManager},
    store::EntityStore,
    transport::ApiTransport,
};

/// A collection the console manages, with the actions guarding it.
pub trait Managed: Entity {
    /// Console section listing the collection.
    const SECTION: Section;
    /// Needed to list or read records.
    const VIEW: Action;
    /// Needed to create, update or delete records.
    const MANAGE: Action;

    /// The console's client for this collection.
    fn client(console: &FleetConsole) -> &ResourceClient<Self>;

    /// Patch moving the record to its next status.
    fn status_toggle(&self) -> Self::Patch;
}

impl Managed for Bus {
    const SECTION: Section = Section::Buses;
    const VIEW: Action = Action::ViewFleet;
    const MANAGE: Action = Action::ManageFleet;

    fn client(console: &FleetConsole) -> &ResourceClient<Self> {
        &console.buses
    }

    fn status_toggle(&self) -> BusPatch {
        BusPatch {
            status: Some(self.status.next()),
            ..BusPatch::default()
        }
    }
}

impl Managed for Route {
    const SECTION: Section = Section::Routes;
    const VIEW: Action = Action::ViewFleet;
    const MANAGE: Action = Action::ManageFleet;

    fn client(console: &FleetConsole) -> &ResourceClient<Self> {
        &console.routes
    }

    fn status_toggle(&self) -> RoutePatch {
        RoutePatch {
            status: Some(self.status.toggled()),
            ..RoutePatch::default()
        }
    }
}

impl Managed for Driver {
    const SECTION: Section = Section::Drivers;
    const VIEW: Action = Action::ViewFleet;
    const MANAGE: Action = Action::ManageFleet;

    fn client(console: &FleetConsole) -> &ResourceClient<Self> {
        &console.drivers
    }

    fn status_toggle(&self) -> DriverPatch {
        DriverPatch {
            status: Some(self.status.toggled()),
            ..DriverPatch::default()
        }
    }
}

impl Managed for Admin {
    const SECTION: Section = Section::Admins;
    const VIEW: Action = Action::ViewAdmins;
    const MANAGE: Action = Action::ManageAdmins;

    fn client(console: &FleetConsole) -> &ResourceClient<Self> {
        &console.admins
    }

    fn status_toggle(&self) -> AdminPatch {
        AdminPatch {
            status: Some(self.status.toggled()),
            ..AdminPatch::default()
        }
    }
}

/// Everything the view layer talks to.
#[derive(Clone)]
pub struct FleetConsole {
    buses: ResourceClient<Bus>,
    routes: ResourceClient<Route>,
    drivers: ResourceClient<Driver>,
    admins: ResourceClient<Admin>,
    auth: AuthClient,
    profile: ProfileClient,
    desk: DriverDesk,
    sessions: SessionManager,
    locale: Locale,
}

impl FleetConsole {
    /// Console wired the way `config` asks for.
    pub fn from_config(config: &AppConfig) -> Result<Self, RequestError> {
        match config.data_source {
            DataSource::Fixtures => Ok(Self::fixtures(config.locale)),
            DataSource::Remote => {
                let transport = ApiTransport::new(&config.api)?;
                let fallback_logins = config.fixture_login.then(CredentialStore::default);
                info!(
                    base_url = %transport.base_url(),
                    fixture_login = config.fixture_login,
                    "using remote backend"
                );
                Ok(Self::assemble(
                    ResourceClient::remote(transport.clone(), EntityStore::new(fixtures::buses())),
                    ResourceClient::remote(transport.clone(), EntityStore::new(fixtures::routes())),
                    ResourceClient::remote(
                        transport.clone(),
                        EntityStore::new(fixtures::drivers()),
                    ),
                    ResourceClient::remote(transport.clone(), EntityStore::new(fixtures::admins())),
                    AuthClient::remote(transport.clone(), config.api.login, fallback_logins),
                    ProfileClient::remote(transport),
                    config.locale,
                ))
            }
        }
    }

    /// Console that never leaves the process.
    pub fn fixtures(locale: Locale) -> Self {
        info!("using fixture data");
        let credentials = CredentialStore::default();
        Self::assemble(
            ResourceClient::in_memory(EntityStore::new(fixtures::buses())),
            ResourceClient::in_memory(EntityStore::new(fixtures::routes())),
            ResourceClient::in_memory(EntityStore::new(fixtures::drivers())),
            ResourceClient::in_memory(EntityStore::new(fixtures::admins())),
            AuthClient::fixtures(credentials.clone()),
            ProfileClient::fixtures(credentials),
            locale,
        )
    }

    fn assemble(
        buses: ResourceClient<Bus>,
        routes: ResourceClient<Route>,
        drivers: ResourceClient<Driver>,
        admins: ResourceClient<Admin>,
        auth: AuthClient,
        profile: ProfileClient,
        locale: Locale,
    ) -> Self {
        let desk = DriverDesk::new(drivers.clone(), buses.clone());
        Self {
            buses,
            routes,
            drivers,
            admins,
            auth,
            profile,
            desk,
            sessions: SessionManager::new(),
            locale,
        }
    }

    /// Language of the notices.
    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Session state owner.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Authenticate and start a session. `Ok(None)` on bad credentials.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Session>, ConsoleError> {
        self.sessions.login(&self.auth, username, password).await
    }

    /// Close the live session; returns whether one was open.
    pub fn logout(&self) -> bool {
        self.sessions.logout(&self.auth)
    }

    /// Every record of `T`.
    pub async fn list<T: Managed>(&self, session: &Session) -> Result<Vec<T>, ConsoleError> {
        self.sessions.authorize(session, T::VIEW)?;
        Ok(T::client(self).get_all().await)
    }

    /// Record of `T` with `id`.
    pub async fn get<T: Managed>(
        &self,
        session: &Session,
        id: &str,
    ) -> Result<Option<T>, ConsoleError> {
        self.sessions.authorize(session, T::VIEW)?;
        Ok(T::client(self).get_by_id(id).await)
    }

    /// Create a record of `T`.
    pub async fn create<T: Managed>(
        &self,
        session: &Session,
        draft: &T::Draft,
    ) -> Result<T, ConsoleError> {
        self.sessions.authorize(session, T::MANAGE)?;
        Ok(T::client(self).create(draft).await?)
    }

    /// Merge `patch` over the record of `T` with `id`.
    pub async fn update<T: Managed>(
        &self,
        session: &Session,
        id: &str,
        patch: &T::Patch,
    ) -> Result<Option<T>, ConsoleError> {
        self.sessions.authorize(session, T::MANAGE)?;
        Ok(T::client(self).update(id, patch).await?)
    }

    /// Delete the record of `T` with `id`.
    pub async fn delete<T: Managed>(
        &self,
        session: &Session,
        id: &str,
    ) -> Result<bool, ConsoleError> {
        self.sessions.authorize(session, T::MANAGE)?;
        Ok(T::client(self).delete(id).await?)
    }

    /// Move the record of `T` with `id` to its next status.
    ///
    /// Buses cycle active, maintenance, inactive; everything else flips.
    pub async fn toggle_status<T: Managed>(
        &self,
        session: &Session,
        id: &str,
    ) -> Result<Option<T>, ConsoleError> {
        self.sessions.authorize(session, T::MANAGE)?;
        let client = T::client(self);
        let Some(record) = client.get_by_id(id).await else {
            return Ok(None);
        };
        Ok(client.update(id, &record.status_toggle()).await?)
    }

    /// Active buses, offered when assigning a driver.
    pub async fn assignable_buses(&self, session: &Session) -> Result<Vec<Bus>, ConsoleError> {
        self.sessions.authorize(session, Action::ViewFleet)?;
        let buses = self.buses.get_all().await;
        Ok(buses
            .into_iter()
            .filter(|bus| bus.status == BusStatus::Active)
            .collect())
    }

    /// The driver's own record and, when assigned, their bus.
    pub async fn my_driver(&self, session: &Session) -> Result<DriverView, ConsoleError> {
        self.sessions.authorize(session, Action::ViewOwnDriver)?;
        let driver_id = own_driver_id(session, Action::ViewOwnDriver)?;
        let mut view = self.desk.view(driver_id).await;
        if !session.permits(Action::ViewAssignedBus) {
            view.bus = None;
        }
        Ok(view)
    }

    /// Change phone and email on the driver's own record.
    pub async fn update_my_contact(
        &self,
        session: &Session,
        contact: DriverContact,
    ) -> Result<Option<Driver>, ConsoleError> {
        self.sessions.authorize(session, Action::EditOwnDriverContact)?;
        let driver_id = own_driver_id(session, Action::EditOwnDriverContact)?;
        contact.validate()?;
        Ok(self.desk.update_contact(driver_id, contact).await?)
    }

    /// Profile of the session's account.
    pub async fn profile(&self, session: &Session) -> Result<Profile, ConsoleError> {
        self.sessions.authorize(session, Action::ViewProfile)?;
        Ok(self.profile.fetch(session).await)
    }

    /// Save name and phone on the session's account.
    pub async fn update_profile(
        &self,
        session: &Session,
        update: ProfileUpdate,
    ) -> Result<Profile, ConsoleError> {
        self.sessions.authorize(session, Action::ViewProfile)?;
        self.profile.update(session, update).await
    }

    /// Replace the session account's password.
    pub async fn change_password(
        &self,
        session: &Session,
        change: &PasswordChange,
    ) -> Result<(), ConsoleError> {
        self.sessions.authorize(session, Action::ChangePassword)?;
        self.profile.change_password(session, change).await
    }
}

/// Driver record behind `session`; only driver principals have one.
fn own_driver_id(session: &Session, action: Action) -> Result<&str, ConsoleError> {
    session
        .principal()
        .driver_id()
        .ok_or(ConsoleError::Forbidden(action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ApiConfig,
        error::SessionError,
        models::{ActivityStatus, AdminRole, NewAdmin, NewBus, Role, User},
        testing::unreachable_base_url,
    };

    async fn logged_in(console: &FleetConsole, username: &str) -> anyhow::Result<Session> {
        let password = format!("{username}123");
        console
            .login(username, &password)
            .await?
            .ok_or_else(|| anyhow::anyhow!("{username} rejected"))
    }

    fn new_admin() -> NewAdmin {
        NewAdmin {
            name: "Rosa Díaz".to_string(),
            email: "rosa@etransa.com".to_string(),
            username: "rosa".to_string(),
            role: AdminRole::Editor,
            status: ActivityStatus::Active,
        }
    }

    #[tokio::test]
    async fn readmin_cannot_touch_admin_accounts() -> anyhow::Result<()> {
        let console = FleetConsole::fixtures(Locale::Es);
        let readmin = logged_in(&console, "readmin").await?;

        let listed = console.list::<Admin>(&readmin).await;
        assert!(matches!(listed, Err(ConsoleError::Forbidden(Action::ViewAdmins))));
        let created = console.create::<Admin>(&readmin, &new_admin()).await;
        assert!(matches!(created, Err(ConsoleError::Forbidden(Action::ManageAdmins))));
        let deleted = console.delete::<Admin>(&readmin, "1").await;
        assert!(matches!(deleted, Err(ConsoleError::Forbidden(Action::ManageAdmins))));

        assert_eq!(console.list::<Bus>(&readmin).await?.len(), 3);
        assert!(console.delete::<Route>(&readmin, "r3").await?);
        Ok(())
    }

    #[tokio::test]
    async fn admin_manages_accounts() -> anyhow::Result<()> {
        let console = FleetConsole::fixtures(Locale::Es);
        let admin = logged_in(&console, "admin").await?;

        let created = console.create::<Admin>(&admin, &new_admin()).await?;
        assert!(created.id.starts_with('a'));
        assert_eq!(created.created_at, chrono::Local::now().date_naive());

        let toggled = console
            .toggle_status::<Admin>(&admin, &created.id)
            .await?
            .map(|account| account.status);
        assert_eq!(toggled, Some(ActivityStatus::Inactive));
        assert_eq!(console.list::<Admin>(&admin).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn driver_only_reaches_own_record() -> anyhow::Result<()> {
        let console = FleetConsole::fixtures(Locale::Es);
        let driver = logged_in(&console, "chofer").await?;

        let view = console.my_driver(&driver).await?;
        assert_eq!(view.driver.map(|d| d.id), Some("d1".to_string()));
        assert_eq!(view.bus.map(|b| b.id), Some("b1".to_string()));

        assert!(matches!(
            console.get::<Driver>(&driver, "d2").await,
            Err(ConsoleError::Forbidden(Action::ViewFleet))
        ));
        assert!(matches!(
            console.list::<Bus>(&driver).await,
            Err(ConsoleError::Forbidden(Action::ViewFleet))
        ));
        let patch = DriverPatch {
            experience: Some(30),
            ..DriverPatch::default()
        };
        assert!(matches!(
            console.update::<Driver>(&driver, "d1", &patch).await,
            Err(ConsoleError::Forbidden(Action::ManageFleet))
        ));

        let updated = console
            .update_my_contact(
                &driver,
                DriverContact {
                    phone: "900123123".to_string(),
                    email: "carlos.r@etransa.com".to_string(),
                },
            )
            .await?
            .ok_or_else(|| anyhow::anyhow!("d1 vanished"))?;
        assert_eq!(updated.phone, "900123123");
        assert_eq!(updated.experience, 8);
        Ok(())
    }

    #[tokio::test]
    async fn logged_out_session_is_refused() -> anyhow::Result<()> {
        let console = FleetConsole::fixtures(Locale::Es);
        let admin = logged_in(&console, "admin").await?;
        assert!(console.logout());

        assert!(matches!(
            console.delete::<Bus>(&admin, "b1").await,
            Err(ConsoleError::Session(SessionError::NotLoggedIn))
        ));
        assert!(matches!(
            console.list::<Route>(&admin).await,
            Err(ConsoleError::Session(SessionError::NotLoggedIn))
        ));

        let again = logged_in(&console, "admin").await?;
        assert!(matches!(
            console.delete::<Bus>(&admin, "b1").await,
            Err(ConsoleError::Session(SessionError::NotLoggedIn))
        ));
        assert_eq!(console.list::<Bus>(&again).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn session_built_outside_login_is_refused() -> anyhow::Result<()> {
        let console = FleetConsole::fixtures(Locale::Es);
        let forged = Session::new(User {
            id: "1".to_string(),
            username: "admin".to_string(),
            name: "Juan Pérez".to_string(),
            email: "admin@etransa.com".to_string(),
            role: Role::Admin,
            driver_id: None,
        })?;
        assert!(matches!(
            console.delete::<Admin>(&forged, "1").await,
            Err(ConsoleError::Session(SessionError::NotLoggedIn))
        ));

        let readmin = logged_in(&console, "readmin").await?;
        assert!(matches!(
            console.delete::<Admin>(&forged, "1").await,
            Err(ConsoleError::Session(SessionError::NotLoggedIn))
        ));
        assert!(matches!(
            console.delete::<Admin>(&readmin, "1").await,
            Err(ConsoleError::Forbidden(Action::ManageAdmins))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn admins_have_no_driver_page() -> anyhow::Result<()> {
        let console = FleetConsole::fixtures(Locale::Es);
        let admin = logged_in(&console, "admin").await?;
        assert!(matches!(
            console.my_driver(&admin).await,
            Err(ConsoleError::Forbidden(Action::ViewOwnDriver))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn bus_status_cycles_and_filters_assignable() -> anyhow::Result<()> {
        let console = FleetConsole::fixtures(Locale::Es);
        let admin = logged_in(&console, "admin").await?;

        let status = console
            .toggle_status::<Bus>(&admin, "b1")
            .await?
            .map(|bus| bus.status);
        assert_eq!(status, Some(BusStatus::Maintenance));
        assert_eq!(console.toggle_status::<Bus>(&admin, "b404").await?, None);

        let assignable: Vec<String> = console
            .assignable_buses(&admin)
            .await?
            .into_iter()
            .map(|bus| bus.id)
            .collect();
        assert!(!assignable.contains(&"b1".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_backend_serves_fixture_reads() -> anyhow::Result<()> {
        let config = AppConfig {
            api: ApiConfig {
                base_url: unreachable_base_url()?,
                timeout_secs: 2,
                ..ApiConfig::default()
            },
            ..AppConfig::default()
        };
        let console = FleetConsole::from_config(&config)?;
        let admin = logged_in(&console, "admin").await?;

        assert_eq!(console.list::<Route>(&admin).await?, fixtures::routes());
        let bus = NewBus {
            plate: "ZZZ-999".to_string(),
            model: "Volvo 9800".to_string(),
            capacity: 50,
            year: 2025,
            status: BusStatus::Active,
        };
        assert!(matches!(
            console.create::<Bus>(&admin, &bus).await,
            Err(ConsoleError::Request(_))
        ));
        assert_eq!(console.list::<Bus>(&admin).await?.len(), 3);

        assert!(console.logout());
        assert!(console.sessions().current().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn fixture_login_can_be_disabled() -> anyhow::Result<()> {
        let config = AppConfig {
            fixture_login: false,
            api: ApiConfig {
                base_url: unreachable_base_url()?,
                timeout_secs: 2,
                ..ApiConfig::default()
            },
            ..AppConfig::default()
        };
        let console = FleetConsole::from_config(&config)?;
        assert!(matches!(
            console.login("admin", "admin123").await,
            Err(ConsoleError::Request(_))
        ));
        Ok(())
    }
}
