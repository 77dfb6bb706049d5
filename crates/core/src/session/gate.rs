use std::fmt;

use tracing::warn;

use crate::{
    error::SessionError,
    models::{Role, User},
};

/// Validated role of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Manages the fleet and admin accounts.
    Admin,
    /// Manages the fleet only.
    ReadOnlyAdmin,
    /// Sees their own driver record and assigned bus.
    Driver {
        /// The driver record owned by this session.
        driver_id: String,
    },
}

impl Principal {
    /// Derive the principal of `user`; drivers must name their driver record.
    pub fn from_user(user: &User) -> Result<Self, SessionError> {
        let driver_id = user
            .driver_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());
        match user.role {
            Role::Driver => driver_id
                .map(|id| Self::Driver {
                    driver_id: id.to_string(),
                })
                .ok_or_else(|| SessionError::MissingDriverId(user.username.clone())),
            Role::Admin | Role::Readmin => {
                if driver_id.is_some() {
                    warn!(username = %user.username, "ignoring driverId on non-driver account");
                }
                Ok(if user.role == Role::Admin {
                    Self::Admin
                } else {
                    Self::ReadOnlyAdmin
                })
            }
        }
    }

    /// Wire role of this principal.
    pub fn role(&self) -> Role {
        match self {
            Self::Admin => Role::Admin,
            Self::ReadOnlyAdmin => Role::Readmin,
            Self::Driver { .. } => Role::Driver,
        }
    }

    /// Driver record owned by a driver session.
    pub fn driver_id(&self) -> Option<&str> {
        match self {
            Self::Driver { driver_id } => Some(driver_id),
            Self::Admin | Self::ReadOnlyAdmin => None,
        }
    }
}

/// Something a session may attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// List and read buses, routes and drivers.
    ViewFleet,
    /// Create, update, delete buses, routes and drivers.
    ManageFleet,
    /// List admin accounts.
    ViewAdmins,
    /// Create, update, toggle or delete admin accounts.
    ManageAdmins,
    /// Read the session's own driver record.
    ViewOwnDriver,
    /// Change phone and email on the session's own driver record.
    EditOwnDriverContact,
    /// Read the bus assigned to the session's driver record.
    ViewAssignedBus,
    /// Read and edit the account profile.
    ViewProfile,
    /// Change the account password.
    ChangePassword,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ViewFleet => "view fleet",
            Self::ManageFleet => "manage fleet",
            Self::ViewAdmins => "view admin accounts",
            Self::ManageAdmins => "manage admin accounts",
            Self::ViewOwnDriver => "view own driver record",
            Self::EditOwnDriverContact => "edit own driver contact",
            Self::ViewAssignedBus => "view assigned bus",
            Self::ViewProfile => "view profile",
            Self::ChangePassword => "change password",
        };
        f.write_str(label)
    }
}

/// Whether `principal` may perform `action`.
pub fn permits(principal: &Principal, action: Action) -> bool {
    match principal {
        Principal::Admin => match action {
            Action::ViewFleet
            | Action::ManageFleet
            | Action::ViewAdmins
            | Action::ManageAdmins
            | Action::ViewProfile
            | Action::ChangePassword => true,
            Action::ViewOwnDriver | Action::EditOwnDriverContact | Action::ViewAssignedBus => false,
        },
        Principal::ReadOnlyAdmin => match action {
            Action::ViewFleet
            | Action::ManageFleet
            | Action::ViewProfile
            | Action::ChangePassword => true,
            Action::ViewAdmins
            | Action::ManageAdmins
            | Action::ViewOwnDriver
            | Action::EditOwnDriverContact
            | Action::ViewAssignedBus => false,
        },
        Principal::Driver { .. } => match action {
            Action::ViewOwnDriver
            | Action::EditOwnDriverContact
            | Action::ViewAssignedBus
            | Action::ViewProfile
            | Action::ChangePassword => true,
            Action::ViewFleet | Action::ManageFleet | Action::ViewAdmins | Action::ManageAdmins => {
                false
            }
        },
    }
}

/// Only full administrators see the admin-management section.
pub fn can_manage_admins(principal: &Principal) -> bool {
    permits(principal, Action::ManageAdmins)
}

/// A console section (tab).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Bus list.
    Buses,
    /// Route list.
    Routes,
    /// Driver list.
    Drivers,
    /// Admin account list.
    Admins,
    /// A driver's own record and assigned bus.
    MyDriver,
    /// Account profile and password.
    Profile,
}

impl Section {
    /// Tab label.
    pub fn title(self) -> &'static str {
        match self {
            Self::Buses => "Buses",
            Self::Routes => "Rutas",
            Self::Drivers => "Choferes",
            Self::Admins => "Administradores",
            Self::MyDriver => "Mi Perfil",
            Self::Profile => "Perfil",
        }
    }

    /// Action needed to open the section.
    pub fn required_action(self) -> Action {
        match self {
            Self::Buses | Self::Routes | Self::Drivers => Action::ViewFleet,
            Self::Admins => Action::ViewAdmins,
            Self::MyDriver => Action::ViewOwnDriver,
            Self::Profile => Action::ViewProfile,
        }
    }
}

const ALL_SECTIONS: [Section; 6] = [
    Section::Buses,
    Section::Routes,
    Section::Drivers,
    Section::Admins,
    Section::MyDriver,
    Section::Profile,
];

/// Sections visible to `principal`, in display order.
pub fn sections_for(principal: &Principal) -> Vec<Section> {
    ALL_SECTIONS
        .into_iter()
        .filter(|section| permits(principal, section.required_action()))
        .collect()
}
