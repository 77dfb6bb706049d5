use serde::{Deserialize, Serialize};

/// Role carried by an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full administrator.
    Admin,
    /// Administrator without access to admin-account management.
    Readmin,
    /// Driver with access to their own record only.
    Driver,
}

impl Role {
    /// Wire label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Readmin => "readmin",
            Self::Driver => "driver",
        }
    }

    /// Label shown in the console header.
    pub fn label(self) -> &'static str {
        match self {
            Self::Admin => "Administrador",
            Self::Readmin => "Read Administrador",
            Self::Driver => "Chofer",
        }
    }
}

/// The user returned by a successful login.
///
/// Never carries a password; fixture credentials live in
/// [`crate::fixtures::FixtureCredential`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Account identifier.
    pub id: String,
    /// Login name.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// Role deciding what the session may do.
    pub role: Role,
    /// Driver record owned by this account; required when `role` is `driver`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
}
