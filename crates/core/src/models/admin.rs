#![allow(missing_docs)]

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{deserialize_date, merge, ActivityStatus, Entity};

/// Role of an admin account.
///
/// Deployments use either `admin`/`readmin` or the alternate
/// `super-admin`/`admin`/`editor` scheme; both deserialize here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdminRole {
    SuperAdmin,
    Admin,
    Readmin,
    Editor,
}

impl AdminRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super-admin",
            Self::Admin => "admin",
            Self::Readmin => "readmin",
            Self::Editor => "editor",
        }
    }

    /// Parse the wire label, as typed into the console form.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "super-admin" => Some(Self::SuperAdmin),
            "admin" => Some(Self::Admin),
            "readmin" => Some(Self::Readmin),
            "editor" => Some(Self::Editor),
            _ => None,
        }
    }
}

/// An administrator account as listed in the admin-management section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Intended unique; not enforced.
    pub username: String,
    pub role: AdminRole,
    /// Sent as a date or a full timestamp; only the date is kept.
    #[serde(deserialize_with = "deserialize_date")]
    pub created_at: NaiveDate,
    /// Older backends omit the field; such accounts are active.
    #[serde(default)]
    pub status: ActivityStatus,
}

/// Creation input for [`Admin`]; `createdAt` is stamped on creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAdmin {
    pub name: String,
    pub email: String,
    pub username: String,
    pub role: AdminRole,
    #[serde(default)]
    pub status: ActivityStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<AdminRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ActivityStatus>,
}

impl Entity for Admin {
    type Draft = NewAdmin;
    type Patch = AdminPatch;

    const COLLECTION: &'static str = "admins";
    const ID_PREFIX: &'static str = "a";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: NewAdmin) -> Self {
        Self {
            id,
            name: draft.name,
            email: draft.email,
            username: draft.username,
            role: draft.role,
            created_at: Local::now().date_naive(),
            status: draft.status,
        }
    }

    fn apply(&mut self, patch: AdminPatch) {
        merge(&mut self.name, patch.name);
        merge(&mut self.email, patch.email);
        merge(&mut self.username, patch.username);
        merge(&mut self.role, patch.role);
        merge(&mut self.status, patch.status);
    }
}
