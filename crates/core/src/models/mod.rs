//! Shared domain models.
//!
//! Every collection managed by the console implements [`Entity`], which ties
//! a record to its creation input ([`Entity::Draft`]), its partial update
//! ([`Entity::Patch`]) and its place in the REST surface.

use std::fmt::Debug;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{
    de::{self, DeserializeOwned},
    Deserialize, Deserializer, Serialize,
};

mod admin;
mod fleet;
mod user;

pub use admin::{Admin, AdminPatch, AdminRole, NewAdmin};
pub use fleet::{
    Bus, BusPatch, BusStatus, Driver, DriverContact, DriverPatch, NewBus, NewDriver, NewRoute,
    Route, RoutePatch,
};
pub use user::{Role, User};

/// A record held in one of the console collections.
pub trait Entity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Creation input: the record minus every server-assigned field.
    type Draft: Clone + Debug + Send + Sync + Serialize + 'static;
    /// Partial update; `Default` is the empty patch.
    type Patch: Clone + Debug + Default + Send + Sync + Serialize + 'static;

    /// Path segment of the collection (`/buses`, `/routes`, ...).
    const COLLECTION: &'static str;
    /// Prefix used for locally generated identifiers.
    const ID_PREFIX: &'static str;

    /// Opaque identifier, unique within the collection.
    fn id(&self) -> &str;

    /// Build the stored record from its creation input.
    fn from_draft(id: String, draft: Self::Draft) -> Self;

    /// Shallow-merge the provided fields over `self`.
    fn apply(&mut self, patch: Self::Patch);
}

/// Two-state status used by routes, drivers and admin accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    /// In service.
    #[default]
    Active,
    /// Out of service.
    Inactive,
}

impl ActivityStatus {
    /// The opposite status, used by the status toggles.
    pub fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive => Self::Active,
        }
    }

    /// Wire label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// Calendar date of `raw`: `YYYY-MM-DD`, or the date part of a timestamp.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|at| at.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|at| at.date())
        })
}

/// `deserialize_with` target for dates the backend may send as timestamps.
pub(crate) fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid date `{raw}`")))
}

/// Like [`deserialize_date`], for optional fields.
pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| {
            parse_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid date `{raw}`")))
        })
        .transpose()
}

pub(crate) fn merge<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}
