#![warn(clippy::all, missing_docs)]

//! Core data-access and session layer of the fleet admin console.
//!
//! This crate hosts the domain models, the fixture store, the resource
//! clients (REST backend with in-memory fallback), authentication, the
//! session manager and role gate, and the configuration used by the
//! terminal console and any future frontends.

pub mod auth;
pub mod config;
pub mod console;
pub mod driver;
pub mod error;
pub mod fixtures;
pub mod models;
pub mod notice;
pub mod profile;
pub mod resource;
pub mod session;
pub mod store;
pub mod transport;

#[cfg(test)]
mod testing;

pub use auth::{AuthClient, Authenticated, CredentialStore};
pub use config::AppConfig;
pub use console::{FleetConsole, Managed};
pub use driver::DriverView;
pub use error::{ConsoleError, RequestError, SessionError, ValidationError};
pub use models::{
    ActivityStatus, Admin, AdminPatch, AdminRole, Bus, BusPatch, BusStatus, Driver,
    DriverContact, DriverPatch, Entity, NewAdmin, NewBus, NewDriver, NewRoute, Role, Route,
    RoutePatch, User,
};
pub use notice::{Locale, Message, Notice, NoticeKind};
pub use profile::{PasswordChange, Profile, ProfileUpdate};
pub use resource::ResourceClient;
pub use session::{
    can_manage_admins, sections_for, Action, Principal, Section, Session, SessionManager,
    SessionState,
};
pub use store::EntityStore;
