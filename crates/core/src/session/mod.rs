//! Session ownership and the role gate.
//!
//! The live [`Session`] is owned by one [`SessionManager`] and handed out as
//! an immutable value; views subscribe to replacements instead of sharing
//! mutable state.

mod gate;
mod manager;

pub use gate::{can_manage_admins, permits, sections_for, Action, Principal, Section};
pub use manager::{Session, SessionManager, SessionState};
