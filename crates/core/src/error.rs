//! Error types shared by the clients and the console facade.

use thiserror::Error;

use crate::session::Action;

/// Failure of a single backend request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The backend could not be reached (refused, DNS, timeout, ...).
    #[error("backend unreachable: {0}")]
    Connectivity(#[source] reqwest::Error),
    /// The backend answered with a non-success status code.
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body, kept for diagnostics.
        body: String,
    },
    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),
    /// The configured base URL cannot carry resource paths.
    #[error("invalid base URL {0}")]
    InvalidUrl(String),
    /// The HTTP client itself could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl RequestError {
    /// True when the backend was never reached.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }

    /// True when the backend answered `404 Not Found`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::Client(err)
        } else {
            Self::Connectivity(err)
        }
    }
}

/// Input rejected before any request is issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// New password and its confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,
    /// New password is blank.
    #[error("password must not be empty")]
    EmptyPassword,
    /// A form field holds an unusable value.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Field name as shown on the wire.
        field: &'static str,
        /// Human readable reason.
        reason: String,
    },
}

impl ValidationError {
    pub(crate) fn field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Problems turning a login result into a live session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A driver account arrived without the driver record it belongs to.
    #[error("driver account {0} has no driverId")]
    MissingDriverId(String),
    /// The operation needs a logged-in session.
    #[error("no active session")]
    NotLoggedIn,
}

/// Everything the console facade can report back to a view.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Backend request failed.
    #[error(transparent)]
    Request(#[from] RequestError),
    /// Input rejected locally.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Session could not be established or is missing.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// The role gate refused the action for the current session.
    #[error("action not permitted: {0}")]
    Forbidden(Action),
    /// Current password did not match during a local password change.
    #[error("invalid credentials")]
    InvalidCredentials,
}
