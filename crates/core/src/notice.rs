//! Localized toast-style notices reported back to the view layer.

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConsoleError, ValidationError},
    session::Section,
};

/// Language of the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Spanish.
    #[default]
    Es,
    /// English.
    En,
}

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// The action went through.
    Success,
    /// The action failed; nothing changed.
    Error,
    /// Session changes and other neutral news.
    Info,
}

/// Transient message shown after an action completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub kind: NoticeKind,
    /// Rendered text.
    pub text: String,
}

/// Outcome the console wants to tell the user about.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Created(Section),
    Updated(Section),
    Deleted(Section),
    StatusChanged(Section),
    SaveFailed(Section),
    DeleteFailed(Section),
    ProfileUpdated,
    PasswordChanged,
    PasswordMismatch,
    BadCredentials,
    Forbidden,
    LoggedIn(String),
    LoggedOut,
}

impl Message {
    fn kind(&self) -> NoticeKind {
        match self {
            Self::Created(_)
            | Self::Updated(_)
            | Self::Deleted(_)
            | Self::StatusChanged(_)
            | Self::ProfileUpdated
            | Self::PasswordChanged => NoticeKind::Success,
            Self::SaveFailed(_)
            | Self::DeleteFailed(_)
            | Self::PasswordMismatch
            | Self::BadCredentials
            | Self::Forbidden => NoticeKind::Error,
            Self::LoggedIn(_) | Self::LoggedOut => NoticeKind::Info,
        }
    }
}

impl Locale {
    /// Render `message` in this language.
    pub fn render(self, message: &Message) -> String {
        match self {
            Self::Es => render_es(message),
            Self::En => render_en(message),
        }
    }

    /// Build a notice for `message`.
    pub fn notice(self, message: Message) -> Notice {
        Notice {
            kind: message.kind(),
            text: self.render(&message),
        }
    }

    /// Build an error notice for a failed action in `section`.
    ///
    /// `failed` is the generic message; validation and gate failures get their own text.
    pub fn failure(self, failed: Message, err: &ConsoleError) -> Notice {
        let message = match err {
            ConsoleError::Validation(ValidationError::PasswordMismatch) => {
                Message::PasswordMismatch
            }
            ConsoleError::Forbidden(_) => Message::Forbidden,
            ConsoleError::InvalidCredentials => Message::BadCredentials,
            _ => failed,
        };
        let mut notice = self.notice(message);
        notice.kind = NoticeKind::Error;
        if let ConsoleError::Request(_) | ConsoleError::Validation(_) = err {
            notice.text = format!("{}: {err}", notice.text);
        }
        notice
    }
}

fn section_es(section: Section) -> &'static str {
    match section {
        Section::Buses => "Bus",
        Section::Routes => "Ruta",
        Section::Drivers | Section::MyDriver => "Chofer",
        Section::Admins => "Administrador",
        Section::Profile => "Perfil",
    }
}

fn section_en(section: Section) -> &'static str {
    match section {
        Section::Buses => "Bus",
        Section::Routes => "Route",
        Section::Drivers | Section::MyDriver => "Driver",
        Section::Admins => "Administrator",
        Section::Profile => "Profile",
    }
}

fn render_es(message: &Message) -> String {
    match message {
        Message::Created(section) => format!("{} creado correctamente", section_es(*section)),
        Message::Updated(section) => {
            format!("{} actualizado correctamente", section_es(*section))
        }
        Message::Deleted(section) => format!("{} eliminado correctamente", section_es(*section)),
        Message::StatusChanged(section) => {
            format!("Estado de {} actualizado", section_es(*section).to_lowercase())
        }
        Message::SaveFailed(section) => {
            format!("Error al guardar {}", section_es(*section).to_lowercase())
        }
        Message::DeleteFailed(section) => {
            format!("Error al eliminar {}", section_es(*section).to_lowercase())
        }
        Message::ProfileUpdated => "Perfil actualizado correctamente".to_string(),
        Message::PasswordChanged => "Contraseña actualizada correctamente".to_string(),
        Message::PasswordMismatch => "Las contraseñas no coinciden".to_string(),
        Message::BadCredentials => "Usuario o contraseña incorrectos".to_string(),
        Message::Forbidden => "No tiene permisos para esta acción".to_string(),
        Message::LoggedIn(name) => format!("Bienvenido, {name}"),
        Message::LoggedOut => "Sesión cerrada".to_string(),
    }
}

fn render_en(message: &Message) -> String {
    match message {
        Message::Created(section) => format!("{} created", section_en(*section)),
        Message::Updated(section) => format!("{} updated", section_en(*section)),
        Message::Deleted(section) => format!("{} deleted", section_en(*section)),
        Message::StatusChanged(section) => {
            format!("{} status updated", section_en(*section))
        }
        Message::SaveFailed(section) => {
            format!("Failed to save {}", section_en(*section).to_lowercase())
        }
        Message::DeleteFailed(section) => {
            format!("Failed to delete {}", section_en(*section).to_lowercase())
        }
        Message::ProfileUpdated => "Profile updated".to_string(),
        Message::PasswordChanged => "Password updated".to_string(),
        Message::PasswordMismatch => "Passwords do not match".to_string(),
        Message::BadCredentials => "Incorrect username or password".to_string(),
        Message::Forbidden => "You are not allowed to do that".to_string(),
        Message::LoggedIn(name) => format!("Welcome, {name}"),
        Message::LoggedOut => "Signed out".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Action;

    #[test]
    fn renders_spanish_by_default() {
        let notice = Locale::default().notice(Message::Deleted(Section::Buses));
        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(notice.text, "Bus eliminado correctamente");
    }

    #[test]
    fn forbidden_failure_uses_its_own_text() {
        let err = ConsoleError::Forbidden(Action::ManageAdmins);
        let notice = Locale::En.failure(Message::SaveFailed(Section::Admins), &err);
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.text, "You are not allowed to do that");
    }

    #[test]
    fn password_mismatch_is_reported_as_such() {
        let err = ConsoleError::Validation(ValidationError::PasswordMismatch);
        let notice = Locale::Es.failure(Message::SaveFailed(Section::Profile), &err);
        assert!(notice.text.starts_with("Las contraseñas no coinciden"));
    }
}
