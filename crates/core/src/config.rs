//! Application configuration.
//!
//! Values are layered: serde defaults, then `~/.config/fleetadmin/config.toml`,
//! then `FLEETADMIN__*` environment variables (`FLEETADMIN__API__BASE_URL`).

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::notice::Locale;

/// Directory under the user's config dir holding `config.toml`.
pub const CONFIG_DIR: &str = "fleetadmin";
/// Prefix of the environment overrides.
pub const ENV_PREFIX: &str = "FLEETADMIN";

const DEFAULT_CONFIG: &str = r#"# fleetadmin configuration

# "remote" talks to the REST backend and falls back to fixtures on failed reads.
# "fixtures" never leaves the process.
data_source = "remote"

# Language of console notices: "es" or "en".
locale = "es"

# Accept the demo accounts when the backend is unreachable.
fixture_login = true

[api]
base_url = "http://localhost:8080/api"
# "administrador" posts {correo, contrasena} to /administrador/login,
# "auth" posts {username, password} to /auth/login.
login = "administrador"
timeout_secs = 10
"#;

/// Where resource clients read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// REST backend with fixture fallback on reads.
    #[default]
    Remote,
    /// In-memory fixtures only.
    Fixtures,
}

/// Shape of the login request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginFlavor {
    /// `POST /administrador/login` with `{correo, contrasena}`.
    #[default]
    Administrador,
    /// `POST /auth/login` with `{username, password}`.
    Auth,
}

impl LoginFlavor {
    /// Endpoint path relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Self::Administrador => "/administrador/login",
            Self::Auth => "/auth/login",
        }
    }

    /// [`LoginFlavor::path`] split into URL segments.
    pub fn segments(self) -> &'static [&'static str] {
        match self {
            Self::Administrador => &["administrador", "login"],
            Self::Auth => &["auth", "login"],
        }
    }
}

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every resource path is appended to.
    pub base_url: String,
    /// Login request flavor.
    pub login: LoginFlavor,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            login: LoginFlavor::default(),
            timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    /// Request timeout, never shorter than one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Remote backend or fixtures.
    pub data_source: DataSource,
    /// Notice language.
    pub locale: Locale,
    /// Whether the demo accounts are accepted when the backend is down.
    pub fixture_login: bool,
    /// Backend settings.
    pub api: ApiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_source: DataSource::default(),
            locale: Locale::default(),
            fixture_login: true,
            api: ApiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the default config file and the process environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load from `path` (optional) and the process environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        build(path.as_ref(), None)
    }
}

fn build(path: &Path, env: Option<HashMap<String, String>>) -> Result<AppConfig> {
    let settings = Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(env),
        )
        .build()
        .with_context(|| format!("failed to read configuration {}", path.display()))?;

    settings
        .try_deserialize()
        .with_context(|| format!("invalid configuration in {}", path.display()))
}

/// Path of the user's config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join("config.toml")
}

/// Write the commented default config when none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let temp = tempdir()?;
        let config = build(&temp.path().join("absent.toml"), Some(HashMap::new()))?;
        assert_eq!(config, AppConfig::default());
        Ok(())
    }

    #[test]
    fn default_file_round_trips_to_defaults() -> Result<()> {
        let temp = tempdir()?;
        let path = temp.path().join("fleetadmin/config.toml");
        write_default_config(&path)?;
        assert!(path.is_file());

        let config = build(&path, Some(HashMap::new()))?;
        assert_eq!(config, AppConfig::default());
        Ok(())
    }

    #[test]
    fn existing_file_is_not_overwritten() -> Result<()> {
        let temp = tempdir()?;
        let path = temp.path().join("config.toml");
        fs::write(&path, "data_source = \"fixtures\"\n")?;
        write_default_config(&path)?;

        let config = build(&path, Some(HashMap::new()))?;
        assert_eq!(config.data_source, DataSource::Fixtures);
        Ok(())
    }

    #[test]
    fn environment_overrides_file() -> Result<()> {
        let temp = tempdir()?;
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "locale = \"en\"\n[api]\nbase_url = \"http://file.invalid\"\nlogin = \"auth\"\n",
        )?;

        let env = HashMap::from([
            (
                "FLEETADMIN__API__BASE_URL".to_string(),
                "http://env.invalid/api".to_string(),
            ),
            ("FLEETADMIN__FIXTURE_LOGIN".to_string(), "false".to_string()),
        ]);
        let config = build(&path, Some(env))?;
        assert_eq!(config.api.base_url, "http://env.invalid/api");
        assert_eq!(config.api.login, LoginFlavor::Auth);
        assert_eq!(config.locale, Locale::En);
        assert!(!config.fixture_login);
        Ok(())
    }
}
