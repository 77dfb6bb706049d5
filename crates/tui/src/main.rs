mod app;
mod form;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    sync::Mutex,
};

use fleet_core::{
    config::{self, AppConfig},
    FleetConsole,
};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config_path = config::ensure_default_config()?;
    let config = AppConfig::load()?;
    tracing::info!(
        path = %config_path.display(),
        source = ?config.data_source,
        "configuration loaded"
    );

    let console =
        FleetConsole::from_config(&config).context("failed to set up the backend client")?;

    let mut app = app::FleetApp::new(console);
    app.run().await
}

/// Log to `logs/fleetadmin.log`; stdout belongs to the terminal UI.
fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("fleetadmin.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
