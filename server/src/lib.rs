//! PyroPrint HTTP service: per-session photo tuning and A4/A3 sheet output.

pub mod app;
pub mod config;
pub mod server;
pub mod services;
pub mod session;

use std::path::PathBuf;

use pyro_db::Database;

use config::AppConfig;

/// Determine the data directory for the application.
/// Priority: PYROPRINT_DATA_DIR env var > ~/.pyroprint
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PYROPRINT_DATA_DIR") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pyroprint")
}

/// Load .env from multiple candidate paths.
pub fn load_dotenv() {
    let candidates = [".env", "../.env", "../../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}

/// Load environment, open the database and build the runtime config.
pub fn init_foundation() -> Result<(Database, AppConfig, PathBuf), anyhow::Error> {
    load_dotenv();

    let dir = data_dir();
    std::fs::create_dir_all(&dir)?;
    let db_path = dir.join("pyroprint.db");

    tracing::info!("Opening database at {}", db_path.display());
    let db = Database::open(&db_path)?;

    let config = AppConfig::load();
    tracing::info!(
        port = config.server_port,
        throttle_ms = config.throttle.as_millis() as u64,
        render_timeout_s = config.render_timeout.as_secs(),
        "Settings loaded"
    );
    Ok((db, config, dir))
}
