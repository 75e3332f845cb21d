//! Application startup: data directory, database, settings, config.

use std::path::PathBuf;

use veda_db::Database;

use crate::config::{AppConfig, SettingsManager};

/// Foundation init (fatal on error): open the database, migrate and
/// initialize settings, load the runtime config.
pub fn init_foundation() -> Result<(Database, AppConfig, PathBuf), anyhow::Error> {
    load_dotenv();
    let dir = data_dir();
    std::fs::create_dir_all(&dir)?;

    let db_path = dir.join("local.db");
    tracing::info!("Opening database at {}", db_path.display());
    let db = Database::open(&db_path)?;

    let sm = SettingsManager::new(db.clone());
    if let Err(e) = sm.migrate_from_env() {
        tracing::error!("Failed to migrate settings from env: {e}");
    }
    sm.initialize_defaults()?;

    let config = AppConfig::load(&sm)?;

    if let Ok(missing) = sm.missing_required_settings() {
        if !missing.is_empty() {
            tracing::warn!("Missing required settings: {missing:?}");
        }
    }

    tracing::info!("Settings loaded (api={})", config.api_base_url);
    Ok((db, config, dir))
}

/// Determine the data directory for the application.
/// Priority: VEDA_PORTAL_DATA_DIR env var > ~/.veda-portal
fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("VEDA_PORTAL_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".veda-portal")
}

/// Load .env from multiple candidate paths.
fn load_dotenv() {
    let candidates = [".env", "../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}
