mod config;
pub mod migrations;
pub mod program_db;

pub use config::{Config, LoggingConfig, ProgramDefaults};
pub use program_db::{InsertOutcome, InstanceRef, InstanceSummary, ProgramDb};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the coachflow data directory, creating it if needed.
///
/// `COACHFLOW_DATA_DIR` wins when set. Otherwise `~/.config/coachflow[-dev]/`
/// depending on `COACHFLOW_ENV` (set `COACHFLOW_ENV=dev` for development data).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("COACHFLOW_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("COACHFLOW_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("coachflow-dev")
            } else {
                base_dir.join("coachflow")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
