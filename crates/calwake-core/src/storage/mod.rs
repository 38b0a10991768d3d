mod config;
mod schedule_store;

pub use config::Config;
pub use schedule_store::{ScheduleSnapshot, ScheduleStore};

use std::path::PathBuf;

/// Returns `~/.config/calwake[-dev]/` based on CALWAKE_ENV.
///
/// Set CALWAKE_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("CALWAKE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("calwake-dev")
    } else {
        base_dir.join("calwake")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
