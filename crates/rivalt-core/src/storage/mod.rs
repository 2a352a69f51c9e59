mod config;
mod state;

pub use config::{Config, DefaultsConfig, LimitsConfig, SequencingConfig};
pub use state::ModelStore;

use std::path::PathBuf;

use crate::error::Result;

/// Returns `~/.config/rivalt[-dev]/` based on RIVALT_ENV.
///
/// Set RIVALT_ENV=dev to use the development data directory, or
/// RIVALT_DATA_DIR to use an explicit directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("RIVALT_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("RIVALT_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("rivalt-dev")
            } else {
                base_dir.join("rivalt")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
