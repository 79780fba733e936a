mod config;

pub use config::{Config, CountdownConfig, DisplayConfig};

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Returns `~/.config/flipclock[-dev]/` based on FLIPCLOCK_ENV.
///
/// Set FLIPCLOCK_ENV=dev to use the development directory, or
/// FLIPCLOCK_CONFIG_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if no home directory can be determined or if
/// creating the config directory fails.
pub fn config_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("FLIPCLOCK_CONFIG_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .ok_or(ConfigError::NoConfigDir)?
                .join(".config");

            let env = std::env::var("FLIPCLOCK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("flipclock-dev")
            } else {
                base_dir.join("flipclock")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
