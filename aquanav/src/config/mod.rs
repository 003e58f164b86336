//! Configuration.
//!
//! Settings live in `~/.aquanav/config.ini`. Each engine component takes
//! its own typed config ([`RouteServiceConfig`], [`NavigationConfig`],
//! [`FeedConfig`], [`LogConfig`], and the tracker's
//! [`TrackerConfig`](crate::position::TrackerConfig)), so the file is only
//! one way of producing them.

mod file;
mod settings;

pub use file::{ConfigFile, TrackerSection};
pub use settings::{
    FeedConfig, LogConfig, NavigationConfig, RouteServiceConfig, DEFAULT_FEED_CONNECT_TIMEOUT,
    DEFAULT_ROUTE_BASE_URL, DEFAULT_ROUTE_PROFILE, DEFAULT_ROUTE_TIMEOUT, DEFAULT_SETTLE_DELAY,
    MAX_ROUTE_TIMEOUT, MIN_ROUTE_TIMEOUT,
};

use std::path::PathBuf;

use thiserror::Error;

/// Configuration directory name under the user's home.
pub const CONFIG_DIR_NAME: &str = ".aquanav";

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors raised while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Failed to read config {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to write config {path}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("Invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// `~/.aquanav`
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR_NAME))
        .ok_or(ConfigError::NoHomeDir)
}

/// `~/.aquanav/config.ini`
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}
