//! Common types and utilities shared across CLI commands.

use std::path::Path;

use aquanav::config::ConfigFile;
use aquanav::geo::LatLon;
use aquanav::log::{init_logging, LogGuard};

use crate::error::CliError;

/// Parses a `LAT,LON` pair given on the command line.
pub fn parse_coordinate(value: &str) -> Result<LatLon, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got '{}'", value))?;

    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;

    let point = LatLon::new(lat, lon);
    if !point.is_valid() {
        return Err(format!("coordinate ({}, {}) is out of range", lat, lon));
    }
    Ok(point)
}

/// Loads the config file (or `--config` override), falling back to defaults
/// only when no file exists.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) => Ok(ConfigFile::load_from(path)?),
        None => Ok(ConfigFile::load()?),
    }
}

/// Installs logging from config. `--verbose` raises the level to debug.
pub fn setup_logging(config: &ConfigFile, verbose: bool) -> Result<LogGuard, CliError> {
    let mut log_config = config.logging.clone();
    if verbose {
        log_config = log_config.with_level("aquanav=debug,info");
    }
    Ok(init_logging(&log_config)?)
}
