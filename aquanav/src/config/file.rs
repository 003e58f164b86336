//! INI configuration file.
//!
//! ```ini
//! [routing]
//! base_url = https://router.project-osrm.org
//! profile = driving
//! timeout_secs = 20
//!
//! [tracking]
//! min_distance_m = 5
//! min_interval_ms = 1000
//! accuracy = navigation
//!
//! [navigation]
//! settle_delay_ms = 500
//!
//! [feed]
//! url = wss://example.org/sensors
//! connect_timeout_secs = 10
//!
//! [logging]
//! level = info
//! file = /var/log/aquanav.log
//! ansi = true
//! ```
//!
//! Every key is optional. Unknown keys are ignored.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use tracing::{debug, warn};

use super::settings::{
    FeedConfig, LogConfig, NavigationConfig, RouteServiceConfig, MAX_ROUTE_TIMEOUT,
    MIN_ROUTE_TIMEOUT,
};
use super::{config_file_path, ConfigError};
use crate::position::{AccuracyProfile, TrackerConfig};

/// All configurable settings, grouped by file section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub routing: RouteServiceConfig,
    pub tracking: TrackerSection,
    pub navigation: NavigationConfig,
    pub feed: FeedConfig,
    pub logging: LogConfig,
}

/// `[tracking]` section as written in the file.
///
/// Kept separate from [`TrackerConfig`] so the file round-trips exactly;
/// the floors are applied by [`ConfigFile::tracker_config`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSection {
    pub min_distance_m: f64,
    pub min_interval: Duration,
    pub accuracy: AccuracyProfile,
}

impl Default for TrackerSection {
    fn default() -> Self {
        let defaults = TrackerConfig::default();
        Self {
            min_distance_m: defaults.min_distance_m,
            min_interval: defaults.min_interval,
            accuracy: defaults.profile,
        }
    }
}

impl ConfigFile {
    /// Loads `~/.aquanav/config.ini`, falling back to defaults when the file
    /// does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path()?;
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Loads a specific file. A missing file is an error here.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = Self::from_ini(&ini)?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Parses configuration from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("routing")) {
            if let Some(url) = non_empty(section, "base_url") {
                config.routing.base_url = url.trim_end_matches('/').to_string();
            }
            if let Some(profile) = non_empty(section, "profile") {
                config.routing.profile = profile.to_string();
            }
            if let Some(secs) = parse_key::<u64>(section, "routing", "timeout_secs")? {
                let requested = Duration::from_secs(secs);
                if requested < MIN_ROUTE_TIMEOUT || requested > MAX_ROUTE_TIMEOUT {
                    warn!(
                        timeout_secs = secs,
                        "Route timeout outside 15-30 s, clamping"
                    );
                }
                config.routing = config.routing.with_timeout(requested);
            }
        }

        if let Some(section) = ini.section(Some("tracking")) {
            if let Some(meters) = parse_key::<f64>(section, "tracking", "min_distance_m")? {
                if !meters.is_finite() || meters < 0.0 {
                    return Err(invalid("tracking", "min_distance_m", meters, "must be >= 0"));
                }
                config.tracking.min_distance_m = meters;
            }
            if let Some(ms) = parse_key::<u64>(section, "tracking", "min_interval_ms")? {
                config.tracking.min_interval = Duration::from_millis(ms);
            }
            if let Some(raw) = non_empty(section, "accuracy") {
                config.tracking.accuracy = AccuracyProfile::parse(raw).ok_or_else(|| {
                    invalid(
                        "tracking",
                        "accuracy",
                        raw,
                        "expected balanced, high or navigation",
                    )
                })?;
            }
        }

        if let Some(section) = ini.section(Some("navigation")) {
            if let Some(ms) = parse_key::<u64>(section, "navigation", "settle_delay_ms")? {
                config.navigation.settle_delay = Duration::from_millis(ms);
            }
        }

        if let Some(section) = ini.section(Some("feed")) {
            if let Some(url) = non_empty(section, "url") {
                if !url.starts_with("ws://") && !url.starts_with("wss://") {
                    return Err(invalid("feed", "url", url, "expected ws:// or wss://"));
                }
                config.feed.url = Some(url.to_string());
            }
            if let Some(secs) = parse_key::<u64>(section, "feed", "connect_timeout_secs")? {
                if secs == 0 {
                    return Err(invalid("feed", "connect_timeout_secs", secs, "must be > 0"));
                }
                config.feed.connect_timeout = Duration::from_secs(secs);
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(level) = non_empty(section, "level") {
                config.logging.level = level.to_string();
            }
            if let Some(file) = non_empty(section, "file") {
                config.logging.file = Some(expand_home(file));
            }
            if let Some(ansi) = parse_key::<bool>(section, "logging", "ansi")? {
                config.logging.ansi = ansi;
            }
        }

        Ok(config)
    }

    /// Tracker configuration with the distance and interval floors applied.
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig::default()
            .with_min_distance(self.tracking.min_distance_m)
            .with_min_interval(self.tracking.min_interval)
            .with_profile(self.tracking.accuracy)
    }

    /// Renders the configuration as INI.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("routing"))
            .set("base_url", self.routing.base_url.as_str())
            .set("profile", self.routing.profile.as_str())
            .set("timeout_secs", self.routing.timeout.as_secs().to_string());

        ini.with_section(Some("tracking"))
            .set("min_distance_m", self.tracking.min_distance_m.to_string())
            .set(
                "min_interval_ms",
                self.tracking.min_interval.as_millis().to_string(),
            )
            .set("accuracy", self.tracking.accuracy.as_str());

        ini.with_section(Some("navigation")).set(
            "settle_delay_ms",
            self.navigation.settle_delay.as_millis().to_string(),
        );

        ini.with_section(Some("feed"))
            .set("url", self.feed.url.clone().unwrap_or_default())
            .set(
                "connect_timeout_secs",
                self.feed.connect_timeout.as_secs().to_string(),
            );

        ini.with_section(Some("logging"))
            .set("level", self.logging.level.as_str())
            .set(
                "file",
                self.logging
                    .file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            )
            .set("ansi", self.logging.ansi.to_string());

        ini
    }

    /// Writes to `~/.aquanav/config.ini`, creating the directory.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Writes to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                message: e.to_string(),
            })?;
        }
        self.to_ini()
            .write_to_file(path)
            .map_err(|e| ConfigError::Write {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section
        .get(key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_key<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match non_empty(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section_name, key, raw, "unparseable value")),
    }
}

fn invalid(section: &str, key: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{MIN_DISTANCE_FLOOR_M, MIN_INTERVAL_FLOOR};
    use tempfile::TempDir;

    #[test]
    fn test_empty_text_yields_defaults() {
        assert_eq!(ConfigFile::parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_parse_all_sections() {
        let text = r#"
[routing]
base_url = https://osrm.internal/
profile = walking
timeout_secs = 25

[tracking]
min_distance_m = 12.5
min_interval_ms = 2000
accuracy = high

[navigation]
settle_delay_ms = 250

[feed]
url = wss://feed.example.org/sensors
connect_timeout_secs = 4

[logging]
level = aquanav=debug
file = /tmp/aquanav.log
ansi = false
"#;
        let config = ConfigFile::parse(text).unwrap();

        assert_eq!(config.routing.base_url, "https://osrm.internal");
        assert_eq!(config.routing.profile, "walking");
        assert_eq!(config.routing.timeout, Duration::from_secs(25));
        assert_eq!(config.tracking.min_distance_m, 12.5);
        assert_eq!(config.tracking.min_interval, Duration::from_secs(2));
        assert_eq!(config.tracking.accuracy, AccuracyProfile::High);
        assert_eq!(config.navigation.settle_delay, Duration::from_millis(250));
        assert_eq!(
            config.feed.url.as_deref(),
            Some("wss://feed.example.org/sensors")
        );
        assert_eq!(config.feed.connect_timeout, Duration::from_secs(4));
        assert_eq!(config.logging.level, "aquanav=debug");
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/aquanav.log")));
        assert!(!config.logging.ansi);
    }

    #[test]
    fn test_timeout_out_of_range_is_clamped() {
        let config = ConfigFile::parse("[routing]\ntimeout_secs = 90\n").unwrap();
        assert_eq!(config.routing.timeout, MAX_ROUTE_TIMEOUT);
    }

    #[test]
    fn test_tracker_floors_applied() {
        let config =
            ConfigFile::parse("[tracking]\nmin_distance_m = 1\nmin_interval_ms = 100\n").unwrap();
        // The file keeps what was written
        assert_eq!(config.tracking.min_distance_m, 1.0);

        let tracker = config.tracker_config();
        assert_eq!(tracker.min_distance_m, MIN_DISTANCE_FLOOR_M);
        assert_eq!(tracker.min_interval, MIN_INTERVAL_FLOOR);
    }

    #[test]
    fn test_invalid_values() {
        let err = ConfigFile::parse("[routing]\ntimeout_secs = soon\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "timeout_secs"));

        let err = ConfigFile::parse("[tracking]\naccuracy = pinpoint\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "accuracy"));

        let err = ConfigFile::parse("[feed]\nurl = http://nope\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref section, .. } if section == "feed"));

        let err = ConfigFile::parse("[tracking]\nmin_distance_m = -3\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.routing = config.routing.with_profile("cycling");
        config.feed = config.feed.with_url("ws://127.0.0.1:9000");
        config.navigation = config.navigation.with_settle_delay(Duration::from_millis(750));

        config.save_to(&path).unwrap();
        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_defaults_round_trip_through_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");

        ConfigFile::default().save_to(&path).unwrap();
        assert_eq!(ConfigFile::load_from(&path).unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let err = ConfigFile::load_from(&temp.path().join("absent.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
