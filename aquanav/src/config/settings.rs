//! Typed configuration for each engine component.

use std::path::PathBuf;
use std::time::Duration;

/// Default routing endpoint (public OSRM demo server).
pub const DEFAULT_ROUTE_BASE_URL: &str = "https://router.project-osrm.org";

/// Default routing profile.
pub const DEFAULT_ROUTE_PROFILE: &str = "driving";

/// Default bound on a single route computation.
pub const DEFAULT_ROUTE_TIMEOUT: Duration = Duration::from_secs(20);

/// Shortest allowed route timeout.
pub const MIN_ROUTE_TIMEOUT: Duration = Duration::from_secs(15);

/// Longest allowed route timeout.
pub const MAX_ROUTE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay between surface readiness and the first navigation command.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Default websocket connect timeout for the realtime feed.
pub const DEFAULT_FEED_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Routing service settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteServiceConfig {
    /// Base URL of the OSRM-compatible service, without trailing path.
    pub base_url: String,
    /// Routing profile segment of the URL.
    pub profile: String,
    /// Bound on one computation, always within 15-30 s.
    pub timeout: Duration,
}

impl Default for RouteServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ROUTE_BASE_URL.to_string(),
            profile: DEFAULT_ROUTE_PROFILE.to_string(),
            timeout: DEFAULT_ROUTE_TIMEOUT,
        }
    }
}

impl RouteServiceConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Sets the timeout, clamped to the 15-30 s window.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.clamp(MIN_ROUTE_TIMEOUT, MAX_ROUTE_TIMEOUT);
        self
    }
}

/// Navigation session settings.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationConfig {
    /// Wait between surface readiness and the first `updateNavigation`.
    pub settle_delay: Duration,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl NavigationConfig {
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

/// Realtime sensor feed settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// Websocket endpoint; the feed is disabled when unset.
    pub url: Option<String>,
    pub connect_timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: None,
            connect_timeout: DEFAULT_FEED_CONNECT_TIMEOUT,
        }
    }
}

impl FeedConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Optional log file; appended to, never rotated.
    pub file: Option<PathBuf>,
    /// Colored stderr output.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            ansi: true,
        }
    }
}

impl LogConfig {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_timeout_is_clamped() {
        let low = RouteServiceConfig::default().with_timeout(Duration::from_secs(1));
        assert_eq!(low.timeout, MIN_ROUTE_TIMEOUT);

        let high = RouteServiceConfig::default().with_timeout(Duration::from_secs(120));
        assert_eq!(high.timeout, MAX_ROUTE_TIMEOUT);

        let ok = RouteServiceConfig::default().with_timeout(Duration::from_secs(25));
        assert_eq!(ok.timeout, Duration::from_secs(25));
    }

    #[test]
    fn test_defaults() {
        let routing = RouteServiceConfig::default();
        assert_eq!(routing.profile, "driving");
        assert_eq!(routing.timeout, Duration::from_secs(20));
        assert_eq!(
            NavigationConfig::default().settle_delay,
            Duration::from_millis(500)
        );
        assert!(FeedConfig::default().url.is_none());
        assert_eq!(LogConfig::default().level, "info");
    }
}
