//! CLI error type.

use std::fmt;

use aquanav::config::ConfigError;
use aquanav::feed::FeedError;
use aquanav::log::LogError;
use aquanav::navigation::NavigationError;
use aquanav::position::PositionError;
use aquanav::route::RouteError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    Config(String),
    InvalidArgument(String),
    Logging(LogError),
    Position(PositionError),
    Route(RouteError),
    Navigation(NavigationError),
    Feed(FeedError),
    Runtime(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Logging(e) => write!(f, "Logging setup failed: {}", e),
            CliError::Position(e) => write!(f, "Position error: {}", e),
            CliError::Route(e) => write!(f, "Routing failed: {}", e),
            CliError::Navigation(e) => write!(f, "Navigation error: {}", e),
            CliError::Feed(e) => write!(f, "Sensor feed error: {}", e),
            CliError::Runtime(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LogError> for CliError {
    fn from(e: LogError) -> Self {
        CliError::Logging(e)
    }
}

impl From<PositionError> for CliError {
    fn from(e: PositionError) -> Self {
        CliError::Position(e)
    }
}

impl From<RouteError> for CliError {
    fn from(e: RouteError) -> Self {
        CliError::Route(e)
    }
}

impl From<NavigationError> for CliError {
    fn from(e: NavigationError) -> Self {
        CliError::Navigation(e)
    }
}

impl From<FeedError> for CliError {
    fn from(e: FeedError) -> Self {
        CliError::Feed(e)
    }
}
