//! AquaNav CLI - Command-line interface
//!
//! Drives the navigation engine outside a host application: compute routes,
//! replay recorded tracks through a full navigation session, and follow the
//! realtime sensor feed.

mod commands;
mod error;

use std::path::PathBuf;
use std::time::Duration;

use aquanav::geo::LatLon;
use clap::{Parser, Subcommand};

use commands::common::{load_config, parse_coordinate, setup_logging};
use commands::{init, route, simulate, watch};
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "aquanav", version, about = "Live navigation and map bridge engine")]
struct Cli {
    /// Use this config file instead of ~/.aquanav/config.ini
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create or update the configuration file
    Init {
        /// Overwrite existing values with defaults
        #[arg(long)]
        force: bool,
    },

    /// Compute a single route
    Route {
        /// Origin as LAT,LON
        #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
        from: LatLon,

        /// Destination as LAT,LON
        #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
        to: LatLon,

        /// Routing service base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Routing profile (driving, walking, cycling)
        #[arg(long)]
        profile: Option<String>,

        /// Print the route overlay as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay a recorded track through a navigation session
    Simulate {
        /// JSON array of fixes ({latitude, longitude, timestamp, ...})
        #[arg(long)]
        track: PathBuf,

        /// Destination as LAT,LON
        #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
        to: LatLon,

        /// Destination display name
        #[arg(long, default_value = "Destination")]
        name: String,

        /// Milliseconds between replayed fixes
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Milliseconds before the simulated surface reports ready
        #[arg(long, default_value_t = 1500)]
        ready_after_ms: u64,

        /// Use straight-line routes instead of the routing service
        #[arg(long)]
        offline: bool,
    },

    /// Follow the realtime sensor feed
    Watch {
        /// Feed URL (ws:// or wss://), overrides [feed] url
        #[arg(long)]
        url: Option<String>,

        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if let Commands::Init { force } = cli.command {
        return init::run(cli.config.as_deref(), force);
    }

    let config = load_config(cli.config.as_deref())?;
    let _log_guard = setup_logging(&config, cli.verbose)?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Route {
            from,
            to,
            base_url,
            profile,
            json,
        } => {
            route::run(
                route::RouteArgs {
                    from,
                    to,
                    base_url,
                    profile,
                    json,
                },
                &config,
            )
            .await
        }
        Commands::Simulate {
            track,
            to,
            name,
            interval_ms,
            ready_after_ms,
            offline,
        } => {
            if interval_ms == 0 {
                return Err(CliError::InvalidArgument(
                    "--interval-ms must be greater than zero".to_string(),
                ));
            }
            simulate::run(
                simulate::SimulateArgs {
                    track,
                    to,
                    name,
                    interval: Duration::from_millis(interval_ms),
                    ready_after: Duration::from_millis(ready_after_ms),
                    offline,
                },
                &config,
            )
            .await
        }
        Commands::Watch { url, seconds } => {
            watch::run(url, seconds.map(Duration::from_secs), &config).await
        }
    }
}
