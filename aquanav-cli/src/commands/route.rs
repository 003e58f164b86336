//! Route command - compute one route and print it.

use aquanav::bridge::RouteOverlay;
use aquanav::config::ConfigFile;
use aquanav::geo::LatLon;
use aquanav::route::{ReqwestClient, Route, RouteClient};
use tracing::info;

use crate::error::CliError;

/// Arguments for the route command.
pub struct RouteArgs {
    pub from: LatLon,
    pub to: LatLon,
    pub base_url: Option<String>,
    pub profile: Option<String>,
    pub json: bool,
}

/// Run the route command.
pub async fn run(args: RouteArgs, config: &ConfigFile) -> Result<(), CliError> {
    let mut routing = config.routing.clone();
    if let Some(base_url) = args.base_url {
        routing = routing.with_base_url(base_url);
    }
    if let Some(profile) = args.profile {
        routing = routing.with_profile(profile);
    }

    info!(base_url = %routing.base_url, profile = %routing.profile, "Computing route");
    let http = ReqwestClient::new(routing.timeout)?;
    let client = RouteClient::new(http, routing);
    let route = client.compute_route(args.from, args.to).await?;

    if args.json {
        let overlay = RouteOverlay::from(&route);
        let text = serde_json::to_string_pretty(&overlay)
            .map_err(|e| CliError::Runtime(format!("Failed to encode route: {}", e)))?;
        println!("{}", text);
    } else {
        print_route(&route);
    }
    Ok(())
}

fn print_route(route: &Route) {
    println!(
        "Route: {} / {} ({} points)",
        route.formatted_distance(),
        route.formatted_time(),
        route.geometry.len()
    );
    println!();
    for (i, step) in route.steps.iter().enumerate() {
        println!(
            "  {:>2}. {:<48} {}",
            i + 1,
            step.instruction,
            aquanav::route::format_distance(step.distance)
        );
    }
}
