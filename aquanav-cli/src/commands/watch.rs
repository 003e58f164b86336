//! Watch command - follow the realtime sensor feed on a simulated map.

use std::time::Duration;

use aquanav::bridge::SimulatedSurface;
use aquanav::config::ConfigFile;
use aquanav::feed::SensorFeed;
use aquanav::reconcile::{run_live_map, MapScreen};
use tokio_util::sync::CancellationToken;

use crate::error::CliError;

/// Run the watch command until Ctrl-C, the optional duration, or the server
/// ending the feed.
pub async fn run(
    url: Option<String>,
    duration: Option<Duration>,
    config: &ConfigFile,
) -> Result<(), CliError> {
    let mut feed_config = config.feed.clone();
    if let Some(url) = url {
        feed_config = feed_config.with_url(url);
    }

    let feed = SensorFeed::from_config(&feed_config).await?;
    println!("Connected to {}", feed.url());

    let surface = SimulatedSurface::new();
    let mut screen = MapScreen::new(surface.clone());
    screen.on_ready();

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        match duration {
            Some(duration) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = tokio::time::sleep(duration) => {}
                }
            }
            None => {
                tokio::signal::ctrl_c().await.ok();
            }
        }
        trigger.cancel();
    });

    let applied = run_live_map(feed, &mut screen, shutdown).await?;

    println!();
    println!("Map updates: {}", applied);
    println!("Sensors on map: {}", screen.sensors().len());
    println!(
        "Markers: {} in {} cluster layer(s)",
        surface.marker_count(),
        surface.cluster_layers()
    );
    if let Some(bounds) = surface.viewport() {
        println!(
            "Viewport: S {:.5} W {:.5} N {:.5} E {:.5}",
            bounds.south, bounds.west, bounds.north, bounds.east
        );
    }
    Ok(())
}
