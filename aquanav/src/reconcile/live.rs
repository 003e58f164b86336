//! Live map updates from the realtime feed.

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::MapScreen;
use crate::bridge::RenderSurface;
use crate::feed::{FeedError, SensorFeed};

/// Pumps feed collections into `screen` until `shutdown` fires or the
/// server ends the feed.
///
/// The feed is owned here and closed on shutdown. Returns the number of
/// collections that changed the map.
pub async fn run_live_map<S: RenderSurface>(
    mut feed: SensorFeed,
    screen: &mut MapScreen<S>,
    shutdown: CancellationToken,
) -> Result<usize, FeedError> {
    let mut applied = 0;

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!(applied, "Live map stopping");
                break;
            }

            next = feed.next_collection() => match next {
                Some(collection) => {
                    if screen.apply_collection(collection).is_some() {
                        applied += 1;
                    }
                }
                None => {
                    info!(applied, "Sensor feed ended");
                    return Ok(applied);
                }
            }
        }
    }

    feed.close().await?;
    Ok(applied)
}
