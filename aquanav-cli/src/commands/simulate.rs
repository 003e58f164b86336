//! Simulate command - replay a recorded track through a navigation session.
//!
//! The session drives a simulated map surface, so the whole engine can be
//! exercised without a host application.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aquanav::bridge::SimulatedSurface;
use aquanav::config::ConfigFile;
use aquanav::geo::LatLon;
use aquanav::navigation::{Destination, NavigationDriver, NavigationState, Notice};
use aquanav::position::{BoxFuture, PositionTracker, ReplaySource};
use aquanav::route::{
    instruction_text, Maneuver, ReqwestClient, Route, RouteClient, RouteError, RouteService, Step,
};
use tracing::info;

use crate::error::CliError;

/// Assumed travel speed for offline routes, m/s (about 30 km/h).
const OFFLINE_SPEED_MPS: f64 = 8.33;

/// Extra time after the last replayed fix before the session is ended.
const TRACK_GRACE: Duration = Duration::from_secs(2);

/// Arguments for the simulate command.
pub struct SimulateArgs {
    pub track: PathBuf,
    pub to: LatLon,
    pub name: String,
    pub interval: Duration,
    pub ready_after: Duration,
    pub offline: bool,
}

/// Straight-line routes, for running without a routing service.
struct StraightLine;

impl RouteService for StraightLine {
    fn compute_route(
        &self,
        origin: LatLon,
        destination: LatLon,
    ) -> BoxFuture<'_, Result<Route, RouteError>> {
        Box::pin(async move {
            let distance = origin.distance_to(&destination);
            let arrive = Maneuver {
                kind: "arrive".to_string(),
                modifier: None,
            };
            Ok(Route {
                geometry: vec![origin, destination],
                distance_m: distance,
                duration_s: distance / OFFLINE_SPEED_MPS,
                steps: vec![Step {
                    instruction: instruction_text(&arrive, ""),
                    maneuver: arrive,
                    name: String::new(),
                    distance,
                    duration: distance / OFFLINE_SPEED_MPS,
                }],
            })
        })
    }
}

/// Run the simulate command.
pub async fn run(args: SimulateArgs, config: &ConfigFile) -> Result<(), CliError> {
    if args.offline {
        drive(Arc::new(StraightLine), args, config).await
    } else {
        let http = ReqwestClient::new(config.routing.timeout)?;
        let client = RouteClient::new(http, config.routing.clone());
        drive(Arc::new(client), args, config).await
    }
}

async fn drive<R: RouteService>(
    routes: Arc<R>,
    args: SimulateArgs,
    config: &ConfigFile,
) -> Result<(), CliError> {
    let source = ReplaySource::from_json_file(&args.track, args.interval)?;
    let track_len = source.len();
    let track_time = track_duration(args.interval, track_len)?;
    let tracker = PositionTracker::new(source, config.tracker_config());
    let surface = SimulatedSurface::new();
    let destination = Destination::new(args.to.lat, args.to.lon, args.name, "");

    println!(
        "Replaying {} fixes every {} ms toward {}",
        track_len,
        args.interval.as_millis(),
        destination.name
    );

    let mut handle = NavigationDriver::spawn(
        tracker,
        routes,
        surface.clone(),
        destination,
        &config.navigation,
    )?;

    if let Some(mut notices) = handle.notices() {
        tokio::spawn(async move {
            while let Some(notice) = notices.recv().await {
                print_notice(&notice);
            }
        });
    }

    let mut states = handle.watch_state();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            println!("[state] {:?}", state);
        }
    });

    tokio::time::sleep(args.ready_after).await;
    info!("Simulated surface ready");
    handle.surface_ready();

    let mut exited = handle.watch_state();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!("Interrupted");
            handle.cancel();
        }
        _ = tokio::time::sleep(track_time) => {
            println!("Track finished");
            handle.cancel();
        }
        _ = exited.wait_for(NavigationState::is_exited) => {}
    }

    let reason = handle.join().await;
    println!();
    println!("Session ended: {:?}", reason);
    println!("Commands delivered: {}", surface.delivered_count());
    if let Some(route) = surface.route() {
        println!(
            "Last route: {} / {}",
            route.formatted_distance, route.formatted_time
        );
    }
    Ok(())
}

/// Time to replay the whole track, plus a grace period for the last fix to
/// settle.
fn track_duration(interval: Duration, fixes: usize) -> Result<Duration, CliError> {
    u32::try_from(fixes)
        .ok()
        .and_then(|fixes| interval.checked_mul(fixes))
        .and_then(|total| total.checked_add(TRACK_GRACE))
        .ok_or_else(|| {
            CliError::InvalidArgument(format!(
                "track of {} fixes every {} ms is too long to replay",
                fixes,
                interval.as_millis()
            ))
        })
}

fn print_notice(notice: &Notice) {
    match notice {
        Notice::Aborted { reason, message } => {
            println!("[abort] {:?}: {}", reason, message)
        }
        Notice::RouteApplied {
            distance,
            time,
            next_instruction,
        } => println!(
            "[route] {} / {} - {}",
            distance,
            time,
            next_instruction.as_deref().unwrap_or("-")
        ),
        Notice::RouteInfo(info) => println!(
            "[info] {} / {} - {}",
            info.formatted_distance, info.formatted_time, info.instruction
        ),
        Notice::OpenExternal { url, name } => println!("[external] {} {}", name, url),
        Notice::TrackingLost { message } => println!("[tracking] {}", message),
    }
}
