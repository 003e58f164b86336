//! Marker and data reconciliation for non-navigation map screens.
//!
//! Markers are never patched in place. Every render clears the surface and
//! re-adds the full dataset, then fits the viewport:
//!
//! ```text
//! clearMarkers ─► updateLocationData ─► updateSensorData × N ─► fitBounds
//! ```
//!
//! Rendering the same dataset twice therefore leaves the surface exactly as
//! rendering it once.

mod live;
mod screen;

pub use live::run_live_map;
pub use screen::MapScreen;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bridge::{BridgeChannel, Command, LocationRecord, RenderSurface, SensorReading};
use crate::geo::{Bounds, LatLon};

/// The readings of one sensor, drawn as one clustered layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorCollection {
    pub sensor_id: String,
    #[serde(default)]
    pub readings: Vec<SensorReading>,
}

impl SensorCollection {
    pub fn new(sensor_id: impl Into<String>, readings: Vec<SensorReading>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            readings,
        }
    }
}

/// What a render pushed to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReconcileSummary {
    pub locations: usize,
    pub sensor_layers: usize,
    pub sensor_readings: usize,
    /// Points dropped for invalid coordinates.
    pub skipped: usize,
    pub bounds: Option<Bounds>,
}

/// Pushes a complete dataset into the surface.
///
/// Records with invalid coordinates are skipped individually so one bad
/// row cannot drop the whole layer.
pub fn reconcile<S: RenderSurface>(
    channel: &mut BridgeChannel<S>,
    locations: &[LocationRecord],
    sensors: &[SensorCollection],
) -> ReconcileSummary {
    let mut summary = ReconcileSummary::default();
    let mut points: Vec<LatLon> = Vec::new();

    channel.send_command(Command::ClearMarkers);

    let valid_locations: Vec<LocationRecord> = locations
        .iter()
        .filter(|record| {
            let ok = record.position().is_valid();
            if !ok {
                warn!(id = %record.id, lat = record.lat, lon = record.lon, "Skipping location with invalid coordinate");
            }
            ok
        })
        .cloned()
        .collect();
    summary.skipped += locations.len() - valid_locations.len();
    summary.locations = valid_locations.len();
    points.extend(valid_locations.iter().map(LocationRecord::position));
    channel.send_command(Command::UpdateLocationData(valid_locations));

    for collection in sensors {
        let readings: Vec<SensorReading> = collection
            .readings
            .iter()
            .filter(|reading| reading.position().is_valid())
            .cloned()
            .collect();
        summary.skipped += collection.readings.len() - readings.len();

        if readings.is_empty() {
            debug!(sensor = %collection.sensor_id, "No drawable readings, skipping layer");
            continue;
        }

        summary.sensor_layers += 1;
        summary.sensor_readings += readings.len();
        points.extend(readings.iter().map(SensorReading::position));
        channel.send_command(Command::UpdateSensorData(readings));
    }

    summary.bounds = Bounds::from_points(points);
    if let Some(bounds) = summary.bounds {
        channel.send_command(Command::FitBounds(bounds));
    }

    debug!(
        locations = summary.locations,
        sensor_layers = summary.sensor_layers,
        sensor_readings = summary.sensor_readings,
        skipped = summary.skipped,
        "Map reconciled"
    );
    summary
}
