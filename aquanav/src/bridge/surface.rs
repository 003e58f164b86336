//! Rendering surfaces.
//!
//! A [`RenderSurface`] accepts one serialized envelope at a time. Delivery is
//! fire-and-forget: an `Ok` only means the envelope was handed over.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::message::{Command, NavigationTarget, RouteOverlay, UserPosition};
use super::BridgeError;
use crate::geo::{Bounds, LatLon};

/// Injection point into a sandboxed map surface.
pub trait RenderSurface: Send {
    /// Hands one serialized command envelope to the surface.
    fn deliver(&mut self, envelope: &str) -> Result<(), BridgeError>;
}

// =============================================================================
// Channel surface
// =============================================================================

/// Forwards envelopes to a host over an mpsc channel.
///
/// This is the production seam: the host end of the channel injects each
/// string into its web view (or wherever the map lives).
#[derive(Debug, Clone)]
pub struct ChannelSurface {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSurface {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RenderSurface for ChannelSurface {
    fn deliver(&mut self, envelope: &str) -> Result<(), BridgeError> {
        self.tx
            .send(envelope.to_string())
            .map_err(|_| BridgeError::Delivery("surface channel closed".to_string()))
    }
}

// =============================================================================
// Simulated surface
// =============================================================================

/// What a marker on the simulated map represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Location,
    Sensor,
}

/// A marker drawn on the simulated map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub id: String,
    pub kind: MarkerKind,
    pub position: LatLon,
}

#[derive(Debug, Default)]
struct SimulatedState {
    delivered: Vec<Command>,
    markers: Vec<MapMarker>,
    /// Number of `updateSensorData` layers currently drawn.
    cluster_layers: usize,
    viewport: Option<Bounds>,
    user_position: Option<UserPosition>,
    navigation: Option<NavigationTarget>,
    route: Option<RouteOverlay>,
    failing: bool,
}

/// In-process model of the map surface.
///
/// Decodes each envelope with the same schema the real surface uses and
/// applies it the way the map script does: marker commands append, only
/// `clearMarkers` removes. Cloning yields another handle to the same map,
/// so a test can keep one handle while the session owns the other.
#[derive(Debug, Clone, Default)]
pub struct SimulatedSurface {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent delivery fail (simulates a crashed surface).
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    /// Every command accepted so far, in delivery order.
    pub fn delivered(&self) -> Vec<Command> {
        self.state.lock().delivered.clone()
    }

    pub fn delivered_count(&self) -> usize {
        self.state.lock().delivered.len()
    }

    pub fn markers(&self) -> Vec<MapMarker> {
        self.state.lock().markers.clone()
    }

    pub fn marker_count(&self) -> usize {
        self.state.lock().markers.len()
    }

    pub fn cluster_layers(&self) -> usize {
        self.state.lock().cluster_layers
    }

    pub fn viewport(&self) -> Option<Bounds> {
        self.state.lock().viewport
    }

    pub fn user_position(&self) -> Option<UserPosition> {
        self.state.lock().user_position
    }

    pub fn navigation(&self) -> Option<NavigationTarget> {
        self.state.lock().navigation.clone()
    }

    pub fn route(&self) -> Option<RouteOverlay> {
        self.state.lock().route.clone()
    }
}

impl RenderSurface for SimulatedSurface {
    fn deliver(&mut self, envelope: &str) -> Result<(), BridgeError> {
        let mut state = self.state.lock();
        if state.failing {
            return Err(BridgeError::Delivery("simulated surface failure".to_string()));
        }

        let command = Command::from_json(envelope)?;

        match &command {
            Command::UpdateNavigation(target) => state.navigation = Some(target.clone()),
            Command::UpdateUserPosition(pos) => state.user_position = Some(*pos),
            Command::UpdateLocationData(records) => {
                state.markers.extend(records.iter().map(|r| MapMarker {
                    id: r.id.clone(),
                    kind: MarkerKind::Location,
                    position: r.position(),
                }));
            }
            Command::UpdateSensorData(readings) => {
                state.markers.extend(readings.iter().map(|r| MapMarker {
                    id: r.sensor_id.clone(),
                    kind: MarkerKind::Sensor,
                    position: r.position(),
                }));
                state.cluster_layers += 1;
            }
            Command::UpdateRoute(overlay) => state.route = Some(overlay.clone()),
            Command::ClearMarkers => {
                state.markers.clear();
                state.cluster_layers = 0;
            }
            Command::FitBounds(bounds) => state.viewport = Some(*bounds),
        }

        state.delivered.push(command);
        Ok(())
    }
}
