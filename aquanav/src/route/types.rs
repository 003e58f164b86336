//! Route data types.

use serde::{Deserialize, Serialize};

use super::format::{format_distance, format_time};
use crate::geo::LatLon;

/// Maneuver at the start of a step, as reported by the routing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maneuver {
    /// e.g. `depart`, `turn`, `roundabout`, `arrive`.
    #[serde(rename = "type")]
    pub kind: String,
    /// e.g. `left`, `slight right`, `uturn`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,
}

/// One turn-by-turn step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub maneuver: Maneuver,
    /// Human-readable instruction.
    pub instruction: String,
    /// Road name, empty when unnamed.
    #[serde(default)]
    pub name: String,
    /// Meters.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
}

/// A computed route.
///
/// Routes are replaced wholesale on every successful computation, never
/// patched.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Ordered path from origin to destination.
    pub geometry: Vec<LatLon>,
    /// Total distance in meters.
    pub distance_m: f64,
    /// Total duration in seconds.
    pub duration_s: f64,
    /// Ordered steps.
    pub steps: Vec<Step>,
}

impl Route {
    pub fn formatted_distance(&self) -> String {
        format_distance(self.distance_m)
    }

    pub fn formatted_time(&self) -> String {
        format_time(self.duration_s)
    }

    /// The first actionable instruction (skips the departure step when
    /// something follows it).
    pub fn next_instruction(&self) -> Option<&Step> {
        match self.steps.as_slice() {
            [first, second, ..] if first.maneuver.kind == "depart" => Some(second),
            [first, ..] => Some(first),
            [] => None,
        }
    }
}
