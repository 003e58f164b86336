//! Raw platform fixes and normalized position samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{normalize_bearing, LatLon};

/// A fix exactly as the platform reported it.
///
/// Speed is in meters per second and heading in degrees. Platforms report
/// "unknown" either by omitting the field or with a negative value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl RawFix {
    /// Fix with only a position, stamped now.
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self::at_time(latitude, longitude, Utc::now())
    }

    /// Fix with only a position and an explicit timestamp.
    pub fn at_time(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
            speed: None,
            heading: None,
            timestamp,
        }
    }

    pub fn with_accuracy(mut self, meters: f64) -> Self {
        self.accuracy = Some(meters);
        self
    }

    pub fn with_speed(mut self, meters_per_second: f64) -> Self {
        self.speed = Some(meters_per_second);
        self
    }

    pub fn with_heading(mut self, degrees: f64) -> Self {
        self.heading = Some(degrees);
        self
    }
}

/// One normalized GPS fix.
///
/// Immutable once created; each new fix supersedes the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionSample {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Horizontal accuracy radius in meters (0 when unknown).
    pub accuracy: f64,
    /// Ground speed in km/h, rounded to one decimal.
    pub speed_kmh: f64,
    /// Heading in degrees (0-360), 0 when the platform reports none.
    pub bearing: f64,
    /// When the platform took the fix.
    pub timestamp: DateTime<Utc>,
}

impl PositionSample {
    /// Normalizes a raw platform fix.
    pub fn from_fix(fix: &RawFix) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy: fix
                .accuracy
                .filter(|a| a.is_finite() && *a >= 0.0)
                .unwrap_or(0.0),
            speed_kmh: speed_to_kmh(fix.speed),
            bearing: fix
                .heading
                .filter(|h| h.is_finite() && *h >= 0.0)
                .map(normalize_bearing)
                .unwrap_or(0.0),
            timestamp: fix.timestamp,
        }
    }

    pub fn position(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }

    /// Distance to another sample in meters.
    pub fn distance_to(&self, other: &PositionSample) -> f64 {
        self.position().distance_to(&other.position())
    }
}

/// Converts m/s to km/h rounded to one decimal. Unknown speeds become 0.
fn speed_to_kmh(speed: Option<f64>) -> f64 {
    match speed {
        Some(mps) if mps.is_finite() && mps > 0.0 => (mps * 3.6 * 10.0).round() / 10.0,
        _ => 0.0,
    }
}
