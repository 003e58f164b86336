//! Typed envelopes shared by both sides of the bridge.
//!
//! Commands and events are serde tagged unions, so the surface and the
//! control layer agree on one schema instead of interpolating script text.
//! Every envelope is validated after decoding; coordinates in particular
//! must be finite and inside WGS84 bounds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BridgeError;
use crate::geo::{is_valid_coordinate, Bounds, LatLon};
use crate::navigation::Destination;
use crate::position::PositionSample;
use crate::route::{format_distance, format_time, Route, Step};

// =============================================================================
// Command payloads
// =============================================================================

/// Payload of `updateNavigation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationTarget {
    pub origin: LatLon,
    pub destination: Destination,
}

/// Payload of `updateUserPosition`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserPosition {
    pub lat: f64,
    pub lon: f64,
    pub accuracy: f64,
    pub bearing: f64,
}

impl From<&PositionSample> for UserPosition {
    fn from(sample: &PositionSample) -> Self {
        Self {
            lat: sample.latitude,
            lon: sample.longitude,
            accuracy: sample.accuracy,
            bearing: sample.bearing,
        }
    }
}

/// A monitoring location marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LocationRecord {
    pub fn position(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

/// One water-quality reading with its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub sensor_id: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,
    /// Water temperature in °C.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Turbidity in NTU.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turbidity: Option<f64>,
    /// Total dissolved solids in ppm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tds: Option<f64>,
    /// Dissolved oxygen in mg/L.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dissolved_oxygen: Option<f64>,
}

impl SensorReading {
    pub fn position(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

/// Payload of `updateRoute`: the route as the surface draws it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOverlay {
    pub geometry: Vec<LatLon>,
    /// Meters.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
    pub formatted_distance: String,
    pub formatted_time: String,
    pub steps: Vec<Step>,
}

impl From<&Route> for RouteOverlay {
    fn from(route: &Route) -> Self {
        Self {
            geometry: route.geometry.clone(),
            distance: route.distance_m,
            duration: route.duration_s,
            formatted_distance: format_distance(route.distance_m),
            formatted_time: format_time(route.duration_s),
            steps: route.steps.clone(),
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Instruction pushed into the rendering surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Command {
    UpdateNavigation(NavigationTarget),
    UpdateUserPosition(UserPosition),
    UpdateLocationData(Vec<LocationRecord>),
    UpdateSensorData(Vec<SensorReading>),
    UpdateRoute(RouteOverlay),
    ClearMarkers,
    FitBounds(Bounds),
}

impl Command {
    /// Wire tag, for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Command::UpdateNavigation(_) => "updateNavigation",
            Command::UpdateUserPosition(_) => "updateUserPosition",
            Command::UpdateLocationData(_) => "updateLocationData",
            Command::UpdateSensorData(_) => "updateSensorData",
            Command::UpdateRoute(_) => "updateRoute",
            Command::ClearMarkers => "clearMarkers",
            Command::FitBounds(_) => "fitBounds",
        }
    }

    /// Checks every coordinate the command carries.
    pub fn validate(&self) -> Result<(), BridgeError> {
        match self {
            Command::UpdateNavigation(target) => {
                check_point("origin", target.origin.lat, target.origin.lon)?;
                check_point(
                    "destination",
                    target.destination.latitude,
                    target.destination.longitude,
                )
            }
            Command::UpdateUserPosition(pos) => check_point("user position", pos.lat, pos.lon),
            Command::UpdateLocationData(records) => records
                .iter()
                .try_for_each(|r| check_point(&format!("location {}", r.id), r.lat, r.lon)),
            Command::UpdateSensorData(readings) => readings.iter().try_for_each(|r| {
                check_point(&format!("sensor {}", r.sensor_id), r.lat, r.lon)
            }),
            Command::UpdateRoute(overlay) => overlay
                .geometry
                .iter()
                .try_for_each(|p| check_point("route geometry", p.lat, p.lon)),
            Command::ClearMarkers => Ok(()),
            Command::FitBounds(b) => {
                check_point("bounds south-west", b.south, b.west)?;
                check_point("bounds north-east", b.north, b.east)?;
                if b.south > b.north || b.west > b.east {
                    return Err(BridgeError::Invalid("inverted bounds".to_string()));
                }
                Ok(())
            }
        }
    }

    pub fn to_json(&self) -> Result<String, BridgeError> {
        serde_json::to_string(self).map_err(|e| BridgeError::Serialize(e.to_string()))
    }

    /// Decodes and validates a command envelope (the surface side).
    pub fn from_json(raw: &str) -> Result<Self, BridgeError> {
        let command: Command =
            serde_json::from_str(raw).map_err(|e| BridgeError::Parse(e.to_string()))?;
        command.validate()?;
        Ok(command)
    }
}

// =============================================================================
// Events
// =============================================================================

/// Route/ETA figures computed by the surface for display.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteInfo {
    /// Total distance in meters.
    pub distance: f64,
    pub formatted_distance: String,
    /// Total time in seconds.
    pub time: f64,
    pub formatted_time: String,
    pub instruction: String,
    pub next_instruction: Option<String>,
    pub remaining_distance: Option<f64>,
    pub remaining_time: Option<f64>,
}

/// Request to hand navigation off to an external maps application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalMapsRequest {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub name: String,
}

/// Message posted back out of the rendering surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Event {
    /// User requested a full exit.
    ExitNavigation,
    /// User requested a return to the previous screen.
    #[serde(rename = "returnToMainMap")]
    ReturnToMap,
    RouteInfo(RouteInfo),
    #[serde(rename = "openGoogleMaps")]
    OpenExternalMaps(ExternalMapsRequest),
}

impl Event {
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::ExitNavigation => "exitNavigation",
            Event::ReturnToMap => "returnToMainMap",
            Event::RouteInfo(_) => "routeInfo",
            Event::OpenExternalMaps(_) => "openGoogleMaps",
        }
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        match self {
            Event::ExitNavigation | Event::ReturnToMap => Ok(()),
            Event::RouteInfo(info) => {
                if !info.distance.is_finite() || info.distance < 0.0 {
                    return Err(BridgeError::Invalid(format!(
                        "routeInfo distance {}",
                        info.distance
                    )));
                }
                if !info.time.is_finite() || info.time < 0.0 {
                    return Err(BridgeError::Invalid(format!("routeInfo time {}", info.time)));
                }
                Ok(())
            }
            Event::OpenExternalMaps(req) => check_point("external maps target", req.lat, req.lon),
        }
    }

    pub fn to_json(&self) -> Result<String, BridgeError> {
        serde_json::to_string(self).map_err(|e| BridgeError::Serialize(e.to_string()))
    }

    /// Decodes and validates an event envelope.
    pub fn from_json(raw: &str) -> Result<Self, BridgeError> {
        let event: Event =
            serde_json::from_str(raw).map_err(|e| BridgeError::Parse(e.to_string()))?;
        event.validate()?;
        Ok(event)
    }
}

fn check_point(what: &str, lat: f64, lon: f64) -> Result<(), BridgeError> {
    if is_valid_coordinate(lat, lon) {
        Ok(())
    } else {
        Err(BridgeError::Invalid(format!(
            "{} has invalid coordinate ({}, {})",
            what, lat, lon
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn destination() -> Destination {
        Destination::new(-6.1944, 106.8229, "Kali Ciliwung", "Jakarta Pusat")
    }

    #[test]
    fn test_command_envelope_shape() {
        let cmd = Command::UpdateUserPosition(UserPosition {
            lat: -6.2088,
            lon: 106.8456,
            accuracy: 5.0,
            bearing: 90.0,
        });
        let value: serde_json::Value = serde_json::from_str(&cmd.to_json().unwrap()).unwrap();

        assert_eq!(value["type"], "updateUserPosition");
        assert_eq!(value["payload"]["lat"], -6.2088);
        assert_eq!(value["payload"]["bearing"], 90.0);
    }

    #[test]
    fn test_update_navigation_payload() {
        let cmd = Command::UpdateNavigation(NavigationTarget {
            origin: LatLon::new(-6.2088, 106.8456),
            destination: destination(),
        });
        let value: serde_json::Value = serde_json::from_str(&cmd.to_json().unwrap()).unwrap();

        assert_eq!(value["type"], "updateNavigation");
        assert_eq!(value["payload"]["origin"]["lon"], 106.8456);
        assert_eq!(value["payload"]["destination"]["lat"], -6.1944);
        assert_eq!(value["payload"]["destination"]["name"], "Kali Ciliwung");
        assert_eq!(value["payload"]["destination"]["address"], "Jakarta Pusat");
    }

    #[test]
    fn test_unit_command_has_no_payload() {
        let json = Command::ClearMarkers.to_json().unwrap();
        assert_eq!(json, r#"{"type":"clearMarkers"}"#);
        assert_eq!(Command::from_json(&json).unwrap(), Command::ClearMarkers);
    }

    #[test]
    fn test_sensor_payload_is_array() {
        let cmd = Command::UpdateSensorData(vec![SensorReading {
            sensor_id: "S-01".to_string(),
            lat: -6.2,
            lon: 106.8,
            timestamp: None,
            ph: Some(7.1),
            temperature: Some(28.4),
            turbidity: None,
            tds: None,
            dissolved_oxygen: Some(6.2),
        }]);
        let value: serde_json::Value = serde_json::from_str(&cmd.to_json().unwrap()).unwrap();

        assert!(value["payload"].is_array());
        assert_eq!(value["payload"][0]["sensorId"], "S-01");
        assert_eq!(value["payload"][0]["dissolvedOxygen"], 6.2);
        assert!(value["payload"][0].get("turbidity").is_none());
    }

    #[test]
    fn test_command_validation_rejects_bad_coordinates() {
        let cmd = Command::UpdateUserPosition(UserPosition {
            lat: f64::NAN,
            lon: 106.8,
            accuracy: 0.0,
            bearing: 0.0,
        });
        assert!(matches!(cmd.validate(), Err(BridgeError::Invalid(_))));

        let cmd = Command::FitBounds(Bounds {
            south: 1.0,
            west: 0.0,
            north: -1.0,
            east: 1.0,
        });
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn test_parse_exit_events() {
        assert_eq!(
            Event::from_json(r#"{"type":"exitNavigation"}"#).unwrap(),
            Event::ExitNavigation
        );
        assert_eq!(
            Event::from_json(r#"{"type":"returnToMainMap"}"#).unwrap(),
            Event::ReturnToMap
        );
    }

    #[test]
    fn test_parse_route_info_event() {
        let raw = json!({
            "type": "routeInfo",
            "data": {
                "distance": 2970.0,
                "formattedDistance": "3.0km",
                "time": 540.0,
                "formattedTime": "9 min",
                "instruction": "Belok kiri",
                "nextInstruction": "Lurus",
                "remainingDistance": 2500.0,
                "remainingTime": 480.0
            }
        })
        .to_string();

        let Event::RouteInfo(info) = Event::from_json(&raw).unwrap() else {
            panic!("expected routeInfo");
        };
        assert_eq!(info.formatted_distance, "3.0km");
        assert_eq!(info.next_instruction.as_deref(), Some("Lurus"));
        assert_eq!(info.remaining_time, Some(480.0));
    }

    #[test]
    fn test_parse_open_google_maps_event() {
        let raw = r#"{"type":"openGoogleMaps","data":{"lat":-6.1944,"lon":106.8229,"name":"Kali Ciliwung"}}"#;
        let event = Event::from_json(raw).unwrap();
        assert_eq!(event.type_name(), "openGoogleMaps");
        assert!(matches!(event, Event::OpenExternalMaps(ref r) if r.name == "Kali Ciliwung"));
    }

    #[test]
    fn test_parse_failures() {
        assert!(matches!(
            Event::from_json("not json"),
            Err(BridgeError::Parse(_))
        ));
        assert!(matches!(
            Event::from_json(r#"{"type":"selfDestruct"}"#),
            Err(BridgeError::Parse(_))
        ));
        assert!(matches!(
            Event::from_json(r#"{"type":"openGoogleMaps","data":{"lat":200,"lon":0}}"#),
            Err(BridgeError::Invalid(_))
        ));
        assert!(matches!(
            Event::from_json(r#"{"type":"routeInfo","data":{"distance":-5}}"#),
            Err(BridgeError::Invalid(_))
        ));
    }
}
