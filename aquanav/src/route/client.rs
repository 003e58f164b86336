//! OSRM-compatible routing client.
//!
//! # API Endpoint
//!
//! ```text
//! {base_url}/route/v1/{profile}/{lon},{lat};{lon},{lat}?overview=full&geometries=geojson&steps=true
//! ```
//!
//! Coordinates are in lon,lat order. Only the first returned route is used.

use std::time::Instant;

use serde::Deserialize;
use tracing::debug;

use super::http::AsyncHttpClient;
use super::instruction::instruction_text;
use super::types::{Maneuver, Route, Step};
use super::RouteError;
use crate::config::RouteServiceConfig;
use crate::geo::LatLon;
use crate::position::BoxFuture;

/// Anything that can compute a route between two points.
///
/// The navigation driver depends on this trait rather than on
/// [`RouteClient`] so hosts can substitute their own routing backend.
pub trait RouteService: Send + Sync + 'static {
    fn compute_route(
        &self,
        origin: LatLon,
        destination: LatLon,
    ) -> BoxFuture<'_, Result<Route, RouteError>>;
}

/// Routing client for an OSRM-compatible directions API.
pub struct RouteClient<C: AsyncHttpClient> {
    http_client: C,
    config: RouteServiceConfig,
}

impl<C: AsyncHttpClient> RouteClient<C> {
    pub fn new(http_client: C, config: RouteServiceConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    pub fn config(&self) -> &RouteServiceConfig {
        &self.config
    }

    /// Builds the directions URL for an origin/destination pair.
    fn build_url(&self, origin: LatLon, destination: LatLon) -> String {
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?overview=full&geometries=geojson&steps=true",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            origin.lon,
            origin.lat,
            destination.lon,
            destination.lat
        )
    }

    /// Computes a driving route.
    ///
    /// Bounded by the configured timeout. Every failure is recoverable.
    pub async fn compute_route(
        &self,
        origin: LatLon,
        destination: LatLon,
    ) -> Result<Route, RouteError> {
        if !origin.is_valid() || !destination.is_valid() {
            return Err(RouteError::NoRoute(format!(
                "invalid endpoints {:?} -> {:?}",
                origin, destination
            )));
        }

        let url = self.build_url(origin, destination);
        let started = Instant::now();
        debug!(url = %url, "Requesting route");

        let body = tokio::time::timeout(self.config.timeout, self.http_client.get(&url))
            .await
            .map_err(|_| RouteError::Timeout(self.config.timeout.as_secs()))??;

        let route = parse_response(&body)?;

        debug!(
            distance_m = route.distance_m,
            duration_s = route.duration_s,
            steps = route.steps.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Route computed"
        );

        Ok(route)
    }
}

impl<C: AsyncHttpClient> RouteService for RouteClient<C> {
    fn compute_route(
        &self,
        origin: LatLon,
        destination: LatLon,
    ) -> BoxFuture<'_, Result<Route, RouteError>> {
        Box::pin(RouteClient::compute_route(self, origin, destination))
    }
}

// =============================================================================
// Response parsing
// =============================================================================

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    distance: f64,
    duration: f64,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    maneuver: Maneuver,
    #[serde(default)]
    name: String,
    distance: f64,
    duration: f64,
}

fn parse_response(body: &[u8]) -> Result<Route, RouteError> {
    let response: OsrmResponse =
        serde_json::from_slice(body).map_err(|e| RouteError::Parse(e.to_string()))?;

    if response.code != "Ok" {
        return Err(RouteError::NoRoute(
            response.message.unwrap_or(response.code),
        ));
    }

    let first = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| RouteError::NoRoute("empty route list".to_string()))?;

    let geometry: Vec<LatLon> = first
        .geometry
        .coordinates
        .iter()
        .map(|[lon, lat]| LatLon::new(*lat, *lon))
        .collect();

    if let Some(bad) = geometry.iter().find(|p| !p.is_valid()) {
        return Err(RouteError::Parse(format!("invalid geometry point {:?}", bad)));
    }

    let steps = first
        .legs
        .into_iter()
        .flat_map(|leg| leg.steps)
        .map(|step| Step {
            instruction: instruction_text(&step.maneuver, &step.name),
            maneuver: step.maneuver,
            name: step.name,
            distance: step.distance,
            duration: step.duration,
        })
        .collect();

    Ok(Route {
        geometry,
        distance_m: first.distance,
        duration_s: first.duration,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::MockHttpClient;
    use std::time::Duration;

    const ORIGIN: LatLon = LatLon::new(-6.2088, 106.8456);
    const KALI_CILIWUNG: LatLon = LatLon::new(-6.1944, 106.8229);

    const OSRM_OK: &str = r#"{
        "code": "Ok",
        "routes": [{
            "geometry": {"type": "LineString", "coordinates": [[106.8456, -6.2088], [106.8350, -6.2000], [106.8229, -6.1944]]},
            "distance": 3712.4,
            "duration": 512.9,
            "legs": [{
                "steps": [
                    {"maneuver": {"type": "depart"}, "name": "Jalan M.H. Thamrin", "distance": 1200.0, "duration": 160.0},
                    {"maneuver": {"type": "turn", "modifier": "left"}, "name": "Jalan Kebon Sirih", "distance": 2512.4, "duration": 352.9},
                    {"maneuver": {"type": "arrive"}, "name": "", "distance": 0.0, "duration": 0.0}
                ]
            }]
        }]
    }"#;

    fn client(mock: MockHttpClient) -> RouteClient<MockHttpClient> {
        RouteClient::new(mock, RouteServiceConfig::default())
    }

    #[test]
    fn test_url_construction() {
        let config = RouteServiceConfig::default().with_base_url("https://osrm.example.org/");
        let client = RouteClient::new(MockHttpClient::ok(Vec::<u8>::new()), config);

        let url = client.build_url(ORIGIN, KALI_CILIWUNG);
        assert_eq!(
            url,
            "https://osrm.example.org/route/v1/driving/106.845600,-6.208800;106.822900,-6.194400\
             ?overview=full&geometries=geojson&steps=true"
        );
    }

    #[tokio::test]
    async fn test_compute_route_parses_first_route() {
        let mock = MockHttpClient::ok(OSRM_OK);
        let requests = mock.requests.clone();
        let route = client(mock)
            .compute_route(ORIGIN, KALI_CILIWUNG)
            .await
            .unwrap();

        assert!(route.distance_m > 0.0);
        assert!(route.duration_s > 0.0);
        assert_eq!(route.geometry.len(), 3);
        assert_eq!(route.geometry[0], ORIGIN);
        assert_eq!(route.steps.len(), 3);
        assert_eq!(
            route.steps[1].instruction,
            "Belok kiri ke Jalan Kebon Sirih"
        );
        assert_eq!(route.formatted_distance(), "3.7km");
        assert_eq!(route.formatted_time(), "9 min");
        assert_eq!(requests.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_http_error_propagates() {
        let mock = MockHttpClient::err(RouteError::Status { status: 502 });
        let result = client(mock).compute_route(ORIGIN, KALI_CILIWUNG).await;
        assert_eq!(result, Err(RouteError::Status { status: 502 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let mock = MockHttpClient::ok(OSRM_OK).with_delay(Duration::from_secs(60));
        let config = RouteServiceConfig::default().with_timeout(Duration::from_secs(20));
        let client = RouteClient::new(mock, config);

        let result = client.compute_route(ORIGIN, KALI_CILIWUNG).await;
        assert_eq!(result, Err(RouteError::Timeout(20)));
    }

    #[tokio::test]
    async fn test_invalid_endpoints_skip_request() {
        let mock = MockHttpClient::ok(OSRM_OK);
        let requests = mock.requests.clone();
        let result = client(mock)
            .compute_route(LatLon::new(f64::NAN, 0.0), KALI_CILIWUNG)
            .await;

        assert!(matches!(result, Err(RouteError::NoRoute(_))));
        assert!(requests.lock().is_empty());
    }

    #[test]
    fn test_parse_no_route_code() {
        let body = br#"{"code": "NoRoute", "message": "Impossible route between points"}"#;
        assert_eq!(
            parse_response(body),
            Err(RouteError::NoRoute(
                "Impossible route between points".to_string()
            ))
        );
    }

    #[test]
    fn test_parse_empty_routes() {
        let body = br#"{"code": "Ok", "routes": []}"#;
        assert!(matches!(parse_response(body), Err(RouteError::NoRoute(_))));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_response(b"<html>502</html>"),
            Err(RouteError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_rejects_invalid_geometry() {
        let body = br#"{"code": "Ok", "routes": [{"geometry": {"coordinates": [[500.0, 0.0]]}, "distance": 1.0, "duration": 1.0}]}"#;
        assert!(matches!(parse_response(body), Err(RouteError::Parse(_))));
    }
}
