//! Hand-off to an external maps application.

use crate::bridge::ExternalMapsRequest;

const DIRECTIONS_URL: &str = "https://www.google.com/maps/dir/?api=1";

/// Directions URL for a universal maps link, driving mode.
pub fn external_maps_url(request: &ExternalMapsRequest) -> String {
    format!(
        "{}&destination={:.6},{:.6}&travelmode=driving",
        DIRECTIONS_URL, request.lat, request.lon
    )
}
