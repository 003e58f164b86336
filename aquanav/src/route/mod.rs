//! Route service client.
//!
//! Computes driving routes through an OSRM-compatible directions API and
//! formats them for display.
//!
//! # Staleness
//!
//! A new route is requested on every position update, so several requests
//! can be in flight at once. Each request takes a sequence number from a
//! [`RouteSequencer`]; a result is applied only if nothing newer has been
//! applied already. A slow, stale response therefore never overwrites a
//! newer route.
//!
//! # Example
//!
//! ```ignore
//! use aquanav::route::{RouteClient, ReqwestClient, RouteServiceConfig};
//!
//! let http = ReqwestClient::new(config.timeout)?;
//! let client = RouteClient::new(http, RouteServiceConfig::default());
//! let route = client.compute_route(origin, destination).await?;
//! println!("{} / {}", route.formatted_distance(), route.formatted_time());
//! ```

mod client;
mod format;
mod http;
mod instruction;
mod sequencer;
mod types;

pub use client::{RouteClient, RouteService};
pub use format::{format_distance, format_time};
pub use http::{AsyncHttpClient, ReqwestClient};
pub use instruction::instruction_text;
pub use sequencer::RouteSequencer;
pub use types::{Maneuver, Route, Step};

#[cfg(test)]
pub use http::tests::MockHttpClient;

use thiserror::Error;

/// Route service failures. All of them are recoverable: the caller keeps the
/// last good route.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RouteError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-2xx response.
    #[error("HTTP {status} from routing service")]
    Status { status: u16 },

    /// No response within the configured bound.
    #[error("Routing request timed out after {0}s")]
    Timeout(u64),

    /// Response body could not be decoded.
    #[error("Invalid routing response: {0}")]
    Parse(String),

    /// The service answered but found no route.
    #[error("No route found: {0}")]
    NoRoute(String),
}
