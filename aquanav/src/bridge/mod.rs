//! Bridge channel between the control layer and the map rendering surface.
//!
//! The rendering surface is sandboxed: there is no shared memory and no
//! call/return. The control layer injects serialized [`Command`] envelopes
//! (fire-and-forget) and the surface posts serialized [`Event`] envelopes back.
//!
//! # Readiness gate
//!
//! The surface boots independently and reports readiness asynchronously.
//! Anything injected before that would be lost, so [`BridgeChannel`] buffers
//! commands until [`BridgeChannel::on_ready`] and then flushes them once, in
//! order:
//!
//! ```text
//! send(A) ─┐
//! send(B) ─┼─► pending [A, B] ──on_ready──► deliver A, deliver B
//!          │
//! send(C) ─┴──────────────────────────────► deliver C   (after ready)
//! ```
//!
//! # Wire format
//!
//! ```text
//! Command: {"type": "updateUserPosition", "payload": {...}}
//! Event:   {"type": "routeInfo", "data": {...}}
//! ```

mod channel;
mod message;
mod surface;

pub use channel::{BridgeChannel, ChannelStats};
pub use message::{
    Command, Event, ExternalMapsRequest, LocationRecord, NavigationTarget, RouteInfo,
    RouteOverlay, SensorReading, UserPosition,
};
pub use surface::{ChannelSurface, MapMarker, MarkerKind, RenderSurface, SimulatedSurface};

use thiserror::Error;

/// Errors raised while encoding, decoding or delivering envelopes.
///
/// None of these are ever propagated out of the channel; they are logged and
/// the envelope is dropped.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BridgeError {
    /// Envelope could not be serialized.
    #[error("Failed to serialize envelope: {0}")]
    Serialize(String),

    /// Envelope could not be deserialized.
    #[error("Failed to parse envelope: {0}")]
    Parse(String),

    /// Envelope parsed but failed schema validation.
    #[error("Invalid envelope: {0}")]
    Invalid(String),

    /// The surface refused or could not accept the envelope.
    #[error("Delivery failed: {0}")]
    Delivery(String),
}
