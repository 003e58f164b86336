//! Navigation to a monitoring site.
//!
//! A navigation screen is one [`NavigationSession`] owned by one driver task.
//! The session is a plain state machine: it consumes inputs (fixes, surface
//! events, route completions, timers) and returns [`Effect`]s for the driver
//! to carry out. It never awaits and never spawns, which keeps every
//! transition testable without a runtime.
//!
//! # States
//!
//! ```text
//! Idle ──start──► AcquiringPosition ──first fix──► Tracking ──ready + updateNavigation + route──► Navigating
//!                        │                             │                                              │
//!                        ▼                             └──────────── exit / cancel / unmount ─────────┤
//!                   Error(kind) ──abort──► Exited ◄───────────────────────────────────────────────────┘
//! ```
//!
//! Every position sample in `Tracking` or `Navigating` updates the user
//! marker and requests a fresh route. Older in-flight routes are superseded
//! through a [`RouteSequencer`](crate::route::RouteSequencer).

mod driver;
mod external;
mod session;

pub use driver::{NavigationDriver, NavigationHandle};
pub use external::external_maps_url;
pub use session::{Effect, NavigationSession};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bridge::RouteInfo;
use crate::geo::LatLon;

/// The site being navigated to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    pub name: String,
    #[serde(default)]
    pub address: String,
}

impl Destination {
    pub fn new(
        latitude: f64,
        longitude: f64,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            name: name.into(),
            address: address.into(),
        }
    }

    pub fn position(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }
}

/// Why position acquisition failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PermissionDenied,
    NoFix,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// `exitNavigation` from the surface.
    UserExit,
    /// `returnToMainMap` from the surface.
    ReturnToMap,
    /// Explicit cancel from the host.
    Cancelled,
    /// The screen went away (handle dropped).
    Unmounted,
    PermissionDenied,
    NoFix,
}

impl From<ErrorKind> for ExitReason {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::PermissionDenied => ExitReason::PermissionDenied,
            ErrorKind::NoFix => ExitReason::NoFix,
        }
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationState {
    Idle,
    AcquiringPosition,
    Tracking,
    Navigating,
    Error(ErrorKind),
    Exited(ExitReason),
}

impl NavigationState {
    pub fn is_exited(&self) -> bool {
        matches!(self, NavigationState::Exited(_))
    }

    /// States in which position samples are consumed.
    pub fn is_active(&self) -> bool {
        matches!(self, NavigationState::Tracking | NavigationState::Navigating)
    }
}

/// User-facing output of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Navigation could not start; the screen should close.
    Aborted { reason: ExitReason, message: String },
    /// A new route was applied.
    RouteApplied {
        distance: String,
        time: String,
        next_instruction: Option<String>,
    },
    /// The surface reported new route figures.
    RouteInfo(RouteInfo),
    /// Hand navigation off to an external maps application.
    OpenExternal { url: String, name: String },
    /// The position stream ended; the route is no longer refreshed.
    TrackingLost { message: String },
}

/// Errors raised when a session cannot be created.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NavigationError {
    #[error("Invalid destination ({lat}, {lon})")]
    InvalidDestination { lat: f64, lon: f64 },
}
