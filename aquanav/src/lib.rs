//! AquaNav - live navigation and map bridge engine
//!
//! This library drives the map screens of a water-quality monitoring client.
//! It tracks the user's position, pushes typed commands into a sandboxed map
//! rendering surface, listens for events coming back out of it, and keeps a
//! turn-by-turn route to a monitoring site up to date.
//!
//! # Architecture
//!
//! ```text
//! LocationSource ──► PositionTracker ──► NavigationDriver ──► BridgeChannel ──► RenderSurface
//!                                          │      ▲                               │
//!                                          ▼      │                               │
//!                                     RouteClient │◄──────────── Event ───────────┘
//! ```
//!
//! Non-navigation screens use [`reconcile::MapScreen`] to render location and
//! sensor markers on the same kind of surface, optionally fed live by a
//! [`feed::SensorFeed`].

pub mod bridge;
pub mod config;
pub mod feed;
pub mod geo;
pub mod log;
pub mod navigation;
pub mod position;
pub mod reconcile;
pub mod route;

/// Library version, for banners and user agents.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
