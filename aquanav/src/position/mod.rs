//! Position tracking.
//!
//! Wraps a platform continuous-location stream and turns raw fixes into
//! normalized [`PositionSample`]s for the navigation session.
//!
//! # Flow
//!
//! ```text
//! LocationSource::watch() ──► RawFix ──► SampleThrottle ──► PositionSample ──► callback
//!                                         (≥5 m or ≥1 s)
//! ```
//!
//! The platform seam is the [`LocationSource`] trait. Two sources ship with
//! the crate: [`ManualSource`], driven by the host (or a test) through a
//! controller, and [`ReplaySource`], which replays a recorded track.
//!
//! # Example
//!
//! ```ignore
//! let (source, controller) = ManualSource::new();
//! let tracker = PositionTracker::new(source, TrackerConfig::default());
//!
//! tracker.acquire_permission().await?;
//! let first = tracker.current_position(AccuracyProfile::Navigation).await?;
//! let handle = tracker.start(AccuracyProfile::Navigation, |update| match update {
//!     Ok(sample) => println!("{:.5}, {:.5}", sample.latitude, sample.longitude),
//!     Err(e) => eprintln!("tracking ended: {}", e),
//! })?;
//!
//! // Later, possibly more than once
//! tracker.stop(&handle);
//! ```

mod sample;
mod source;
mod throttle;
mod tracker;

pub use sample::{PositionSample, RawFix};
pub use source::{
    AccuracyProfile, BoxFuture, LocationSource, ManualController, ManualSource, PermissionStatus,
    ReplaySource,
};
pub use throttle::SampleThrottle;
pub use tracker::{
    PositionTracker, SubscriptionHandle, TrackerConfig, MIN_DISTANCE_FLOOR_M, MIN_INTERVAL_FLOOR,
};

use thiserror::Error;

/// Errors raised by the position layer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PositionError {
    /// The user refused the foreground location permission. Fatal for the
    /// session; never retried.
    #[error("Location permission denied")]
    PermissionDenied,

    /// No usable fix could be obtained.
    #[error("Position fix unavailable: {0}")]
    FixUnavailable(String),

    /// The platform stream closed or could not be opened.
    #[error("Location source closed")]
    SourceClosed,

    /// A recorded track could not be loaded.
    #[error("Invalid track: {0}")]
    InvalidTrack(String),
}
