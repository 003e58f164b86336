//! Sample throttling for the continuous position stream.
//!
//! Platforms deliver fixes far more often than the map needs them. The
//! throttle passes a sample through when it has moved far enough OR enough
//! time has elapsed since the last emitted sample, whichever happens first.
//!
//! # Design
//!
//! - Time is measured on the fixes' own timestamps, not the wall clock, so
//!   replayed tracks throttle identically to live ones
//! - Samples older than the last emitted one are rejected, keeping the
//!   emitted stream monotonic in time
//! - The first sample after construction is always emitted

use std::time::Duration;

use super::sample::PositionSample;

/// Distance/interval gate for position samples.
#[derive(Debug, Clone)]
pub struct SampleThrottle {
    min_distance_m: f64,
    min_interval: Duration,
    last_emitted: Option<PositionSample>,
}

impl SampleThrottle {
    pub fn new(min_distance_m: f64, min_interval: Duration) -> Self {
        Self {
            min_distance_m,
            min_interval,
            last_emitted: None,
        }
    }

    /// Decides whether `sample` should be emitted, recording it if so.
    pub fn admit(&mut self, sample: &PositionSample) -> bool {
        let Some(last) = self.last_emitted else {
            self.last_emitted = Some(*sample);
            return true;
        };

        // Out-of-order fix
        let Ok(elapsed) = (sample.timestamp - last.timestamp).to_std() else {
            return false;
        };

        let moved = sample.distance_to(&last) >= self.min_distance_m;
        let waited = elapsed >= self.min_interval;

        if moved || waited {
            self.last_emitted = Some(*sample);
            true
        } else {
            false
        }
    }
}
