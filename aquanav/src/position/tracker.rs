//! Continuous position tracking with cancellable subscriptions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::sample::PositionSample;
use super::source::{AccuracyProfile, LocationSource, PermissionStatus};
use super::throttle::SampleThrottle;
use super::PositionError;

/// Smallest spatial delta the tracker will throttle at.
pub const MIN_DISTANCE_FLOOR_M: f64 = 5.0;

/// Smallest temporal interval the tracker will throttle at.
pub const MIN_INTERVAL_FLOOR: Duration = Duration::from_secs(1);

/// Tracker configuration.
///
/// Both thresholds are clamped to their floors; a sample is emitted when
/// either threshold is crossed.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Minimum distance in meters between emitted samples.
    pub min_distance_m: f64,
    /// Minimum time between emitted samples.
    pub min_interval: Duration,
    /// Accuracy requested from the platform.
    pub profile: AccuracyProfile,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_distance_m: MIN_DISTANCE_FLOOR_M,
            min_interval: MIN_INTERVAL_FLOOR,
            profile: AccuracyProfile::Navigation,
        }
    }
}

impl TrackerConfig {
    pub fn with_min_distance(mut self, meters: f64) -> Self {
        self.min_distance_m = if meters.is_finite() {
            meters.max(MIN_DISTANCE_FLOOR_M)
        } else {
            MIN_DISTANCE_FLOOR_M
        };
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval.max(MIN_INTERVAL_FLOOR);
        self
    }

    pub fn with_profile(mut self, profile: AccuracyProfile) -> Self {
        self.profile = profile;
        self
    }
}

type SampleCallback = Box<dyn FnMut(Result<PositionSample, PositionError>) + Send>;

/// Handle to a running position subscription.
///
/// Cancelling is idempotent. Once [`cancel`](Self::cancel) returns the
/// callback has been dropped and will never run again. The callback must not
/// cancel its own subscription.
#[derive(Clone)]
pub struct SubscriptionHandle {
    id: u64,
    token: CancellationToken,
    callback: Arc<Mutex<Option<SampleCallback>>>,
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Stops the subscription. Safe to call any number of times.
    pub fn cancel(&self) {
        self.token.cancel();
        // Taking the callback under the lock waits out an in-flight delivery
        self.callback.lock().take();
    }
}

/// Position tracker over a platform [`LocationSource`].
pub struct PositionTracker<L: LocationSource> {
    source: Arc<L>,
    config: TrackerConfig,
    next_id: AtomicU64,
}

impl<L: LocationSource> PositionTracker<L> {
    pub fn new(source: L, config: TrackerConfig) -> Self {
        Self {
            source: Arc::new(source),
            config,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Requests foreground location permission.
    ///
    /// # Errors
    ///
    /// [`PositionError::PermissionDenied`] when the user refuses. The caller
    /// must abort navigation; the tracker does not retry.
    pub async fn acquire_permission(&self) -> Result<(), PositionError> {
        match self.source.request_permission().await {
            PermissionStatus::Granted => {
                debug!("Location permission granted");
                Ok(())
            }
            PermissionStatus::Denied => {
                warn!("Location permission denied");
                Err(PositionError::PermissionDenied)
            }
        }
    }

    /// Acquires a single fix.
    pub async fn current_position(
        &self,
        profile: AccuracyProfile,
    ) -> Result<PositionSample, PositionError> {
        let fix = self.source.current_fix(profile).await?;
        let sample = PositionSample::from_fix(&fix);

        if !sample.position().is_valid() {
            return Err(PositionError::FixUnavailable(format!(
                "invalid coordinate ({}, {})",
                sample.latitude, sample.longitude
            )));
        }

        Ok(sample)
    }

    /// Starts continuous tracking.
    ///
    /// `on_sample` runs on a tracker task for every sample that passes the
    /// distance/interval throttle and carries a valid coordinate. If the
    /// platform stream ends before the subscription is stopped, it receives
    /// [`PositionError::SourceClosed`] once and is then dropped.
    pub fn start<F>(
        &self,
        profile: AccuracyProfile,
        on_sample: F,
    ) -> Result<SubscriptionHandle, PositionError>
    where
        F: FnMut(Result<PositionSample, PositionError>) + Send + 'static,
    {
        let mut fixes = self.source.watch(profile)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let callback: Arc<Mutex<Option<SampleCallback>>> =
            Arc::new(Mutex::new(Some(Box::new(on_sample))));

        let handle = SubscriptionHandle {
            id,
            token: token.clone(),
            callback: Arc::clone(&callback),
        };

        let mut throttle = SampleThrottle::new(self.config.min_distance_m, self.config.min_interval);

        info!(
            subscription = id,
            profile = profile.as_str(),
            min_distance_m = self.config.min_distance_m,
            min_interval_ms = self.config.min_interval.as_millis() as u64,
            "Position tracking started"
        );

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    _ = token.cancelled() => break,

                    fix = fixes.recv() => {
                        let Some(fix) = fix else {
                            warn!(subscription = id, "Location stream ended");
                            if let Some(mut cb) = callback.lock().take() {
                                cb(Err(PositionError::SourceClosed));
                            }
                            break;
                        };

                        let sample = PositionSample::from_fix(&fix);
                        if !sample.position().is_valid() {
                            warn!(
                                subscription = id,
                                lat = fix.latitude,
                                lon = fix.longitude,
                                "Dropping fix with invalid coordinate"
                            );
                            continue;
                        }
                        if !throttle.admit(&sample) {
                            continue;
                        }

                        let delivered = {
                            let mut guard = callback.lock();
                            match guard.as_mut() {
                                Some(cb) => {
                                    cb(Ok(sample));
                                    true
                                }
                                None => false,
                            }
                        };
                        if !delivered {
                            break;
                        }
                    }
                }
            }
            debug!(subscription = id, "Position tracking task finished");
        });

        Ok(handle)
    }

    /// Stops a subscription. Idempotent.
    pub fn stop(&self, handle: &SubscriptionHandle) {
        if handle.is_active() {
            info!(subscription = handle.id(), "Position tracking stopped");
        }
        handle.cancel();
    }
}
