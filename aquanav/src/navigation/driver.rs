//! Async driver for a navigation session.
//!
//! One tokio task owns the [`NavigationSession`]. Everything that can change
//! session state arrives as a message on a single channel and is handled in
//! arrival order:
//!
//! ```text
//! tracker callback ──┐
//! route tasks ───────┤
//! settle timer ──────┼──► mpsc ──► driver task ──► NavigationSession ──► Effects
//! NavigationHandle ──┘                                                      │
//!        ▲                                                                  │
//!        └────────────── state (watch) / notices (mpsc) ◄──────────────────┘
//! ```
//!
//! Dropping the [`NavigationHandle`] unmounts the session.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::session::{Effect, NavigationSession};
use super::{Destination, ExitReason, NavigationError, NavigationState, Notice};
use crate::bridge::RenderSurface;
use crate::config::NavigationConfig;
use crate::position::{
    AccuracyProfile, LocationSource, PositionError, PositionSample, PositionTracker,
    SubscriptionHandle,
};
use crate::route::{Route, RouteError, RouteService};

enum DriverMessage {
    Acquired(Result<PositionSample, PositionError>),
    Position(PositionSample),
    TrackingLost(PositionError),
    SurfaceReady,
    SurfaceEvent(String),
    RouteCompleted {
        seq: u64,
        result: Result<Route, RouteError>,
    },
    Settled,
    Cancel,
}

/// Spawns and runs navigation sessions.
pub struct NavigationDriver<L, R, S>
where
    L: LocationSource,
    R: RouteService,
    S: RenderSurface + 'static,
{
    session: NavigationSession<S>,
    tracker: Arc<PositionTracker<L>>,
    routes: Arc<R>,
    profile: AccuracyProfile,
    tx: mpsc::UnboundedSender<DriverMessage>,
    rx: mpsc::UnboundedReceiver<DriverMessage>,
    state_tx: watch::Sender<NavigationState>,
    notice_tx: mpsc::UnboundedSender<Notice>,
    subscription: Option<SubscriptionHandle>,
    pending_work: CancellationToken,
    exit: Option<ExitReason>,
}

impl<L, R, S> NavigationDriver<L, R, S>
where
    L: LocationSource,
    R: RouteService,
    S: RenderSurface + 'static,
{
    /// Creates the session and starts its driver task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        tracker: PositionTracker<L>,
        routes: Arc<R>,
        surface: S,
        destination: Destination,
        config: &NavigationConfig,
    ) -> Result<NavigationHandle, NavigationError> {
        let session = NavigationSession::new(destination, surface, config)?;
        let profile = tracker.config().profile;

        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(NavigationState::Idle);
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let driver = Self {
            session,
            tracker: Arc::new(tracker),
            routes,
            profile,
            tx: tx.clone(),
            rx,
            state_tx,
            notice_tx,
            subscription: None,
            pending_work: CancellationToken::new(),
            exit: None,
        };

        let task = tokio::spawn(driver.run(shutdown.clone()));

        Ok(NavigationHandle {
            tx,
            state: state_rx,
            notices: Some(notice_rx),
            shutdown,
            task: Some(task),
        })
    }

    async fn run(mut self, shutdown: CancellationToken) -> ExitReason {
        let effects = self.session.start();
        self.apply(effects);

        let reason = loop {
            if let Some(reason) = self.exit {
                break reason;
            }

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    let effects = self.session.unmount();
                    self.apply(effects);
                }

                Some(message) = self.rx.recv() => {
                    self.handle(message);
                }
            }
        };

        // Covers exits that raced a pending subscription, acquisition or
        // route task
        self.stop_tracking();
        self.pending_work.cancel();

        info!(reason = ?reason, "Navigation session released");
        reason
    }

    fn handle(&mut self, message: DriverMessage) {
        let effects = match message {
            DriverMessage::Acquired(Ok(sample)) => self.session.on_first_fix(sample),
            DriverMessage::Acquired(Err(error)) => {
                let effects = self.session.on_acquire_failed(&error);
                self.apply(effects);
                self.session.abort()
            }
            DriverMessage::Position(sample) => self.session.on_position(sample),
            DriverMessage::TrackingLost(error) => self.session.on_tracking_lost(&error),
            DriverMessage::SurfaceReady => self.session.on_surface_ready(),
            DriverMessage::SurfaceEvent(raw) => self.session.on_event(&raw),
            DriverMessage::RouteCompleted { seq, result } => {
                self.session.on_route_completed(seq, result)
            }
            DriverMessage::Settled => self.session.on_settled(),
            DriverMessage::Cancel => self.session.cancel(),
        };
        self.apply(effects);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::AcquirePosition => self.acquire_position(),
                Effect::StartTracking => self.start_tracking(),
                Effect::RequestRoute {
                    seq,
                    origin,
                    destination,
                } => {
                    let routes = Arc::clone(&self.routes);
                    let tx = self.tx.clone();
                    let cancelled = self.pending_work.clone();
                    tokio::spawn(async move {
                        tokio::select! {
                            _ = cancelled.cancelled() => {
                                debug!(seq, "Route computation cancelled");
                            }
                            result = routes.compute_route(origin, destination) => {
                                let _ = tx.send(DriverMessage::RouteCompleted { seq, result });
                            }
                        }
                    });
                }
                Effect::ScheduleSettle(delay) => {
                    let tx = self.tx.clone();
                    let cancelled = self.pending_work.clone();
                    tokio::spawn(async move {
                        tokio::select! {
                            _ = cancelled.cancelled() => {}
                            _ = tokio::time::sleep(delay) => {
                                let _ = tx.send(DriverMessage::Settled);
                            }
                        }
                    });
                }
                Effect::StopTracking => self.stop_tracking(),
                Effect::CancelPending => self.pending_work.cancel(),
                Effect::Notify(notice) => {
                    if self.notice_tx.send(notice).is_err() {
                        debug!("Notice receiver dropped");
                    }
                }
                Effect::Exit(reason) => self.exit = Some(reason),
            }
        }
        self.state_tx.send_replace(self.session.state());
    }

    fn acquire_position(&self) {
        let tracker = Arc::clone(&self.tracker);
        let tx = self.tx.clone();
        let cancelled = self.pending_work.clone();
        let profile = self.profile;
        tokio::spawn(async move {
            let acquire = async {
                tracker.acquire_permission().await?;
                tracker.current_position(profile).await
            };
            tokio::select! {
                _ = cancelled.cancelled() => {
                    debug!("Position acquisition abandoned");
                }
                result = acquire => {
                    let _ = tx.send(DriverMessage::Acquired(result));
                }
            }
        });
    }

    fn start_tracking(&mut self) {
        let tx = self.tx.clone();
        match self.tracker.start(self.profile, move |update| {
            let message = match update {
                Ok(sample) => DriverMessage::Position(sample),
                Err(error) => DriverMessage::TrackingLost(error),
            };
            let _ = tx.send(message);
        }) {
            Ok(handle) => self.subscription = Some(handle),
            Err(e) => warn!(error = %e, "Continuous tracking unavailable, position will not update"),
        }
    }

    fn stop_tracking(&mut self) {
        if let Some(handle) = self.subscription.take() {
            self.tracker.stop(&handle);
        }
    }
}

/// Host-side handle to a running navigation session.
///
/// Dropping the handle unmounts the session.
pub struct NavigationHandle {
    tx: mpsc::UnboundedSender<DriverMessage>,
    state: watch::Receiver<NavigationState>,
    notices: Option<mpsc::UnboundedReceiver<Notice>>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<ExitReason>>,
}

impl NavigationHandle {
    /// The surface signalled readiness.
    pub fn surface_ready(&self) {
        self.post(DriverMessage::SurfaceReady);
    }

    /// Forwards a raw event envelope posted by the surface.
    pub fn post_event(&self, raw: impl Into<String>) {
        self.post(DriverMessage::SurfaceEvent(raw.into()));
    }

    /// Ends the session with [`ExitReason::Cancelled`].
    pub fn cancel(&self) {
        self.post(DriverMessage::Cancel);
    }

    /// Current session state.
    pub fn state(&self) -> NavigationState {
        *self.state.borrow()
    }

    /// Watch channel following every state change.
    pub fn watch_state(&self) -> watch::Receiver<NavigationState> {
        self.state.clone()
    }

    /// Takes the notice stream. Returns `None` after the first call.
    pub fn notices(&mut self) -> Option<mpsc::UnboundedReceiver<Notice>> {
        self.notices.take()
    }

    /// Waits for the session to exit.
    ///
    /// Does not end the session by itself; pair with [`cancel`](Self::cancel)
    /// or a surface exit event.
    pub async fn join(mut self) -> ExitReason {
        match self.task.take() {
            Some(task) => task.await.unwrap_or_else(|e| {
                warn!(error = %e, "Navigation task failed");
                ExitReason::Unmounted
            }),
            None => ExitReason::Unmounted,
        }
    }

    fn post(&self, message: DriverMessage) {
        if self.tx.send(message).is_err() {
            debug!("Navigation session already released");
        }
    }
}

impl Drop for NavigationHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{Command, SimulatedSurface};
    use crate::geo::LatLon;
    use crate::position::{
        BoxFuture, ManualController, ManualSource, PermissionStatus, RawFix, ReplaySource,
        TrackerConfig,
    };
    use crate::route::{Maneuver, Step};
    use std::time::Duration;

    const ORIGIN: (f64, f64) = (-6.2088, 106.8456);

    struct FixedRoutes {
        delay: Duration,
    }

    impl RouteService for FixedRoutes {
        fn compute_route(
            &self,
            origin: LatLon,
            destination: LatLon,
        ) -> BoxFuture<'_, Result<Route, RouteError>> {
            let delay = self.delay;
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(Route {
                    geometry: vec![origin, destination],
                    distance_m: origin.distance_to(&destination),
                    duration_s: 420.0,
                    steps: vec![Step {
                        maneuver: Maneuver {
                            kind: "arrive".to_string(),
                            modifier: None,
                        },
                        instruction: "Tiba di tujuan".to_string(),
                        name: String::new(),
                        distance: 0.0,
                        duration: 0.0,
                    }],
                })
            })
        }
    }

    fn destination() -> Destination {
        Destination::new(-6.1944, 106.8229, "Kali Ciliwung", "Jakarta Pusat")
    }

    fn spawn(
        delay: Duration,
    ) -> (NavigationHandle, ManualController, SimulatedSurface) {
        let (source, controller) = ManualSource::new();
        controller.set_initial_fix(RawFix::at(ORIGIN.0, ORIGIN.1).with_accuracy(5.0));
        let tracker = PositionTracker::new(source, TrackerConfig::default());
        let surface = SimulatedSurface::new();

        let handle = NavigationDriver::spawn(
            tracker,
            Arc::new(FixedRoutes { delay }),
            surface.clone(),
            destination(),
            &NavigationConfig::default(),
        )
        .unwrap();
        (handle, controller, surface)
    }

    async fn wait_for(handle: &NavigationHandle, target: NavigationState) {
        let mut state = handle.watch_state();
        tokio::time::timeout(Duration::from_secs(60), state.wait_for(|s| *s == target))
            .await
            .expect("state not reached")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaches_navigating() {
        let (handle, _controller, surface) = spawn(Duration::from_millis(100));

        wait_for(&handle, NavigationState::Tracking).await;
        handle.surface_ready();
        wait_for(&handle, NavigationState::Navigating).await;

        let delivered = surface.delivered();
        assert!(matches!(delivered[0], Command::UpdateUserPosition(_)));
        assert!(delivered
            .iter()
            .any(|c| matches!(c, Command::UpdateNavigation(_))));
        assert!(surface.route().is_some());

        handle.cancel();
        assert_eq!(handle.join().await, ExitReason::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_denied_exits() {
        let (mut handle, controller, _surface) = spawn(Duration::ZERO);
        controller.set_permission(PermissionStatus::Denied);
        let mut notices = handle.notices().unwrap();

        // Permission is requested on the driver task after spawn; the
        // controller change above lands first because nothing has yielded
        assert_eq!(handle.join().await, ExitReason::PermissionDenied);
        assert!(matches!(
            notices.recv().await,
            Some(Notice::Aborted {
                reason: ExitReason::PermissionDenied,
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_surface_exit_event_stops_tracking() {
        let (handle, controller, _surface) = spawn(Duration::ZERO);
        wait_for(&handle, NavigationState::Tracking).await;
        handle.surface_ready();
        tokio::task::yield_now().await;
        assert_eq!(controller.active_watchers(), 1);

        handle.post_event(r#"{"type":"exitNavigation"}"#);
        let mut state = handle.watch_state();
        state
            .wait_for(|s| s.is_exited())
            .await
            .unwrap();
        assert_eq!(handle.join().await, ExitReason::UserExit);

        // Give the tracker task a chance to observe the cancel
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(controller.active_watchers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_unmounts() {
        let (handle, _controller, _surface) = spawn(Duration::from_secs(5));
        wait_for(&handle, NavigationState::Tracking).await;
        let mut state = handle.watch_state();

        drop(handle);
        state.wait_for(|s| s.is_exited()).await.ok();
        assert_eq!(
            *state.borrow(),
            NavigationState::Exited(ExitReason::Unmounted)
        );
    }

    /// A platform whose permission prompt is never answered.
    struct UnansweredPrompt {
        _alive: Arc<()>,
    }

    impl LocationSource for UnansweredPrompt {
        fn request_permission(&self) -> BoxFuture<'_, PermissionStatus> {
            Box::pin(std::future::pending())
        }

        fn current_fix(
            &self,
            _profile: AccuracyProfile,
        ) -> BoxFuture<'_, Result<RawFix, PositionError>> {
            Box::pin(std::future::pending())
        }

        fn watch(
            &self,
            _profile: AccuracyProfile,
        ) -> Result<mpsc::UnboundedReceiver<RawFix>, PositionError> {
            Err(PositionError::SourceClosed)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_abandons_pending_acquisition() {
        let alive = Arc::new(());
        let source = UnansweredPrompt {
            _alive: Arc::clone(&alive),
        };
        let handle = NavigationDriver::spawn(
            PositionTracker::new(source, TrackerConfig::default()),
            Arc::new(FixedRoutes {
                delay: Duration::ZERO,
            }),
            SimulatedSurface::new(),
            destination(),
            &NavigationConfig::default(),
        )
        .unwrap();
        let mut state = handle.watch_state();
        wait_for(&handle, NavigationState::AcquiringPosition).await;

        drop(handle);
        state.wait_for(|s| s.is_exited()).await.ok();
        tokio::time::sleep(Duration::from_secs(60)).await;

        // Only the test still holds the source
        assert_eq!(Arc::strong_count(&alive), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_stream_end_reaches_host() {
        let start = chrono::Utc::now();
        let fixes = vec![
            RawFix::at_time(ORIGIN.0, ORIGIN.1, start),
            RawFix::at_time(ORIGIN.0, ORIGIN.1, start + chrono::Duration::seconds(1)),
        ];
        let tracker = PositionTracker::new(
            ReplaySource::new(fixes, Duration::from_secs(1)),
            TrackerConfig::default(),
        );
        let mut handle = NavigationDriver::spawn(
            tracker,
            Arc::new(FixedRoutes {
                delay: Duration::ZERO,
            }),
            SimulatedSurface::new(),
            destination(),
            &NavigationConfig::default(),
        )
        .unwrap();
        let mut notices = handle.notices().unwrap();

        let lost = tokio::time::timeout(Duration::from_secs(60), async {
            loop {
                match notices.recv().await {
                    Some(Notice::TrackingLost { message }) => break Some(message),
                    Some(_) => continue,
                    None => break None,
                }
            }
        })
        .await
        .expect("stream end not reported");
        assert_eq!(lost.as_deref(), Some("Location source closed"));
        assert_eq!(handle.state(), NavigationState::Tracking);

        handle.cancel();
        assert_eq!(handle.join().await, ExitReason::Cancelled);
    }
}
