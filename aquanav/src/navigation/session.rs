//! Navigation session state machine.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::external::external_maps_url;
use super::{Destination, ErrorKind, ExitReason, NavigationError, NavigationState, Notice};
use crate::bridge::{
    BridgeChannel, Command, Event, NavigationTarget, RenderSurface, RouteInfo, RouteOverlay,
    UserPosition,
};
use crate::config::NavigationConfig;
use crate::geo::LatLon;
use crate::position::{PositionError, PositionSample};
use crate::route::{Route, RouteError, RouteSequencer};

/// Work the driver must carry out on behalf of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Request permission, then a first fix.
    AcquirePosition,
    /// Subscribe to continuous position updates.
    StartTracking,
    /// Compute a route and report back with the same sequence number.
    RequestRoute {
        seq: u64,
        origin: LatLon,
        destination: LatLon,
    },
    /// Report back after the delay.
    ScheduleSettle(Duration),
    StopTracking,
    /// Abandon every in-flight route computation, timer and acquisition.
    CancelPending,
    Notify(Notice),
    Exit(ExitReason),
}

/// State of one navigation screen.
pub struct NavigationSession<S: RenderSurface> {
    state: NavigationState,
    destination: Destination,
    channel: BridgeChannel<S>,
    settle_delay: Duration,
    latest: Option<PositionSample>,
    route: Option<Route>,
    route_info: Option<RouteInfo>,
    sequencer: RouteSequencer,
    settle_scheduled: bool,
    navigation_issued: bool,
}

impl<S: RenderSurface> NavigationSession<S> {
    pub fn new(
        destination: Destination,
        surface: S,
        config: &NavigationConfig,
    ) -> Result<Self, NavigationError> {
        if !destination.position().is_valid() {
            return Err(NavigationError::InvalidDestination {
                lat: destination.latitude,
                lon: destination.longitude,
            });
        }

        Ok(Self {
            state: NavigationState::Idle,
            destination,
            channel: BridgeChannel::new(surface),
            settle_delay: config.settle_delay,
            latest: None,
            route: None,
            route_info: None,
            sequencer: RouteSequencer::new(),
            settle_scheduled: false,
            navigation_issued: false,
        })
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn latest_position(&self) -> Option<&PositionSample> {
        self.latest.as_ref()
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn route_info(&self) -> Option<&RouteInfo> {
        self.route_info.as_ref()
    }

    pub fn channel(&self) -> &BridgeChannel<S> {
        &self.channel
    }

    // =========================================================================
    // Acquisition
    // =========================================================================

    /// `Idle → AcquiringPosition`.
    pub fn start(&mut self) -> Vec<Effect> {
        if self.state != NavigationState::Idle {
            debug!(state = ?self.state, "Session already started");
            return Vec::new();
        }
        info!(
            destination = %self.destination.name,
            lat = self.destination.latitude,
            lon = self.destination.longitude,
            "Navigation starting"
        );
        self.state = NavigationState::AcquiringPosition;
        vec![Effect::AcquirePosition]
    }

    /// `AcquiringPosition → Tracking`: renders the user and asks for a route.
    pub fn on_first_fix(&mut self, sample: PositionSample) -> Vec<Effect> {
        if self.state != NavigationState::AcquiringPosition {
            debug!(state = ?self.state, "Ignoring first fix outside acquisition");
            return Vec::new();
        }

        info!(
            lat = sample.latitude,
            lon = sample.longitude,
            accuracy = sample.accuracy,
            "First fix acquired"
        );
        self.state = NavigationState::Tracking;
        self.channel
            .send_command(Command::UpdateUserPosition(UserPosition::from(&sample)));
        let origin = sample.position();
        self.latest = Some(sample);

        let mut effects = vec![Effect::StartTracking, self.request_route(origin)];
        effects.extend(self.maybe_schedule_settle());
        effects
    }

    /// `AcquiringPosition → Error(kind)`. Follow with [`abort`](Self::abort).
    pub fn on_acquire_failed(&mut self, error: &PositionError) -> Vec<Effect> {
        if self.state != NavigationState::AcquiringPosition {
            return Vec::new();
        }

        let kind = match error {
            PositionError::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::NoFix,
        };
        warn!(error = %error, "Position acquisition failed, aborting navigation");
        self.state = NavigationState::Error(kind);

        vec![Effect::Notify(Notice::Aborted {
            reason: kind.into(),
            message: error.to_string(),
        })]
    }

    /// `Error(kind) → Exited`.
    pub fn abort(&mut self) -> Vec<Effect> {
        match self.state {
            NavigationState::Error(kind) => self.shutdown(kind.into()),
            _ => Vec::new(),
        }
    }

    // =========================================================================
    // Surface
    // =========================================================================

    /// The surface reported it can accept commands.
    pub fn on_surface_ready(&mut self) -> Vec<Effect> {
        if self.state.is_exited() {
            return Vec::new();
        }
        self.channel.on_ready();
        self.maybe_schedule_settle().into_iter().collect()
    }

    /// The settle delay elapsed: issue the first `updateNavigation`.
    pub fn on_settled(&mut self) -> Vec<Effect> {
        if !self.state.is_active() || self.navigation_issued {
            return Vec::new();
        }
        let Some(origin) = self.latest.as_ref().map(PositionSample::position) else {
            return Vec::new();
        };

        self.channel
            .send_command(Command::UpdateNavigation(NavigationTarget {
                origin,
                destination: self.destination.clone(),
            }));
        self.navigation_issued = true;

        // A route that landed before the surface settled is drawn again on
        // top of the fresh navigation view
        if let Some(route) = &self.route {
            self.channel
                .send_command(Command::UpdateRoute(RouteOverlay::from(route)));
        }

        self.maybe_enter_navigating();
        Vec::new()
    }

    /// Raw event posted by the surface.
    pub fn on_event(&mut self, raw: &str) -> Vec<Effect> {
        if self.state.is_exited() {
            debug!("Dropping surface event after exit");
            return Vec::new();
        }
        let Some(event) = self.channel.on_event(raw) else {
            return Vec::new();
        };

        match event {
            Event::ExitNavigation => self.shutdown(ExitReason::UserExit),
            Event::ReturnToMap => self.shutdown(ExitReason::ReturnToMap),
            Event::RouteInfo(info) => {
                debug!(
                    distance = %info.formatted_distance,
                    time = %info.formatted_time,
                    "Route info from surface"
                );
                self.route_info = Some(info.clone());
                vec![Effect::Notify(Notice::RouteInfo(info))]
            }
            Event::OpenExternalMaps(request) => {
                let url = external_maps_url(&request);
                info!(url = %url, "Handing off to external maps");
                vec![Effect::Notify(Notice::OpenExternal {
                    url,
                    name: request.name,
                })]
            }
        }
    }

    // =========================================================================
    // Position and route
    // =========================================================================

    /// A throttled sample from the tracker.
    pub fn on_position(&mut self, sample: PositionSample) -> Vec<Effect> {
        if !self.state.is_active() {
            debug!(state = ?self.state, "Dropping position sample");
            return Vec::new();
        }
        if let Some(latest) = &self.latest {
            if sample.timestamp < latest.timestamp {
                debug!(
                    sample = %sample.timestamp,
                    latest = %latest.timestamp,
                    "Dropping out-of-order position sample"
                );
                return Vec::new();
            }
        }

        self.channel
            .send_command(Command::UpdateUserPosition(UserPosition::from(&sample)));
        let origin = sample.position();
        self.latest = Some(sample);

        vec![self.request_route(origin)]
    }

    /// The continuous position stream ended. The session keeps its last
    /// position and route; the host decides whether to leave.
    pub fn on_tracking_lost(&mut self, error: &PositionError) -> Vec<Effect> {
        if !self.state.is_active() {
            return Vec::new();
        }
        warn!(error = %error, "Position updates stopped");
        vec![Effect::Notify(Notice::TrackingLost {
            message: error.to_string(),
        })]
    }

    /// A route computation finished.
    pub fn on_route_completed(
        &mut self,
        seq: u64,
        result: Result<Route, RouteError>,
    ) -> Vec<Effect> {
        if self.state.is_exited() {
            debug!(seq, "Dropping route completion after exit");
            return Vec::new();
        }

        let route = match result {
            Ok(route) => route,
            Err(e) => {
                warn!(seq, error = %e, "Route computation failed, keeping last route");
                return Vec::new();
            }
        };

        if !self.sequencer.accept(seq) {
            debug!(
                seq,
                applied = self.sequencer.latest_applied(),
                "Discarding stale route"
            );
            return Vec::new();
        }

        info!(
            seq,
            distance = %route.formatted_distance(),
            time = %route.formatted_time(),
            steps = route.steps.len(),
            "Route applied"
        );

        self.channel
            .send_command(Command::UpdateRoute(RouteOverlay::from(&route)));
        let notice = Notice::RouteApplied {
            distance: route.formatted_distance(),
            time: route.formatted_time(),
            next_instruction: route.next_instruction().map(|s| s.instruction.clone()),
        };
        self.route = Some(route);
        self.maybe_enter_navigating();

        vec![Effect::Notify(notice)]
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Host-initiated exit.
    pub fn cancel(&mut self) -> Vec<Effect> {
        self.shutdown(ExitReason::Cancelled)
    }

    /// The screen went away.
    pub fn unmount(&mut self) -> Vec<Effect> {
        self.shutdown(ExitReason::Unmounted)
    }

    fn shutdown(&mut self, reason: ExitReason) -> Vec<Effect> {
        if self.state.is_exited() {
            return Vec::new();
        }

        info!(reason = ?reason, from = ?self.state, "Navigation exiting");
        self.state = NavigationState::Exited(reason);
        self.sequencer.invalidate();
        self.channel.reset();

        vec![
            Effect::StopTracking,
            Effect::CancelPending,
            Effect::Exit(reason),
        ]
    }

    fn request_route(&mut self, origin: LatLon) -> Effect {
        let seq = self.sequencer.next();
        debug!(seq, in_flight = self.sequencer.in_flight(), "Requesting route");
        Effect::RequestRoute {
            seq,
            origin,
            destination: self.destination.position(),
        }
    }

    fn maybe_schedule_settle(&mut self) -> Option<Effect> {
        if self.settle_scheduled
            || !self.state.is_active()
            || !self.channel.is_ready()
            || self.latest.is_none()
        {
            return None;
        }
        self.settle_scheduled = true;
        Some(Effect::ScheduleSettle(self.settle_delay))
    }

    fn maybe_enter_navigating(&mut self) {
        if self.state == NavigationState::Tracking
            && self.channel.is_ready()
            && self.navigation_issued
            && self.route.is_some()
        {
            info!(destination = %self.destination.name, "Navigating");
            self.state = NavigationState::Navigating;
        }
    }
}
