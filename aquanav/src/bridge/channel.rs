//! Readiness-gated command channel.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use super::message::{Command, Event};
use super::surface::RenderSurface;

/// Delivery counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Commands handed to the surface.
    pub delivered: u64,
    /// Commands the surface refused or that failed to serialize.
    pub failed: u64,
    /// Commands dropped by validation.
    pub rejected: u64,
    /// Events dropped because they failed to parse or validate.
    pub bad_events: u64,
    /// Largest pending queue observed before readiness.
    pub peak_pending: usize,
}

/// One-way-each-direction channel to a rendering surface.
///
/// All methods are synchronous and non-blocking; the channel is owned by a
/// single session task and never shared.
pub struct BridgeChannel<S: RenderSurface> {
    surface: S,
    ready: bool,
    pending: VecDeque<Command>,
    stats: ChannelStats,
}

impl<S: RenderSurface> BridgeChannel<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            ready: false,
            pending: VecDeque::new(),
            stats: ChannelStats::default(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Sends a command, or queues it until the surface is ready.
    ///
    /// Invalid commands are logged and dropped. Delivery failures are logged
    /// and never retried.
    pub fn send_command(&mut self, command: Command) {
        if let Err(e) = command.validate() {
            warn!(command = command.type_name(), error = %e, "Dropping invalid command");
            self.stats.rejected += 1;
            return;
        }

        if !self.ready {
            debug!(
                command = command.type_name(),
                pending = self.pending.len() + 1,
                "Surface not ready, queueing command"
            );
            self.pending.push_back(command);
            self.stats.peak_pending = self.stats.peak_pending.max(self.pending.len());
            return;
        }

        self.deliver(&command);
    }

    /// Marks the surface ready and flushes the pending queue in order.
    ///
    /// Only the first readiness signal flushes; repeats are ignored.
    pub fn on_ready(&mut self) {
        if self.ready {
            debug!("Duplicate surface readiness signal ignored");
            return;
        }
        self.ready = true;

        let queued = std::mem::take(&mut self.pending);
        info!(flushed = queued.len(), "Rendering surface ready");
        for command in &queued {
            self.deliver(command);
        }
    }

    /// Decodes an event posted by the surface.
    ///
    /// Returns `None` (after logging) for anything that fails to parse or
    /// validate; the caller's state is never touched in that case.
    pub fn on_event(&mut self, raw: &str) -> Option<Event> {
        match Event::from_json(raw) {
            Ok(event) => {
                debug!(event = event.type_name(), "Surface event received");
                Some(event)
            }
            Err(e) => {
                warn!(error = %e, raw = %truncate(raw, 200), "Dropping malformed surface event");
                self.stats.bad_events += 1;
                None
            }
        }
    }

    /// Drops any queued commands and returns to the not-ready state.
    pub fn reset(&mut self) {
        if !self.pending.is_empty() {
            debug!(dropped = self.pending.len(), "Discarding undelivered commands");
        }
        self.pending.clear();
        self.ready = false;
    }

    fn deliver(&mut self, command: &Command) {
        let envelope = match command.to_json() {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(command = command.type_name(), error = %e, "Failed to encode command");
                self.stats.failed += 1;
                return;
            }
        };

        match self.surface.deliver(&envelope) {
            Ok(()) => self.stats.delivered += 1,
            Err(e) => {
                warn!(command = command.type_name(), error = %e, "Command delivery failed");
                self.stats.failed += 1;
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{SimulatedSurface, UserPosition};

    fn position_command(lat: f64) -> Command {
        Command::UpdateUserPosition(UserPosition {
            lat,
            lon: 106.8,
            accuracy: 3.0,
            bearing: 0.0,
        })
    }

    fn delivered_lats(surface: &SimulatedSurface) -> Vec<f64> {
        surface
            .delivered()
            .into_iter()
            .filter_map(|c| match c {
                Command::UpdateUserPosition(p) => Some(p.lat),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_commands_queue_until_ready() {
        let surface = SimulatedSurface::new();
        let mut channel = BridgeChannel::new(surface.clone());

        channel.send_command(position_command(1.0));
        channel.send_command(position_command(2.0));
        assert_eq!(channel.pending_len(), 2);
        assert_eq!(surface.delivered_count(), 0);

        channel.on_ready();
        assert_eq!(channel.pending_len(), 0);
        assert_eq!(delivered_lats(&surface), vec![1.0, 2.0]);
    }

    #[test]
    fn test_queued_commands_precede_later_sends() {
        let surface = SimulatedSurface::new();
        let mut channel = BridgeChannel::new(surface.clone());

        channel.send_command(position_command(1.0));
        channel.on_ready();
        channel.send_command(position_command(2.0));
        channel.send_command(position_command(3.0));

        assert_eq!(delivered_lats(&surface), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_duplicate_ready_does_not_redeliver() {
        let surface = SimulatedSurface::new();
        let mut channel = BridgeChannel::new(surface.clone());

        channel.send_command(position_command(1.0));
        channel.on_ready();
        channel.on_ready();

        assert_eq!(surface.delivered_count(), 1);
    }

    #[test]
    fn test_invalid_command_is_dropped() {
        let surface = SimulatedSurface::new();
        let mut channel = BridgeChannel::new(surface.clone());
        channel.on_ready();

        channel.send_command(position_command(95.0));
        assert_eq!(surface.delivered_count(), 0);
        assert_eq!(channel.stats().rejected, 1);
    }

    #[test]
    fn test_delivery_failure_is_not_retried() {
        let surface = SimulatedSurface::new();
        let mut channel = BridgeChannel::new(surface.clone());
        channel.on_ready();

        surface.set_failing(true);
        channel.send_command(position_command(1.0));
        surface.set_failing(false);
        channel.send_command(position_command(2.0));

        assert_eq!(delivered_lats(&surface), vec![2.0]);
        assert_eq!(channel.stats().failed, 1);
        assert_eq!(channel.stats().delivered, 1);
    }

    #[test]
    fn test_malformed_event_is_dropped() {
        let mut channel = BridgeChannel::new(SimulatedSurface::new());
        assert!(channel.on_event("{broken").is_none());
        assert!(channel.on_event(r#"{"type":"unknown"}"#).is_none());
        assert_eq!(channel.stats().bad_events, 2);

        assert_eq!(
            channel.on_event(r#"{"type":"exitNavigation"}"#),
            Some(Event::ExitNavigation)
        );
    }

    #[test]
    fn test_reset_discards_pending() {
        let surface = SimulatedSurface::new();
        let mut channel = BridgeChannel::new(surface.clone());
        channel.send_command(position_command(1.0));

        channel.reset();
        channel.on_ready();
        assert_eq!(surface.delivered_count(), 0);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_pre_ready_commands_delivered_first(
                before in 0usize..20,
                after in 0usize..20,
            ) {
                let surface = SimulatedSurface::new();
                let mut channel = BridgeChannel::new(surface.clone());

                // Latitudes encode send order: negatives before ready, positives after
                for i in 0..before {
                    channel.send_command(position_command(-(i as f64) - 1.0));
                }
                channel.on_ready();
                for i in 0..after {
                    channel.send_command(position_command(i as f64 + 1.0));
                }

                let expected: Vec<f64> = (0..before)
                    .map(|i| -(i as f64) - 1.0)
                    .chain((0..after).map(|i| i as f64 + 1.0))
                    .collect();
                prop_assert_eq!(delivered_lats(&surface), expected);
            }
        }
    }
}
