//! A non-navigation map screen.

use tracing::debug;

use super::{reconcile, ReconcileSummary, SensorCollection};
use crate::bridge::{BridgeChannel, Event, LocationRecord, RenderSurface};

/// Owns the bridge to one map surface and the dataset drawn on it.
///
/// Renders only when the dataset changed since the last render.
pub struct MapScreen<S: RenderSurface> {
    channel: BridgeChannel<S>,
    locations: Vec<LocationRecord>,
    sensors: Vec<SensorCollection>,
    dirty: bool,
    renders: usize,
}

impl<S: RenderSurface> MapScreen<S> {
    pub fn new(surface: S) -> Self {
        Self {
            channel: BridgeChannel::new(surface),
            locations: Vec::new(),
            sensors: Vec::new(),
            dirty: true,
            renders: 0,
        }
    }

    pub fn channel(&self) -> &BridgeChannel<S> {
        &self.channel
    }

    pub fn locations(&self) -> &[LocationRecord] {
        &self.locations
    }

    pub fn sensors(&self) -> &[SensorCollection] {
        &self.sensors
    }

    /// Number of renders pushed so far.
    pub fn render_count(&self) -> usize {
        self.renders
    }

    pub fn on_ready(&mut self) {
        self.channel.on_ready();
    }

    /// Decodes an event from the surface. Map screens act on none of them,
    /// but malformed ones are still logged and counted.
    pub fn on_event(&mut self, raw: &str) -> Option<Event> {
        self.channel.on_event(raw)
    }

    pub fn set_locations(&mut self, locations: Vec<LocationRecord>) {
        if self.locations != locations {
            self.locations = locations;
            self.dirty = true;
        }
    }

    pub fn set_sensors(&mut self, sensors: Vec<SensorCollection>) {
        if self.sensors != sensors {
            self.sensors = sensors;
            self.dirty = true;
        }
    }

    /// Replaces both datasets and renders if anything changed.
    pub fn refresh(
        &mut self,
        locations: Vec<LocationRecord>,
        sensors: Vec<SensorCollection>,
    ) -> Option<ReconcileSummary> {
        self.set_locations(locations);
        self.set_sensors(sensors);
        self.render()
    }

    /// Merges one realtime collection (replacing the same sensor's previous
    /// readings) and renders if anything changed.
    pub fn apply_collection(&mut self, collection: SensorCollection) -> Option<ReconcileSummary> {
        match self
            .sensors
            .iter_mut()
            .find(|existing| existing.sensor_id == collection.sensor_id)
        {
            Some(existing) if *existing == collection => {}
            Some(existing) => {
                *existing = collection;
                self.dirty = true;
            }
            None => {
                self.sensors.push(collection);
                self.dirty = true;
            }
        }
        self.render()
    }

    /// Pushes the dataset to the surface if it changed since the last render.
    pub fn render(&mut self) -> Option<ReconcileSummary> {
        if !self.dirty {
            debug!("Dataset unchanged, skipping render");
            return None;
        }
        let summary = reconcile(&mut self.channel, &self.locations, &self.sensors);
        self.dirty = false;
        self.renders += 1;
        Some(summary)
    }
}
