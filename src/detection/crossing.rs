//! Counting-line crossing detection
//!
//! The counting line is vertical at `line_x`. A track crosses when two
//! consecutive sightings lie on opposite sides of it:
//!
//! - left to right iff `previous.x < line_x <= current.x`
//! - right to left iff `previous.x > line_x >= current.x`
//!
//! Each track id is counted at most once. A crossing that happens within the
//! minimum dwell time of the track's first sighting is treated as tracker
//! noise: it is dropped without marking the id as counted and without
//! re-anchoring the track, so a later crossing of the same id is still
//! measured from the original first sighting.

use super::track_store::TrackStateStore;
use crate::types::{ClassId, CrossingEvent, Direction, Observation, TrackId};
use std::collections::HashSet;

/// Which side of the line the track moved to, if it crossed at all
#[inline]
pub fn classify_crossing(previous_x: f64, current_x: f64, line_x: f64) -> Option<Direction> {
    if previous_x < line_x && line_x <= current_x {
        Some(Direction::LeftToRight)
    } else if previous_x > line_x && line_x >= current_x {
        Some(Direction::RightToLeft)
    } else {
        None
    }
}

/// Counters kept alongside detection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectorStats {
    /// Observations evaluated (allowed class)
    pub observations: u64,
    /// Observations dropped for their class label
    pub filtered: u64,
    /// Crossings dropped for being within the dwell threshold
    pub suppressed: u64,
    /// Crossings by already-counted ids
    pub repeated: u64,
}

/// Crossing detector with its own track state
#[derive(Debug)]
pub struct CrossingDetector {
    store: TrackStateStore,
    crossed: HashSet<TrackId>,
    allowed_classes: HashSet<ClassId>,
    min_dwell: f64,
    vehicle_count: u64,
    origin: Option<f64>,
    stats: DetectorStats,
}

impl CrossingDetector {
    pub fn new(allowed_classes: impl IntoIterator<Item = ClassId>, min_dwell: f64) -> Self {
        Self {
            store: TrackStateStore::new(),
            crossed: HashSet::new(),
            allowed_classes: allowed_classes.into_iter().collect(),
            min_dwell,
            vehicle_count: 0,
            origin: None,
            stats: DetectorStats::default(),
        }
    }

    /// Fix the run origin used for event timestamps. Only the first call
    /// has an effect.
    pub fn mark_origin(&mut self, timestamp: f64) {
        self.origin.get_or_insert(timestamp);
    }

    pub fn origin(&self) -> Option<f64> {
        self.origin
    }

    /// Number of crossings emitted so far
    pub fn vehicle_count(&self) -> u64 {
        self.vehicle_count
    }

    pub fn stats(&self) -> DetectorStats {
        self.stats
    }

    pub fn store(&self) -> &TrackStateStore {
        &self.store
    }

    pub fn has_crossed(&self, track_id: TrackId) -> bool {
        self.crossed.contains(&track_id)
    }

    /// Feed one observation; returns the crossing it completes, if any
    pub fn process(&mut self, obs: &Observation, line_x: f64) -> Option<CrossingEvent> {
        if !self.allowed_classes.contains(&obs.class_id) {
            self.stats.filtered += 1;
            return None;
        }
        self.stats.observations += 1;
        let origin = *self.origin.get_or_insert(obs.timestamp);

        let previous = self.store.last_position(obs.track_id);
        self.store.observe(obs.track_id, obs.position, obs.timestamp);

        let previous = previous?;
        let direction = classify_crossing(previous.x, obs.position.x, line_x)?;

        if self.crossed.contains(&obs.track_id) {
            self.stats.repeated += 1;
            return None;
        }

        let (first_position, first_timestamp) = self.store.first_seen(obs.track_id)?;
        let distance_pixels = (obs.position.x - first_position.x).abs();
        let time_elapsed = obs.timestamp - first_timestamp;

        if time_elapsed <= self.min_dwell {
            self.stats.suppressed += 1;
            tracing::debug!(
                "Track {} crossed {} after {:.2}s, below dwell threshold",
                obs.track_id,
                direction,
                time_elapsed
            );
            return None;
        }

        self.vehicle_count += 1;
        self.crossed.insert(obs.track_id);

        Some(CrossingEvent {
            vehicle_number: self.vehicle_count,
            track_id: obs.track_id,
            direction,
            distance_pixels,
            time_elapsed,
            timestamp: obs.timestamp - origin,
        })
    }
}
