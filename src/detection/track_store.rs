//! Per-track position memory
//!
//! Holds, for every track id seen so far, where and when it was first seen
//! and where it was last seen. Owned by the producer stage only.

use crate::types::{Point, TrackId};
use std::collections::HashMap;

/// First-seen anchor and latest position of one track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackEntry {
    pub first_position: Point,
    pub first_timestamp: f64,
    pub last_position: Point,
}

/// Track state keyed by track id
#[derive(Debug, Default)]
pub struct TrackStateStore {
    entries: HashMap<TrackId, TrackEntry>,
}

impl TrackStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sighting. The first sighting of an id becomes its anchor;
    /// every sighting replaces the last-known position.
    pub fn observe(&mut self, track_id: TrackId, position: Point, timestamp: f64) {
        self.entries
            .entry(track_id)
            .and_modify(|entry| entry.last_position = position)
            .or_insert(TrackEntry {
                first_position: position,
                first_timestamp: timestamp,
                last_position: position,
            });
    }

    #[inline]
    pub fn last_position(&self, track_id: TrackId) -> Option<Point> {
        self.entries.get(&track_id).map(|e| e.last_position)
    }

    #[inline]
    pub fn first_seen(&self, track_id: TrackId) -> Option<(Point, f64)> {
        self.entries
            .get(&track_id)
            .map(|e| (e.first_position, e.first_timestamp))
    }

    #[inline]
    pub fn get(&self, track_id: TrackId) -> Option<&TrackEntry> {
        self.entries.get(&track_id)
    }

    #[inline]
    pub fn contains(&self, track_id: TrackId) -> bool {
        self.entries.contains_key(&track_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
