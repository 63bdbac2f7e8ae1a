//! Core data types for traffic-speed
//!
//! This module contains the data structures that flow through the pipeline,
//! from the detector/tracker boundary to the persisted vehicle records.
//!
//! # Main Types
//!
//! - [`FrameResult`] / [`Detection`] - One frame of tracker output
//! - [`Observation`] - A single track position at a point in time
//! - [`Direction`] - Which way a vehicle crossed the counting line
//! - [`CrossingEvent`] - A finalized line crossing, before speed estimation
//! - [`VehicleRecord`] - A crossing enriched with raw and corrected speed
//!
//! # Coordinates
//!
//! Positions are in pixel space of the (possibly cropped) frame, with `x`
//! growing to the right. Timestamps are monotonic seconds as reported by the
//! source; event timestamps are seconds since the run origin.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identifier assigned by the tracker to one physical object
pub type TrackId = u32;

/// Detector class label (COCO class index)
pub type ClassId = u32;

/// A point in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Left-top-right-bottom bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl BBox {
    #[inline]
    pub fn ltrb(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    #[inline]
    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }
}

/// A single tracked detection within a frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub track_id: TrackId,
    pub bbox: BBox,
    #[serde(rename = "class")]
    pub class_id: ClassId,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

/// Tracker output for one processed frame
///
/// `detections` is `None` when the tracker produced no identified boxes for
/// this frame, which is distinct from the stream having ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    /// Frame dimensions (width, height) in pixels
    pub dims: (u32, u32),
    /// Monotonic capture time in seconds
    pub timestamp: f64,
    #[serde(default)]
    pub detections: Option<Vec<Detection>>,
}

impl FrameResult {
    pub fn new(dims: (u32, u32), timestamp: f64, detections: Vec<Detection>) -> Self {
        Self {
            dims,
            timestamp,
            detections: Some(detections),
        }
    }

    pub fn empty(dims: (u32, u32), timestamp: f64) -> Self {
        Self {
            dims,
            timestamp,
            detections: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.detections.as_ref().map_or(0, Vec::len)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter().flatten()
    }
}

/// One position sample of one track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub track_id: TrackId,
    pub position: Point,
    pub class_id: ClassId,
    pub timestamp: f64,
}

impl Observation {
    pub fn new(track_id: TrackId, position: Point, class_id: ClassId, timestamp: f64) -> Self {
        Self {
            track_id,
            position,
            class_id,
            timestamp,
        }
    }
}

/// Direction of travel across the counting line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Left to right (closer lane)
    #[serde(rename = "LTR")]
    LeftToRight,
    /// Right to left (farther lane)
    #[serde(rename = "RTL")]
    RightToLeft,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::LeftToRight => "LTR",
            Direction::RightToLeft => "RTL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "LTR" => Ok(Direction::LeftToRight),
            "RTL" => Ok(Direction::RightToLeft),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// A finalized line crossing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossingEvent {
    /// 1-based sequence number in finalization order
    pub vehicle_number: u64,
    pub track_id: TrackId,
    pub direction: Direction,
    /// Horizontal displacement since first sighting
    pub distance_pixels: f64,
    /// Seconds since first sighting
    pub time_elapsed: f64,
    /// Seconds since the run origin
    pub timestamp: f64,
}

/// A crossing enriched with speeds; the unit that is persisted and reported
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleRecord {
    pub vehicle_number: u64,
    pub track_id: TrackId,
    pub direction: Direction,
    pub distance_pixels: f64,
    pub time_elapsed: f64,
    /// Pixels per second
    pub speed_raw: f64,
    /// Pixels per second after perspective correction
    pub speed_normalized: f64,
    pub timestamp: f64,
}

impl VehicleRecord {
    pub fn from_event(event: &CrossingEvent, speed_raw: f64, speed_normalized: f64) -> Self {
        Self {
            vehicle_number: event.vehicle_number,
            track_id: event.track_id,
            direction: event.direction,
            distance_pixels: event.distance_pixels,
            time_elapsed: event.time_elapsed,
            speed_raw,
            speed_normalized,
            timestamp: event.timestamp,
        }
    }
}
