//! Test data builders for creating scripted frame sequences

use super::{CAR, FRAME_HEIGHT, FRAME_WIDTH};
use std::collections::BTreeMap;
use traffic_speed::types::{BBox, Detection, FrameResult, TrackId};

/// Box of fixed size centered at `x`
pub fn detection_at(track_id: TrackId, class_id: u32, x: f64) -> Detection {
    Detection {
        track_id,
        bbox: BBox::ltrb(x - 20.0, 300.0, x + 20.0, 340.0),
        class_id,
        confidence: 0.9,
    }
}

/// Builder for a sequence of frames from per-track sightings
///
/// Sightings sharing a timestamp end up in the same frame, in the order the
/// tracks were added.
pub struct FrameScriptBuilder {
    width: u32,
    frames: BTreeMap<u64, (f64, Vec<Detection>)>,
}

impl FrameScriptBuilder {
    pub fn new() -> Self {
        Self {
            width: FRAME_WIDTH,
            frames: BTreeMap::new(),
        }
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// A car with the given `(x, t)` sightings
    pub fn car(self, track_id: TrackId, sightings: &[(f64, f64)]) -> Self {
        self.track(track_id, CAR, sightings)
    }

    pub fn track(mut self, track_id: TrackId, class_id: u32, sightings: &[(f64, f64)]) -> Self {
        for &(x, t) in sightings {
            self.frames
                .entry(Self::key(t))
                .or_insert_with(|| (t, Vec::new()))
                .1
                .push(detection_at(track_id, class_id, x));
        }
        self
    }

    /// A frame with no identified tracks
    pub fn empty_frame(mut self, t: f64) -> Self {
        self.frames.entry(Self::key(t)).or_insert_with(|| (t, Vec::new()));
        self
    }

    /// Number of sightings added so far
    pub fn observation_count(&self) -> usize {
        self.frames.values().map(|(_, d)| d.len()).sum()
    }

    pub fn build(self) -> Vec<FrameResult> {
        let width = self.width;
        self.frames
            .into_values()
            .map(|(t, detections)| {
                if detections.is_empty() {
                    FrameResult::empty((width, FRAME_HEIGHT), t)
                } else {
                    FrameResult::new((width, FRAME_HEIGHT), t, detections)
                }
            })
            .collect()
    }

    fn key(t: f64) -> u64 {
        (t * 1_000_000.0).round() as u64
    }
}

impl Default for FrameScriptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_grouped_and_ordered() {
        let frames = FrameScriptBuilder::new()
            .car(1, &[(300.0, 1.0), (340.0, 2.0)])
            .car(2, &[(350.0, 1.0)])
            .empty_frame(0.5)
            .build();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].timestamp, 0.5);
        assert!(frames[0].detections.is_none());
        assert_eq!(frames[1].len(), 2);
        assert_eq!(frames[2].len(), 1);
    }
}
