//! Speed estimation with perspective correction

use crate::error::SpeedError;
use crate::types::{CrossingEvent, Direction, VehicleRecord};

/// Raw and perspective-corrected speed, in pixels per second
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedEstimate {
    pub raw: f64,
    pub normalized: f64,
}

/// Turns crossing events into speeds
///
/// Right-to-left traffic uses the farther lane and appears slower under
/// foreshortening, so its speed is scaled by `rtl_correction_factor`.
#[derive(Debug, Clone, Copy)]
pub struct SpeedEstimator {
    rtl_correction_factor: f64,
}

impl SpeedEstimator {
    pub fn new(rtl_correction_factor: f64) -> Self {
        Self {
            rtl_correction_factor,
        }
    }

    pub fn rtl_correction_factor(&self) -> f64 {
        self.rtl_correction_factor
    }

    pub fn estimate(&self, event: &CrossingEvent) -> Result<SpeedEstimate, SpeedError> {
        debug_assert!(
            event.time_elapsed != 0.0,
            "crossing of track {} finalized with zero elapsed time",
            event.track_id
        );
        if event.time_elapsed == 0.0 {
            return Err(SpeedError::DivideByZero {
                distance_pixels: event.distance_pixels,
            });
        }

        let raw = event.distance_pixels / event.time_elapsed;
        let normalized = match event.direction {
            Direction::RightToLeft => raw * self.rtl_correction_factor,
            Direction::LeftToRight => raw,
        };

        Ok(SpeedEstimate { raw, normalized })
    }

    /// Estimate and build the persisted record in one step
    pub fn enrich(&self, event: &CrossingEvent) -> Result<VehicleRecord, SpeedError> {
        let speed = self.estimate(event)?;
        Ok(VehicleRecord::from_event(event, speed.raw, speed.normalized))
    }
}
