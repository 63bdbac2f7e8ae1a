//! Configuration sections
//!
//! Each struct maps to one table of the TOML configuration file. Every field
//! has a default so a partial file (or no file at all) yields a usable setup.
//!
//! # Sections
//!
//! - [`CameraConfig`] - Where observations come from
//! - [`DetectionConfig`] - Detector reference, confidence and class allow-list
//! - [`RoiConfig`] - Full frame or left-half crop
//! - [`TrackingConfig`] - Minimum dwell time before a crossing counts
//! - [`PerspectiveConfig`] - RTL foreshortening correction
//! - [`AnalysisConfig`] - Report cadence, percentiles and binning
//! - [`ThresholdsConfig`] - Interpretation thresholds
//! - [`RuntimeConfig`] - Run duration, timeouts and channel sizing
//! - [`OutputConfig`] - Log and report directories

use crate::types::ClassId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Observation source location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Source URI. For the replay source this is a path to a JSON Lines file.
    pub url: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            url: "detections.jsonl".to_string(),
        }
    }
}

/// Detector/tracker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Detector model reference (informational; the detector is external)
    pub model_file: String,

    /// Detections below this confidence are discarded
    pub confidence_threshold: f32,

    /// Class labels that count as vehicles (COCO: car, motorcycle, bus, truck)
    pub vehicle_classes: Vec<ClassId>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            model_file: "yolov8n.pt".to_string(),
            confidence_threshold: 0.3,
            vehicle_classes: vec![2, 3, 5, 7],
        }
    }
}

/// Region of interest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    /// Only use the left half of each frame
    pub use_left_half: bool,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            use_left_half: true,
        }
    }
}

impl RoiConfig {
    /// Effective frame width after cropping
    pub fn crop_width(&self, frame_width: u32) -> u32 {
        if self.use_left_half {
            frame_width / 2
        } else {
            frame_width
        }
    }

    /// Counting line position for a frame of the given width
    pub fn line_x(&self, frame_width: u32) -> f64 {
        (self.crop_width(frame_width) / 2) as f64
    }
}

/// Track filtering
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Crossings within this many seconds of first sighting are treated as noise
    pub min_time_before_count: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            min_time_before_count: 0.5,
        }
    }
}

/// Perspective correction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerspectiveConfig {
    /// Multiplier applied to right-to-left speeds (farther lane)
    pub rtl_correction_factor: f64,
}

impl Default for PerspectiveConfig {
    fn default() -> Self {
        Self {
            rtl_correction_factor: 1.15,
        }
    }
}

/// Report generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Regenerate the report every this many vehicles
    pub report_update_interval: usize,

    /// Lower percentile bounding the normal range
    pub percentile_low: f64,

    /// Upper percentile bounding the normal range
    pub percentile_high: f64,

    /// Number of equal-width bins inside the normal range
    pub normal_range_bins: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            report_update_interval: 10,
            percentile_low: 5.0,
            percentile_high: 95.0,
            normal_range_bins: 4,
        }
    }
}

/// Interpretation thresholds, in percent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// Share of normal traffic in one half of the range that counts as clustering
    pub clustering_threshold: f64,

    /// Relative difference between direction means worth reporting
    pub directional_difference: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            clustering_threshold: 60.0,
            directional_difference: 15.0,
        }
    }
}

/// Run lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Run duration when none is given on the command line
    pub default_duration_hours: f64,

    /// How long to wait for the analyzer to become ready
    pub analyzer_startup_timeout_secs: f64,

    /// Grace period for the detector to stop cooperatively
    pub detector_shutdown_timeout_secs: f64,

    /// How long to wait for the analyzer to drain and write the final report
    pub analyzer_shutdown_timeout_secs: f64,

    /// Event channel capacity; 0 means unbounded
    pub channel_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_duration_hours: 1.0,
            analyzer_startup_timeout_secs: 10.0,
            detector_shutdown_timeout_secs: 10.0,
            analyzer_shutdown_timeout_secs: 30.0,
            channel_capacity: 1024,
        }
    }
}

impl RuntimeConfig {
    pub fn analyzer_startup_timeout(&self) -> Duration {
        saturating_seconds(self.analyzer_startup_timeout_secs)
    }

    pub fn detector_shutdown_timeout(&self) -> Duration {
        saturating_seconds(self.detector_shutdown_timeout_secs)
    }

    pub fn analyzer_shutdown_timeout(&self) -> Duration {
        saturating_seconds(self.analyzer_shutdown_timeout_secs)
    }

    pub fn default_duration(&self) -> Duration {
        saturating_seconds(self.default_duration_hours * 3600.0)
    }
}

/// Seconds as a [`Duration`]; `None` if negative, not finite, or beyond
/// what a `Duration` can hold
pub fn checked_seconds(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

/// Seconds as a [`Duration`], clamped to `ZERO..=MAX`. NaN maps to zero.
pub fn saturating_seconds(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    checked_seconds(secs).unwrap_or(Duration::MAX)
}

/// Output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for the CSV vehicle log
    pub csv_dir: PathBuf,

    /// Directory for the text report
    pub reports_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_dir: PathBuf::from("data"),
            reports_dir: PathBuf::from("reports"),
        }
    }
}
