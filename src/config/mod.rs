//! Configuration module for traffic-speed
//!
//! The configuration is a single TOML file whose tables map onto the
//! sections in [`settings`]. All fields have defaults, so a missing file
//! yields a working setup and a partial file only overrides what it names.
//!
//! # Example
//!
//! ```toml
//! [camera]
//! url = "recordings/north_gate.jsonl"
//!
//! [detection]
//! confidence_threshold = 0.4
//! vehicle_classes = [2, 7]
//!
//! [analysis]
//! report_update_interval = 25
//! percentile_low = 10
//! percentile_high = 90
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{Result, TrafficError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Minimum number of vehicles before a report is produced
pub const MIN_REPORT_VEHICLES: usize = 4;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub detection: DetectionConfig,

    #[serde(default)]
    pub roi: RoiConfig,

    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub perspective: PerspectiveConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub thresholds: ThresholdsConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .map_err(|e| TrafficError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TrafficError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration, falling back to defaults only when the file is absent
    ///
    /// A file that exists but fails to parse or validate is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!("{} not found, using default configuration", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| TrafficError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        let a = &self.analysis;
        if !(0.0..=100.0).contains(&a.percentile_low) || !(0.0..=100.0).contains(&a.percentile_high)
        {
            return Err(TrafficError::Config(
                "percentiles must lie within 0..=100".to_string(),
            ));
        }
        if a.percentile_low >= a.percentile_high {
            return Err(TrafficError::Config(format!(
                "percentile_low ({}) must be below percentile_high ({})",
                a.percentile_low, a.percentile_high
            )));
        }
        if a.normal_range_bins == 0 {
            return Err(TrafficError::Config(
                "normal_range_bins must be at least 1".to_string(),
            ));
        }
        if a.report_update_interval == 0 {
            return Err(TrafficError::Config(
                "report_update_interval must be at least 1".to_string(),
            ));
        }
        if self.perspective.rtl_correction_factor <= 0.0 {
            return Err(TrafficError::Config(
                "rtl_correction_factor must be positive".to_string(),
            ));
        }
        if self.tracking.min_time_before_count < 0.0 {
            return Err(TrafficError::Config(
                "min_time_before_count must not be negative".to_string(),
            ));
        }
        if self.thresholds.clustering_threshold < 0.0 || self.thresholds.directional_difference < 0.0
        {
            return Err(TrafficError::Config(
                "thresholds must not be negative".to_string(),
            ));
        }
        let r = &self.runtime;
        let timeouts = [
            ("default_duration_hours", r.default_duration_hours * 3600.0),
            ("analyzer_startup_timeout_secs", r.analyzer_startup_timeout_secs),
            ("detector_shutdown_timeout_secs", r.detector_shutdown_timeout_secs),
            ("analyzer_shutdown_timeout_secs", r.analyzer_shutdown_timeout_secs),
        ];
        for (name, secs) in timeouts {
            if checked_seconds(secs).is_none() {
                return Err(TrafficError::Config(format!(
                    "{} must be a non-negative duration within range",
                    name
                )));
            }
        }
        Ok(())
    }
}
