//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use std::path::Path;
use std::time::Duration;
use traffic_speed::config::AppConfig;

/// Frame width used by scripted scenarios. With the default left-half ROI
/// the crop is 640 wide and the counting line sits at x = 320.
pub const FRAME_WIDTH: u32 = 1280;
pub const FRAME_HEIGHT: u32 = 720;
pub const LINE_X: f64 = 320.0;

/// COCO class ids
pub const CAR: u32 = 2;
pub const TRUCK: u32 = 7;
pub const PERSON: u32 = 0;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_millis(100)
}

/// Default configuration with short shutdown timeouts and output under `dir`
pub fn test_config(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.runtime.analyzer_startup_timeout_secs = 2.0;
    config.runtime.detector_shutdown_timeout_secs = 0.3;
    config.runtime.analyzer_shutdown_timeout_secs = 3.0;
    config.output.csv_dir = dir.join("data");
    config.output.reports_dir = dir.join("reports");
    config
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}
