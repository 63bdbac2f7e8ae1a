//! Crossing detection and speed estimation
//!
//! Everything in this module runs on the producer thread and owns its state
//! outright; nothing here is shared with the analysis stage.
//!
//! - [`TrackStateStore`] - First-seen anchor and last position per track
//! - [`CrossingDetector`] - Line-crossing test, dwell filter, numbering
//! - [`SpeedEstimator`] - Pixel speed with right-to-left perspective correction

pub mod crossing;
pub mod speed;
pub mod track_store;

pub use crossing::{classify_crossing, CrossingDetector, DetectorStats};
pub use speed::{SpeedEstimate, SpeedEstimator};
pub use track_store::{TrackEntry, TrackStateStore};
