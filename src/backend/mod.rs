//! Backend module: the detection (producer) stage
//!
//! This module owns everything that runs on the producer thread. It talks to
//! the outside world through the [`ObservationSource`] trait and to the
//! analysis stage through the event channel.
//!
//! # Architecture
//!
//! ```text
//! ObservationSource ──► ProducerWorker ──► CrossingDetector ──► SpeedEstimator ──► EventSender
//! ```
//!
//! # Components
//!
//! - [`ObservationSource`] - Trait for anything that yields tracked frames
//! - [`ReplaySource`] - Reads recorded tracker output (JSON Lines)
//! - [`ScriptedSource`] - Serves frames from memory for tests
//! - [`ProducerWorker`] - The detection loop itself
//!
//! # Example
//!
//! ```ignore
//! use traffic_speed::backend::{ProducerWorker, ReplaySource};
//! use traffic_speed::pipeline::event_channel;
//!
//! let config = AppConfig::default();
//! let (tx, rx) = event_channel(config.runtime.channel_capacity);
//! let running = Arc::new(AtomicBool::new(true));
//! let worker = ProducerWorker::new(&config, Box::new(ReplaySource::new("feed.jsonl")), tx, running);
//! std::thread::spawn(move || worker.run());
//! for record in rx.records() {
//!     println!("{:?}", record);
//! }
//! ```

pub mod replay;
pub mod scripted;
pub mod source;
pub mod worker;

pub use replay::ReplaySource;
pub use scripted::ScriptedSource;
pub use source::ObservationSource;
pub use worker::{ProducerExit, ProducerSummary, ProducerWorker, STATUS_INTERVAL_FRAMES};

use crate::config::CameraConfig;

/// Build the source named by the camera configuration
pub fn source_from_config(camera: &CameraConfig, paced: bool) -> Box<dyn ObservationSource> {
    Box::new(ReplaySource::new(&camera.url).paced(paced))
}
