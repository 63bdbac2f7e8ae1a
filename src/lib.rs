//! # traffic-speed: counting-line vehicle speed analysis
//!
//! Consumes per-frame tracked detections from a fixed roadside camera, counts
//! vehicles as they cross a vertical counting line, estimates their speed in
//! pixels per second and keeps a durable log plus a periodically refreshed
//! statistical report.
//!
//! ## Architecture
//!
//! - **Backend**: The detection loop on its own thread. It pulls frames from an
//!   [`ObservationSource`](backend::ObservationSource), applies the region of
//!   interest, and feeds observations to the crossing detector and speed
//!   estimator
//! - **Pipeline**: A single ordered crossbeam channel with an explicit
//!   end-of-stream message, and the coordinator that starts, monitors and
//!   stops both stages
//! - **Analysis**: The consumer thread that appends every record to the CSV log
//!   and rewrites the text report
//! - **Session**: Log file naming, writing and reading
//!
//! ## Configuration
//!
//! A single TOML file (default `config.toml`); every key has a default. See
//! [`config::AppConfig`].
//!
//! ## Example
//!
//! ```ignore
//! use traffic_speed::{
//!     backend::ReplaySource,
//!     config::AppConfig,
//!     pipeline::PipelineCoordinator,
//!     session::SessionPaths,
//! };
//!
//! let config = AppConfig::load_or_default("config.toml")?;
//! let paths = SessionPaths::timestamped(&config.output, chrono::Local::now());
//! let coordinator = PipelineCoordinator::new(config.clone());
//! let outcome = coordinator.run(Box::new(ReplaySource::new(&config.camera.url)), paths)?;
//! std::process::exit(outcome.exit_code());
//! ```

pub mod analysis;
pub mod backend;
pub mod config;
pub mod detection;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use analysis::{SpeedStatistics, StreamingAnalyzer};
pub use backend::{ObservationSource, ProducerWorker};
pub use config::AppConfig;
pub use error::{Result, TrafficError};
pub use pipeline::{PipelineCoordinator, RunOutcome, StopReason};
pub use types::{Direction, VehicleRecord};
