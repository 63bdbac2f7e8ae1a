//! Session persistence
//!
//! Each run produces a durable CSV vehicle log and a text report. This module
//! owns the log: naming, writing rows as they arrive, and reading a finished
//! log back for offline reporting.
//!
//! # Features
//!
//! - Timestamped file names per run ([`SessionPaths`])
//! - Flushed-per-row CSV writer ([`VehicleLogWriter`])
//! - Log reader for regenerating reports ([`read_log`])

pub mod player;
pub mod recorder;
pub mod types;

pub use player::{parse_row, read_log};
pub use recorder::VehicleLogWriter;
pub use types::{log_header, SessionPaths, LOG_COLUMNS, STAMP_FORMAT};
