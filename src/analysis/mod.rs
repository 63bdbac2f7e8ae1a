//! Analysis module: the consumer stage
//!
//! This module provides:
//! - The streaming analyzer that persists records and refreshes the report
//! - Speed distribution statistics (percentiles, bins, clustering)
//! - Text report rendering

pub mod analyzer;
pub mod report;
pub mod stats;

pub use analyzer::{report_from_log, AnalyzerSummary, StreamingAnalyzer};
pub use report::{render, write_report};
pub use stats::{
    percentile_value, BinKind, DirectionalComparison, ReportSettings, SpeedBin, SpeedStatistics,
    TrafficPattern,
};
