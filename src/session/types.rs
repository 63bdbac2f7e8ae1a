//! Types shared by the vehicle log writer and reader

use crate::config::OutputConfig;
use crate::error::{Result, ResultExt};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Column names of the vehicle log, in order
pub const LOG_COLUMNS: [&str; 8] = [
    "vehicle_number",
    "track_id",
    "direction",
    "distance_pixels",
    "time_elapsed",
    "speed_raw",
    "speed_normalized",
    "timestamp",
];

/// Timestamp format used in session file names
pub const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Header row of the vehicle log
pub fn log_header() -> String {
    LOG_COLUMNS.join(",")
}

/// Where one run writes its log and report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub log_path: PathBuf,
    pub report_path: PathBuf,
}

impl SessionPaths {
    pub fn new(log_path: impl Into<PathBuf>, report_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            report_path: report_path.into(),
        }
    }

    /// `traffic_data_<stamp>.csv` and `traffic_analysis_<stamp>.txt` in the
    /// configured directories
    pub fn timestamped(output: &OutputConfig, now: DateTime<Local>) -> Self {
        let stamp = now.format(STAMP_FORMAT).to_string();
        Self {
            log_path: output.csv_dir.join(format!("traffic_data_{}.csv", stamp)),
            report_path: output.reports_dir.join(format!("traffic_analysis_{}.txt", stamp)),
        }
    }

    /// Report path derived from an existing log, next to it
    pub fn for_existing_log(log_path: impl AsRef<Path>) -> Self {
        let log_path = log_path.as_ref().to_path_buf();
        let stem = log_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "traffic_data".to_string());
        let report_name = match stem.strip_prefix("traffic_data_") {
            Some(stamp) => format!("traffic_analysis_{}.txt", stamp),
            None => format!("{}_analysis.txt", stem),
        };
        let report_path = log_path.with_file_name(report_name);
        Self {
            log_path,
            report_path,
        }
    }

    /// Create the parent directories of both files
    pub fn ensure_dirs(&self) -> Result<()> {
        for path in [&self.log_path, &self.report_path] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        Ok(())
    }
}
