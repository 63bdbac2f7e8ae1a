//! Durable vehicle log writer
//!
//! Appends one CSV row per vehicle record and flushes after every row, so the
//! log on disk is always complete up to the last record handed over, even if
//! the process is killed.

use super::types::log_header;
use crate::error::{Result, TrafficError};
use crate::types::VehicleRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// CSV writer for [`VehicleRecord`]s
#[derive(Debug)]
pub struct VehicleLogWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    rows_written: u64,
}

impl VehicleLogWriter {
    /// Create (truncate) the log and write the header row
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| {
            TrafficError::Persistence(format!("cannot create {}: {}", path.display(), e))
        })?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", log_header())
            .and_then(|_| writer.flush())
            .map_err(|e| {
                TrafficError::Persistence(format!("cannot write header to {}: {}", path.display(), e))
            })?;

        tracing::info!("Vehicle log: {}", path.display());
        Ok(Self {
            path,
            writer,
            rows_written: 0,
        })
    }

    /// Append one record and flush it to disk. Floats are written in their
    /// shortest round-tripping form so [`read_log`](super::read_log) recovers
    /// exactly what was recorded.
    pub fn append(&mut self, record: &VehicleRecord) -> Result<()> {
        writeln!(
            self.writer,
            "{},{},{},{},{},{},{},{}",
            record.vehicle_number,
            record.track_id,
            record.direction,
            record.distance_pixels,
            record.time_elapsed,
            record.speed_raw,
            record.speed_normalized,
            record.timestamp
        )
        .and_then(|_| self.writer.flush())
        .map_err(|e| {
            TrafficError::Persistence(format!(
                "cannot append vehicle #{} to {}: {}",
                record.vehicle_number,
                self.path.display(),
                e
            ))
        })?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}
