//! Vehicle log reader
//!
//! Loads a log written by [`VehicleLogWriter`](super::VehicleLogWriter) back
//! into records, so a report can be regenerated offline.

use super::types::LOG_COLUMNS;
use crate::error::{Result, TrafficError};
use crate::types::{Direction, VehicleRecord};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

/// Read every record in a vehicle log
pub fn read_log(path: impl AsRef<Path>) -> Result<Vec<VehicleRecord>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| TrafficError::Persistence(format!("cannot open {}: {}", path.display(), e)))?;

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line_number = index + 1;
        let line = line.map_err(|e| {
            TrafficError::Persistence(format!("{} line {}: {}", path.display(), line_number, e))
        })?;
        let line = line.trim();
        if line.is_empty() || (index == 0 && line.starts_with(LOG_COLUMNS[0])) {
            continue;
        }
        let record = parse_row(line).map_err(|msg| {
            TrafficError::Persistence(format!("{} line {}: {}", path.display(), line_number, msg))
        })?;
        records.push(record);
    }

    tracing::debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Parse one data row of the vehicle log
pub fn parse_row(line: &str) -> std::result::Result<VehicleRecord, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != LOG_COLUMNS.len() {
        return Err(format!(
            "expected {} fields, found {}",
            LOG_COLUMNS.len(),
            fields.len()
        ));
    }

    fn field<T: FromStr>(fields: &[&str], index: usize) -> std::result::Result<T, String> {
        fields[index]
            .parse()
            .map_err(|_| format!("invalid {} '{}'", LOG_COLUMNS[index], fields[index]))
    }

    Ok(VehicleRecord {
        vehicle_number: field(&fields, 0)?,
        track_id: field(&fields, 1)?,
        direction: Direction::from_str(fields[2])?,
        distance_pixels: field(&fields, 3)?,
        time_elapsed: field(&fields, 4)?,
        speed_raw: field(&fields, 5)?,
        speed_normalized: field(&fields, 6)?,
        timestamp: field(&fields, 7)?,
    })
}
