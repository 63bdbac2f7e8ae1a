//! Streaming analyzer: the consumer stage
//!
//! Receives vehicle records until end of stream, appends each to the durable
//! CSV log as it arrives, and regenerates the text report every
//! `report_update_interval` records plus once more at the end.
//!
//! Failures to persist a row or write a report are logged and counted; they
//! never stop the analyzer from draining the channel.

use super::report::write_report;
use super::stats::{ReportSettings, SpeedStatistics};
use crate::config::AppConfig;
use crate::error::Result;
use crate::pipeline::channel::EventReceiver;
use crate::session::{SessionPaths, VehicleLogWriter};
use crate::types::VehicleRecord;
use std::path::PathBuf;

/// Outcome of one analyzer lifetime
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerSummary {
    /// Records received
    pub vehicles: usize,
    pub log_path: PathBuf,
    pub report_path: PathBuf,
    pub reports_written: u64,
    /// Rows that could not be appended to the log
    pub persist_failures: u64,
    /// Report writes that failed
    pub report_failures: u64,
}

/// Consumer of the event stream
#[derive(Debug)]
pub struct StreamingAnalyzer {
    paths: SessionPaths,
    log: VehicleLogWriter,
    settings: ReportSettings,
    report_interval: usize,
    records: Vec<VehicleRecord>,
    reports_written: u64,
    persist_failures: u64,
    report_failures: u64,
}

impl StreamingAnalyzer {
    /// Create output directories and open the log.
    ///
    /// Fails if the log cannot be created; nothing has been received yet at
    /// that point, so the caller can abort the run cleanly.
    pub fn create(paths: SessionPaths, config: &AppConfig) -> Result<Self> {
        paths.ensure_dirs()?;
        let log = VehicleLogWriter::create(&paths.log_path)?;
        let report_interval = config.analysis.report_update_interval.max(1);
        let settings = ReportSettings::from_config(config);

        tracing::info!(
            "Analyzer initialized: report {}, RTL factor {}x, report every {} vehicles",
            paths.report_path.display(),
            settings.rtl_correction_factor,
            report_interval
        );

        Ok(Self {
            paths,
            log,
            settings,
            report_interval,
            records: Vec::new(),
            reports_written: 0,
            persist_failures: 0,
            report_failures: 0,
        })
    }

    /// Handle one record: persist, remember, and refresh the report on
    /// every interval boundary
    pub fn process(&mut self, record: VehicleRecord) {
        if let Err(e) = self.log.append(&record) {
            self.persist_failures += 1;
            tracing::warn!("{}", e);
        }

        tracing::info!(
            "Vehicle #{:3} | {} | {:6.1} px/s | ({:.1} raw)",
            record.vehicle_number,
            record.direction,
            record.speed_normalized,
            record.speed_raw
        );
        self.records.push(record);

        if self.records.len() % self.report_interval == 0 && self.refresh_report() {
            tracing::info!("Report updated: {} vehicles", self.records.len());
        }
    }

    /// Rewrite the report from everything received so far. Returns whether a
    /// report was written; too few records is not an error.
    pub fn refresh_report(&mut self) -> bool {
        let Some(stats) = SpeedStatistics::compute(&self.records, &self.settings) else {
            tracing::debug!(
                "Skipping report: {} vehicles is below the minimum",
                self.records.len()
            );
            return false;
        };
        match write_report(&self.paths.report_path, &stats) {
            Ok(()) => {
                self.reports_written += 1;
                true
            }
            Err(e) => {
                self.report_failures += 1;
                tracing::warn!("{}", e);
                false
            }
        }
    }

    /// Drain `receiver` until end of stream, then finish
    pub fn run(mut self, receiver: EventReceiver) -> AnalyzerSummary {
        tracing::info!("Analysis started");
        for record in receiver.records() {
            self.process(record);
        }
        self.finish()
    }

    /// Write the final report and summarize
    pub fn finish(mut self) -> AnalyzerSummary {
        if !self.records.is_empty() {
            self.refresh_report();
        }

        let summary = self.summary();
        tracing::info!(
            "Analysis complete: {} vehicles, log {}, report {}",
            summary.vehicles,
            summary.log_path.display(),
            summary.report_path.display()
        );
        if summary.persist_failures > 0 || summary.report_failures > 0 {
            tracing::warn!(
                "{} log rows and {} reports could not be written",
                summary.persist_failures,
                summary.report_failures
            );
        }
        summary
    }

    pub fn records(&self) -> &[VehicleRecord] {
        &self.records
    }

    pub fn paths(&self) -> &SessionPaths {
        &self.paths
    }

    fn summary(&self) -> AnalyzerSummary {
        AnalyzerSummary {
            vehicles: self.records.len(),
            log_path: self.paths.log_path.clone(),
            report_path: self.paths.report_path.clone(),
            reports_written: self.reports_written,
            persist_failures: self.persist_failures,
            report_failures: self.report_failures,
        }
    }
}

/// Regenerate the report for a finished log
pub fn report_from_log(
    paths: &SessionPaths,
    config: &AppConfig,
) -> Result<Option<SpeedStatistics>> {
    let records = crate::session::read_log(&paths.log_path)?;
    let settings = ReportSettings::from_config(config);
    let Some(stats) = SpeedStatistics::compute(&records, &settings) else {
        tracing::warn!(
            "{} holds {} vehicles; at least {} are needed for a report",
            paths.log_path.display(),
            records.len(),
            crate::config::MIN_REPORT_VEHICLES
        );
        return Ok(None);
    };
    write_report(&paths.report_path, &stats)?;
    tracing::info!("Report written to {}", paths.report_path.display());
    Ok(Some(stats))
}
