//! Pipeline coordinator
//!
//! Owns the lifecycle of one run: start the analyzer and wait until it is
//! ready, start the detector, watch for the run duration, cancellation or the
//! detector ending on its own, then shut both stages down within bounded
//! timeouts.
//!
//! # Shutdown sequence
//!
//! 1. Clear the detector's `running` flag and wait up to
//!    `detector_shutdown_timeout` for it to finish.
//! 2. If it did not, abandon the thread and send end-of-stream on its behalf
//!    through a fallback sender. The shared closed latch on the channel
//!    guarantees the analyzer sees exactly one sentinel either way.
//! 3. Wait up to `analyzer_shutdown_timeout` for the analyzer to drain and
//!    write its final report, then abandon it with a warning.
//!
//! Threads cannot be killed; an abandoned thread is detached and left to end
//! with the process.

use super::channel::event_channel;
use crate::analysis::{AnalyzerSummary, StreamingAnalyzer};
use crate::backend::{ObservationSource, ProducerSummary, ProducerWorker};
use crate::config::AppConfig;
use crate::error::{Result, TrafficError};
use crate::session::SessionPaths;
use crossbeam_channel::{bounded, RecvTimeoutError};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How often the monitor re-checks cancellation while waiting
pub const MONITOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Why the run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured run duration elapsed
    DurationElapsed,
    /// The cancel flag was raised (Ctrl-C)
    Cancelled,
    /// The detector reached the end of its input
    InputEnded,
    /// The detector failed or died
    ProducerFailed,
}

impl StopReason {
    /// Whether the run went the full duration
    pub fn is_complete(&self) -> bool {
        matches!(self, StopReason::DurationElapsed)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::DurationElapsed => "duration elapsed",
            StopReason::Cancelled => "cancelled",
            StopReason::InputEnded => "input ended",
            StopReason::ProducerFailed => "detector failed",
        };
        f.write_str(text)
    }
}

/// Everything known about a finished run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub stop_reason: StopReason,
    pub elapsed: Duration,
    /// `None` if the detector was abandoned or died
    pub producer: Option<ProducerSummary>,
    /// `None` if the analyzer was abandoned or died
    pub analyzer: Option<AnalyzerSummary>,
    pub producer_detached: bool,
    pub analyzer_detached: bool,
    /// End-of-stream was sent by the coordinator rather than the detector
    pub fallback_end_of_stream: bool,
}

impl RunOutcome {
    /// Process exit code: 0 for a full-duration run, 2 when cut short
    pub fn exit_code(&self) -> i32 {
        if self.stop_reason.is_complete() {
            0
        } else {
            2
        }
    }
}

/// Runs the detector and analyzer stages for one session
#[derive(Debug)]
pub struct PipelineCoordinator {
    config: AppConfig,
    duration: Option<Duration>,
    cancel: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl PipelineCoordinator {
    /// Coordinator using the configured default duration
    pub fn new(config: AppConfig) -> Self {
        let duration = Some(config.runtime.default_duration());
        Self {
            config,
            duration,
            cancel: Arc::new(AtomicBool::new(false)),
            poll_interval: MONITOR_POLL_INTERVAL,
        }
    }

    /// Override the run duration; `None` runs until input ends or cancel
    pub fn with_duration(mut self, duration: Option<Duration>) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Flag that cancels the run when set to `true`
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run one session to completion.
    ///
    /// Returns an error only if the pipeline could not be started; once both
    /// stages are running every problem is reported through [`RunOutcome`].
    pub fn run(
        &self,
        source: Box<dyn ObservationSource>,
        paths: SessionPaths,
    ) -> Result<RunOutcome> {
        let started = Instant::now();
        let runtime = &self.config.runtime;
        let (sender, receiver) = event_channel(runtime.channel_capacity);
        let fallback = sender.clone();

        // Analyzer first: nothing may be produced before it can receive
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);
        let (analyzer_done_tx, analyzer_done_rx) = bounded::<AnalyzerSummary>(1);
        let analyzer_config = self.config.clone();
        let consumer = thread::Builder::new()
            .name("analyzer".to_string())
            .spawn(move || {
                let analyzer = match StreamingAnalyzer::create(paths, &analyzer_config) {
                    Ok(analyzer) => analyzer,
                    Err(e) => {
                        tracing::error!("Analyzer failed to start: {}", e);
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                let summary = analyzer.run(receiver);
                let _ = analyzer_done_tx.send(summary);
            })
            .map_err(|e| TrafficError::Startup(format!("cannot spawn analyzer thread: {}", e)))?;

        match ready_rx.recv_timeout(runtime.analyzer_startup_timeout()) {
            Ok(Ok(())) => tracing::debug!("Analyzer ready"),
            Ok(Err(e)) => {
                let _ = consumer.join();
                return Err(TrafficError::Startup(format!("analyzer failed to start: {}", e)));
            }
            Err(RecvTimeoutError::Timeout) => {
                // Dropping both senders lets a late analyzer finish on its own
                return Err(TrafficError::Timeout(format!(
                    "analyzer not ready after {:.1}s",
                    runtime.analyzer_startup_timeout_secs
                )));
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = consumer.join();
                return Err(TrafficError::Startup(
                    "analyzer exited during startup".to_string(),
                ));
            }
        }

        let running = Arc::new(AtomicBool::new(true));
        let (producer_done_tx, producer_done_rx) = bounded::<ProducerSummary>(1);
        let worker = ProducerWorker::new(&self.config, source, sender, running.clone());
        let producer = match thread::Builder::new()
            .name("detector".to_string())
            .spawn(move || {
                let summary = worker.run();
                let _ = producer_done_tx.send(summary);
            }) {
            Ok(handle) => handle,
            Err(e) => {
                let _ = fallback.end_of_stream_timeout(runtime.analyzer_shutdown_timeout());
                let _ = analyzer_done_rx.recv_timeout(runtime.analyzer_shutdown_timeout());
                return Err(TrafficError::Startup(format!(
                    "cannot spawn detector thread: {}",
                    e
                )));
            }
        };

        match self.duration {
            Some(d) => {
                tracing::info!("Pipeline running for {:.1} minutes", d.as_secs_f64() / 60.0)
            }
            None => tracing::info!("Pipeline running until input ends or interrupted"),
        }

        // Monitor
        // A duration too long to represent is the same as no deadline
        let deadline = self.duration.and_then(|d| started.checked_add(d));
        let mut producer_summary = None;
        let mut producer_gone = false;
        let stop_reason = loop {
            if self.cancel.load(Ordering::SeqCst) {
                tracing::info!("Interrupted, stopping");
                break StopReason::Cancelled;
            }

            let mut wait = self.poll_interval;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    tracing::info!(
                        "Time's up, stopping after {:.1} minutes",
                        started.elapsed().as_secs_f64() / 60.0
                    );
                    break StopReason::DurationElapsed;
                }
                wait = wait.min(deadline - now);
            }

            match producer_done_rx.recv_timeout(wait) {
                Ok(summary) => {
                    tracing::info!("Detector ended on its own");
                    let reason = if summary.exit.is_failure() {
                        StopReason::ProducerFailed
                    } else {
                        StopReason::InputEnded
                    };
                    producer_summary = Some(summary);
                    break reason;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::error!("Detector thread terminated unexpectedly");
                    producer_gone = true;
                    break StopReason::ProducerFailed;
                }
            }
        };

        // Stop the detector
        running.store(false, Ordering::SeqCst);
        let mut producer_detached = false;
        if producer_summary.is_none() && !producer_gone {
            tracing::info!("Stopping detector");
            match producer_done_rx.recv_timeout(runtime.detector_shutdown_timeout()) {
                Ok(summary) => producer_summary = Some(summary),
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        "Detector did not stop within {:.1}s, abandoning it",
                        runtime.detector_shutdown_timeout_secs
                    );
                    producer_detached = true;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::error!("Detector thread terminated unexpectedly");
                }
            }
        }
        if !producer_detached && producer.join().is_err() {
            tracing::error!("Detector thread panicked");
        }

        // The detector normally sent this already; the latch makes it a no-op
        let fallback_end_of_stream =
            match fallback.end_of_stream_timeout(runtime.analyzer_shutdown_timeout()) {
                Ok(sent) => {
                    if sent {
                        tracing::warn!("Sent end-of-stream on behalf of the detector");
                    }
                    sent
                }
                Err(e) => {
                    tracing::warn!("Could not deliver end-of-stream to analyzer: {}", e);
                    false
                }
            };
        drop(fallback);

        // Drain the analyzer
        tracing::info!("Waiting for analyzer to complete");
        let (analyzer_summary, analyzer_detached) =
            match analyzer_done_rx.recv_timeout(runtime.analyzer_shutdown_timeout()) {
                Ok(summary) => {
                    if consumer.join().is_err() {
                        tracing::error!("Analyzer thread panicked");
                    }
                    (Some(summary), false)
                }
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        "Analyzer did not finish within {:.1}s, abandoning it",
                        runtime.analyzer_shutdown_timeout_secs
                    );
                    (None, true)
                }
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::error!("Analyzer thread terminated unexpectedly");
                    let _ = consumer.join();
                    (None, false)
                }
            };

        let outcome = RunOutcome {
            stop_reason,
            elapsed: started.elapsed(),
            producer: producer_summary,
            analyzer: analyzer_summary,
            producer_detached,
            analyzer_detached,
            fallback_end_of_stream,
        };
        tracing::info!(
            "Run finished ({}) after {:.1} minutes",
            outcome.stop_reason,
            outcome.elapsed.as_secs_f64() / 60.0
        );
        Ok(outcome)
    }
}
