//! Producer Worker Implementation
//!
//! This module contains the detection loop that runs in its own thread. It
//! pulls frames from an [`ObservationSource`], turns tracked boxes into
//! observations, detects line crossings, estimates speeds and hands finished
//! [`VehicleRecord`]s to the analysis stage over the event channel.
//!
//! # Responsibilities
//!
//! - **Region of interest**: Only the left half of the frame is used when
//!   configured; boxes whose center falls outside it are ignored
//! - **Filtering**: Low-confidence boxes are dropped before detection
//! - **Crossing detection**: Delegated to [`CrossingDetector`]
//! - **Speed estimation**: Delegated to [`SpeedEstimator`]
//! - **Status reporting**: A progress line every [`STATUS_INTERVAL_FRAMES`]
//!   frames and a summary at exit
//!
//! # Stream Termination
//!
//! The worker signals end of stream on every exit path: normal end of input,
//! cooperative stop, source failure, and unwinding from a panic (via a drop
//! guard). A cooperative stop is requested by clearing the shared `running`
//! flag, which is checked between frames.

use super::source::ObservationSource;
use crate::config::{AppConfig, RoiConfig};
use crate::detection::{CrossingDetector, DetectorStats, SpeedEstimator};
use crate::error::SendError;
use crate::pipeline::channel::EventSender;
use crate::types::{FrameResult, Observation, VehicleRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Frames between progress lines
pub const STATUS_INTERVAL_FRAMES: u64 = 100;

/// Why the producer loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum ProducerExit {
    /// The source reported end of stream
    EndOfInput,
    /// `running` was cleared
    Stopped,
    /// The source could not be opened
    SourceUnavailable(String),
    /// A frame read failed
    ReadFailed(String),
    /// The analysis stage stopped accepting records
    ChannelClosed,
}

impl ProducerExit {
    /// Whether the exit indicates a problem rather than a normal stop
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ProducerExit::SourceUnavailable(_) | ProducerExit::ChannelClosed
        )
    }
}

/// What the producer did over its lifetime
#[derive(Debug, Clone)]
pub struct ProducerSummary {
    pub exit: ProducerExit,
    pub frames: u64,
    pub vehicles: u64,
    /// Records that failed speed estimation
    pub speed_errors: u64,
    /// Boxes dropped by the ROI or the confidence threshold
    pub rejected_boxes: u64,
    pub detector: DetectorStats,
    pub runtime: Duration,
}

impl ProducerSummary {
    /// Average frames per second over the whole run
    pub fn avg_fps(&self) -> f64 {
        let secs = self.runtime.as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }
}

/// Sends end-of-stream when dropped, including during unwinding
struct EndOfStreamGuard(EventSender);

impl Drop for EndOfStreamGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.end_of_stream() {
            tracing::debug!("End-of-stream not delivered: {}", e);
        }
    }
}

/// Detection stage worker
pub struct ProducerWorker {
    source: Box<dyn ObservationSource>,
    detector: CrossingDetector,
    estimator: SpeedEstimator,
    roi: RoiConfig,
    confidence_threshold: f32,
    sender: EventSender,
    running: Arc<AtomicBool>,
    frames: u64,
    speed_errors: u64,
    rejected_boxes: u64,
}

impl ProducerWorker {
    /// Create a worker from the application configuration
    pub fn new(
        config: &AppConfig,
        source: Box<dyn ObservationSource>,
        sender: EventSender,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            source,
            detector: CrossingDetector::new(
                config.detection.vehicle_classes.iter().copied(),
                config.tracking.min_time_before_count,
            ),
            estimator: SpeedEstimator::new(config.perspective.rtl_correction_factor),
            roi: config.roi.clone(),
            confidence_threshold: config.detection.confidence_threshold,
            sender,
            running,
            frames: 0,
            speed_errors: 0,
            rejected_boxes: 0,
        }
    }

    /// Run until the source ends, `running` is cleared, or the consumer goes
    /// away. Always signals end of stream before returning.
    pub fn run(mut self) -> ProducerSummary {
        let started = Instant::now();
        let guard = EndOfStreamGuard(self.sender.clone());

        if let Err(e) = self.source.open() {
            tracing::error!("Cannot open source {}: {}", self.source.name(), e);
            drop(guard);
            return self.summary(ProducerExit::SourceUnavailable(e.to_string()), started);
        }
        tracing::info!("Detection started on {}", self.source.name());

        let exit = loop {
            if !self.running.load(Ordering::SeqCst) {
                break ProducerExit::Stopped;
            }

            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!("Source {} reached end of stream", self.source.name());
                    break ProducerExit::EndOfInput;
                }
                Err(e) => {
                    tracing::warn!("Frame read failed, ending detection: {}", e);
                    break ProducerExit::ReadFailed(e.to_string());
                }
            };

            self.frames += 1;
            if let Err(exit) = self.process_frame(&frame) {
                break exit;
            }

            if self.frames % STATUS_INTERVAL_FRAMES == 0 {
                let elapsed = started.elapsed().as_secs_f64();
                tracing::info!(
                    "[{:.1}min] Frame {} | FPS: {:.1} | Count: {}",
                    elapsed / 60.0,
                    self.frames,
                    self.frames as f64 / elapsed.max(f64::EPSILON),
                    self.detector.vehicle_count()
                );
            }
        };

        self.source.close();
        drop(guard);

        let summary = self.summary(exit, started);
        tracing::info!(
            "Detection stopped ({:?}): {:.1}s runtime, {} frames, {:.1} avg FPS, {} vehicles, {} suppressed",
            summary.exit,
            summary.runtime.as_secs_f64(),
            summary.frames,
            summary.avg_fps(),
            summary.vehicles,
            summary.detector.suppressed
        );
        summary
    }

    /// Feed every usable box of one frame through detection.
    ///
    /// Returns the exit reason if the consumer can no longer receive.
    fn process_frame(&mut self, frame: &FrameResult) -> Result<(), ProducerExit> {
        self.detector.mark_origin(frame.timestamp);
        let frame_width = frame.dims.0;
        let crop_width = self.roi.crop_width(frame_width) as f64;
        let line_x = self.roi.line_x(frame_width);

        for detection in frame.iter() {
            if detection.confidence < self.confidence_threshold {
                self.rejected_boxes += 1;
                continue;
            }
            let center = detection.bbox.center();
            if center.x >= crop_width {
                self.rejected_boxes += 1;
                continue;
            }

            let obs = Observation::new(
                detection.track_id,
                center,
                detection.class_id,
                frame.timestamp,
            );
            let Some(event) = self.detector.process(&obs, line_x) else {
                continue;
            };

            match self.estimator.enrich(&event) {
                Ok(record) => self.emit(record)?,
                Err(e) => {
                    self.speed_errors += 1;
                    tracing::error!("Dropping vehicle #{}: {}", event.vehicle_number, e);
                }
            }
        }
        Ok(())
    }

    fn emit(&mut self, record: VehicleRecord) -> Result<(), ProducerExit> {
        tracing::debug!(
            "Vehicle #{:3} | {} | {:.0}px / {:.2}s | {:.1} px/s",
            record.vehicle_number,
            record.direction,
            record.distance_pixels,
            record.time_elapsed,
            record.speed_normalized
        );
        match self.sender.send(record) {
            Ok(()) => Ok(()),
            Err(SendError::Closed) => {
                tracing::warn!("Event stream already closed, stopping detection");
                Err(ProducerExit::ChannelClosed)
            }
            Err(e) => {
                tracing::error!("Analyzer unreachable, stopping detection: {}", e);
                Err(ProducerExit::ChannelClosed)
            }
        }
    }

    fn summary(&self, exit: ProducerExit, started: Instant) -> ProducerSummary {
        ProducerSummary {
            exit,
            frames: self.frames,
            vehicles: self.detector.vehicle_count(),
            speed_errors: self.speed_errors,
            rejected_boxes: self.rejected_boxes,
            detector: self.detector.stats(),
            runtime: started.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::scripted::ScriptedSource;
    use crate::pipeline::channel::{event_channel, EventMessage};
    use crate::types::{BBox, Detection, Direction};

    const CAR: u32 = 2;

    /// Box centered at `x` with the given confidence
    fn boxed(track_id: u32, x: f64, confidence: f32) -> Detection {
        Detection {
            track_id,
            bbox: BBox::ltrb(x - 10.0, 40.0, x + 10.0, 60.0),
            class_id: CAR,
            confidence,
        }
    }

    /// 1280 wide, left-half ROI: crop 640, line at 320
    fn frame(t: f64, detections: Vec<Detection>) -> FrameResult {
        FrameResult::new((1280, 720), t, detections)
    }

    fn run_frames(frames: Vec<FrameResult>) -> (ProducerSummary, Vec<EventMessage>) {
        let config = AppConfig::default();
        let (tx, rx) = event_channel(0);
        let worker = ProducerWorker::new(
            &config,
            Box::new(ScriptedSource::new(frames)),
            tx,
            Arc::new(AtomicBool::new(true)),
        );
        let summary = worker.run();
        let mut messages = Vec::new();
        while let Some(msg) = rx.recv_timeout(Duration::from_millis(10)) {
            let end = msg == EventMessage::EndOfStream;
            messages.push(msg);
            if end {
                break;
            }
        }
        (summary, messages)
    }

    #[test]
    fn test_crossing_becomes_record_then_sentinel() {
        let (summary, messages) = run_frames(vec![
            frame(0.0, vec![boxed(1, 300.0, 0.9)]),
            frame(1.0, vec![boxed(1, 340.0, 0.9)]),
        ]);
        assert_eq!(summary.exit, ProducerExit::EndOfInput);
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.vehicles, 1);
        assert_eq!(messages.len(), 2);
        match &messages[0] {
            EventMessage::Record(r) => {
                assert_eq!(r.direction, Direction::LeftToRight);
                assert_eq!(r.distance_pixels, 40.0);
            }
            other => panic!("expected record, got {:?}", other),
        }
        assert_eq!(messages[1], EventMessage::EndOfStream);
    }

    #[test]
    fn test_low_confidence_and_out_of_roi_are_rejected() {
        let (summary, messages) = run_frames(vec![
            frame(0.0, vec![boxed(1, 300.0, 0.1), boxed(2, 700.0, 0.9)]),
            frame(1.0, vec![boxed(1, 340.0, 0.1), boxed(2, 900.0, 0.9)]),
        ]);
        assert_eq!(summary.vehicles, 0);
        assert_eq!(summary.rejected_boxes, 4);
        assert_eq!(messages, vec![EventMessage::EndOfStream]);
    }

    #[test]
    fn test_empty_frames_are_not_end_of_stream() {
        let (summary, _) = run_frames(vec![
            frame(0.0, vec![boxed(1, 300.0, 0.9)]),
            FrameResult::empty((1280, 720), 0.5),
            frame(1.0, vec![boxed(1, 340.0, 0.9)]),
        ]);
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.vehicles, 1);
    }

    #[test]
    fn test_open_failure_still_sends_sentinel() {
        let (tx, rx) = event_channel(4);
        let worker = ProducerWorker::new(
            &AppConfig::default(),
            Box::new(ScriptedSource::new(Vec::new()).failing_open("no camera")),
            tx,
            Arc::new(AtomicBool::new(true)),
        );
        let summary = worker.run();
        assert!(matches!(summary.exit, ProducerExit::SourceUnavailable(_)));
        assert!(summary.exit.is_failure());
        assert_eq!(rx.recv(), EventMessage::EndOfStream);
    }

    #[test]
    fn test_cleared_running_flag_stops_before_first_frame() {
        let (tx, rx) = event_channel(4);
        let worker = ProducerWorker::new(
            &AppConfig::default(),
            Box::new(ScriptedSource::new(vec![frame(0.0, Vec::new())])),
            tx,
            Arc::new(AtomicBool::new(false)),
        );
        let summary = worker.run();
        assert_eq!(summary.exit, ProducerExit::Stopped);
        assert_eq!(summary.frames, 0);
        assert_eq!(rx.recv(), EventMessage::EndOfStream);
    }

    #[test]
    fn test_read_failure_ends_gracefully() {
        let (tx, rx) = event_channel(4);
        let source = ScriptedSource::new(vec![frame(0.0, Vec::new()), frame(0.1, Vec::new())])
            .failing_after(1, "stream dropped");
        let worker = ProducerWorker::new(
            &AppConfig::default(),
            Box::new(source),
            tx,
            Arc::new(AtomicBool::new(true)),
        );
        let summary = worker.run();
        assert!(matches!(summary.exit, ProducerExit::ReadFailed(_)));
        assert!(!summary.exit.is_failure());
        assert_eq!(summary.frames, 1);
        assert_eq!(rx.recv(), EventMessage::EndOfStream);
    }
}
