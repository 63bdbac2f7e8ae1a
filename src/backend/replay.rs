//! Replay of recorded tracker output
//!
//! Reads one JSON-encoded [`FrameResult`] per line, the format an external
//! detector/tracker process writes. Blank lines and lines starting with `#`
//! are skipped. With pacing enabled, frames are released no faster than the
//! gaps between their timestamps, so a recording plays back in real time.

use super::source::ObservationSource;
use crate::error::{Result, TrafficError};
use crate::types::FrameResult;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Longest single pause while pacing; larger timestamp gaps are compressed
const MAX_PACING_GAP: Duration = Duration::from_secs(1);

/// JSON-lines frame source
#[derive(Debug)]
pub struct ReplaySource {
    path: PathBuf,
    name: String,
    lines: Option<Lines<BufReader<File>>>,
    line_number: usize,
    paced: bool,
    last_release: Option<(f64, Instant)>,
}

impl ReplaySource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            name: format!("replay:{}", path.display()),
            path,
            lines: None,
            line_number: 0,
            paced: false,
            last_release: None,
        }
    }

    /// Release frames at the pace of their timestamps
    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn pace(&mut self, timestamp: f64) {
        if let Some((prev_ts, released_at)) = self.last_release {
            let gap = Duration::try_from_secs_f64((timestamp - prev_ts).max(0.0))
                .map_or(MAX_PACING_GAP, |gap| gap.min(MAX_PACING_GAP));
            let since = released_at.elapsed();
            if gap > since {
                thread::sleep(gap - since);
            }
        }
        self.last_release = Some((timestamp, Instant::now()));
    }
}

impl ObservationSource for ReplaySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> Result<()> {
        let file = File::open(&self.path).map_err(|e| {
            TrafficError::Source(format!("cannot open {}: {}", self.path.display(), e))
        })?;
        self.lines = Some(BufReader::new(file).lines());
        self.line_number = 0;
        self.last_release = None;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<FrameResult>> {
        let lines = self
            .lines
            .as_mut()
            .ok_or_else(|| TrafficError::Source(format!("{} is not open", self.name)))?;

        loop {
            let Some(line) = lines.next() else {
                return Ok(None);
            };
            self.line_number += 1;
            let line = line.map_err(|e| {
                TrafficError::Source(format!("{} line {}: {}", self.path.display(), self.line_number, e))
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let frame: FrameResult = serde_json::from_str(trimmed).map_err(|e| {
                TrafficError::Source(format!("{} line {}: {}", self.path.display(), self.line_number, e))
            })?;
            if self.paced {
                self.pace(frame.timestamp);
            }
            return Ok(Some(frame));
        }
    }

    fn close(&mut self) {
        self.lines = None;
    }
}
