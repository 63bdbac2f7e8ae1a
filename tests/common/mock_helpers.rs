//! Mock construction helpers

use crossbeam_channel::{bounded, Receiver, Sender};
use std::collections::VecDeque;
use traffic_speed::backend::ObservationSource;
use traffic_speed::error::Result;
use traffic_speed::types::FrameResult;

/// Source that serves its frames and then blocks inside `next_frame` until
/// the paired [`Sender`] is used or dropped. Models a detector that hangs.
pub struct StuckSource {
    frames: VecDeque<FrameResult>,
    release: Receiver<()>,
}

/// Create a stuck source and the handle that releases it
pub fn stuck_source(frames: Vec<FrameResult>) -> (StuckSource, Sender<()>) {
    let (tx, rx) = bounded(1);
    (
        StuckSource {
            frames: frames.into(),
            release: rx,
        },
        tx,
    )
}

impl ObservationSource for StuckSource {
    fn name(&self) -> &str {
        "stuck"
    }

    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<FrameResult>> {
        if let Some(frame) = self.frames.pop_front() {
            return Ok(Some(frame));
        }
        // Hang until released
        let _ = self.release.recv();
        Ok(None)
    }
}
