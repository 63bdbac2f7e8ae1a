//! In-memory observation source
//!
//! Plays back a fixed list of frames in place of a live tracker. Can be told
//! to fail on open or after a number of frames.

use super::source::ObservationSource;
use crate::error::{Result, TrafficError};
use crate::types::FrameResult;
use std::collections::VecDeque;

/// Failure injected into a [`ScriptedSource`]
#[derive(Debug, Clone, PartialEq)]
enum Fault {
    None,
    /// `open` fails
    Open(String),
    /// The read after this many frames fails
    ReadAfter(usize, String),
}

/// Frames served from memory in order
#[derive(Debug)]
pub struct ScriptedSource {
    name: String,
    frames: VecDeque<FrameResult>,
    served: usize,
    opened: bool,
    fault: Fault,
}

impl ScriptedSource {
    pub fn new(frames: impl IntoIterator<Item = FrameResult>) -> Self {
        Self {
            name: "scripted".to_string(),
            frames: frames.into_iter().collect(),
            served: 0,
            opened: false,
            fault: Fault::None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make `open` fail with the given message
    pub fn failing_open(mut self, message: impl Into<String>) -> Self {
        self.fault = Fault::Open(message.into());
        self
    }

    /// Make the read following `frames` successful reads fail
    pub fn failing_after(mut self, frames: usize, message: impl Into<String>) -> Self {
        self.fault = Fault::ReadAfter(frames, message.into());
        self
    }

    /// Frames not yet served
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn served(&self) -> usize {
        self.served
    }
}

impl ObservationSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> Result<()> {
        if let Fault::Open(message) = &self.fault {
            return Err(TrafficError::Source(message.clone()));
        }
        self.opened = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<FrameResult>> {
        if !self.opened {
            return Err(TrafficError::Source(format!("{} is not open", self.name)));
        }
        if let Fault::ReadAfter(limit, message) = &self.fault {
            if self.served >= *limit {
                return Err(TrafficError::Source(message.clone()));
            }
        }
        let frame = self.frames.pop_front();
        if frame.is_some() {
            self.served += 1;
        }
        Ok(frame)
    }

    fn close(&mut self) {
        self.opened = false;
    }
}
