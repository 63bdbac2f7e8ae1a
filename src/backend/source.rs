//! ObservationSource trait for the detector/tracker boundary
//!
//! A source yields one [`FrameResult`] per processed frame. The producer
//! worker only talks to this trait, so live trackers, recorded sessions and
//! in-memory scripts are interchangeable.

use crate::error::Result;
use crate::types::FrameResult;

/// Anything that can produce tracked frames
pub trait ObservationSource: Send {
    /// Short human-readable name for logs
    fn name(&self) -> &str;

    /// Acquire the underlying stream. Called once before the first frame.
    fn open(&mut self) -> Result<()>;

    /// Next frame, `Ok(None)` when the stream has ended.
    ///
    /// A frame with no identified tracks is `Ok(Some(..))` with
    /// `detections == None`, never `Ok(None)`.
    fn next_frame(&mut self) -> Result<Option<FrameResult>>;

    /// Release the stream. Default does nothing.
    fn close(&mut self) {}
}
