//! Error handling for traffic-speed
//!
//! This module defines the crate error type, a Result alias, and the small
//! dedicated error enums used at the speed-estimation and channel seams.

use thiserror::Error;

/// Main error type for traffic-speed operations
#[derive(Error, Debug)]
pub enum TrafficError {
    /// Errors related to configuration loading/validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// The observation source could not be opened or read
    #[error("Source error: {0}")]
    Source(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// Errors writing the durable vehicle log
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Errors generating or writing the report
    #[error("Report error: {0}")]
    Report(String),

    /// Speed estimation failed
    #[error("Speed error: {0}")]
    Speed(#[from] SpeedError),

    /// A pipeline stage failed to start
    #[error("Startup error: {0}")]
    Startup(String),

    /// Timeout errors
    #[error("Timeout: {0}")]
    Timeout(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TrafficError>,
    },
}

impl TrafficError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TrafficError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for traffic-speed operations
pub type Result<T> = std::result::Result<T, TrafficError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| TrafficError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| TrafficError::Io(e).with_context(f()))
    }
}

/// Failure of the speed estimator
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SpeedError {
    /// Elapsed time was zero; the dwell threshold should make this unreachable
    #[error("cannot compute speed over zero elapsed time (distance {distance_pixels:.1}px)")]
    DivideByZero { distance_pixels: f64 },
}

/// Failure to hand a message to the analysis stage
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// End of stream was already signalled; nothing more may be sent
    #[error("event channel already closed by end-of-stream")]
    Closed,

    /// The receiving side has gone away
    #[error("event channel disconnected")]
    Disconnected,

    /// The channel stayed full past the allowed wait
    #[error("timed out waiting for event channel capacity")]
    Timeout,
}
