//! Two-stage pipeline plumbing
//!
//! Detection and analysis run on dedicated threads connected by a single
//! ordered event channel. The coordinator owns both threads for one run.
//!
//! # Architecture
//!
//! ```text
//! [detector thread] ──EventMessage──► [analyzer thread]
//!         ▲                                  ▲
//!         └──── running / done ── coordinator ── ready / done ┘
//! ```
//!
//! # Design
//!
//! - **Explicit end of stream**: `EventMessage::EndOfStream` closes the
//!   stream, sent exactly once through a latch shared by all senders.
//! - **Ready before produce**: the detector starts only after the analyzer
//!   has opened its log.
//! - **Bounded shutdown**: every wait during shutdown has a timeout.

pub mod channel;
pub mod coordinator;

pub use channel::{event_channel, EventMessage, EventReceiver, EventSender};
pub use coordinator::{PipelineCoordinator, RunOutcome, StopReason, MONITOR_POLL_INTERVAL};
