//! Event channel between the detection and analysis stages
//!
//! Carries [`EventMessage`]s over a crossbeam channel. End of stream is an
//! explicit variant rather than a magic value. All clones of an
//! [`EventSender`] share one "closed" latch: the first `end_of_stream` call
//! sends the sentinel and every later call, or any later record, is refused.
//! This lets the coordinator keep a fallback sender and finish the stream on
//! behalf of a producer that never got to do it.

use crate::error::SendError;
use crate::types::VehicleRecord;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Message crossing from producer to consumer
#[derive(Debug, Clone, PartialEq)]
pub enum EventMessage {
    /// A finalized vehicle record
    Record(VehicleRecord),
    /// No further messages will follow
    EndOfStream,
}

/// Create a channel pair. A capacity of 0 means unbounded.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = if capacity == 0 {
        unbounded()
    } else {
        bounded(capacity)
    };
    (
        EventSender {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        },
        EventReceiver { rx },
    )
}

/// Producer-side handle
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<EventMessage>,
    closed: Arc<AtomicBool>,
}

impl EventSender {
    /// Send a record, blocking while a bounded channel is full
    pub fn send(&self, record: VehicleRecord) -> Result<(), SendError> {
        if self.is_closed() {
            return Err(SendError::Closed);
        }
        self.tx
            .send(EventMessage::Record(record))
            .map_err(|_| SendError::Disconnected)
    }

    /// Signal end of stream. Returns `Ok(true)` if this call sent the
    /// sentinel, `Ok(false)` if it had already been sent.
    pub fn end_of_stream(&self) -> Result<bool, SendError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        self.tx
            .send(EventMessage::EndOfStream)
            .map(|_| true)
            .map_err(|_| SendError::Disconnected)
    }

    /// Like [`end_of_stream`](Self::end_of_stream) but gives up if the channel
    /// stays full for `timeout`. A timed-out sentinel was never queued, so the
    /// latch is released again and a later call can still deliver it.
    pub fn end_of_stream_timeout(&self, timeout: Duration) -> Result<bool, SendError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        match self.tx.send_timeout(EventMessage::EndOfStream, timeout) {
            Ok(()) => Ok(true),
            Err(SendTimeoutError::Timeout(_)) => {
                self.closed.store(false, Ordering::SeqCst);
                Err(SendError::Timeout)
            }
            Err(SendTimeoutError::Disconnected(_)) => Err(SendError::Disconnected),
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Messages currently queued
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// Consumer-side handle
#[derive(Debug)]
pub struct EventReceiver {
    rx: Receiver<EventMessage>,
}

impl EventReceiver {
    /// Block until the next message. A channel whose senders all vanished
    /// without a sentinel is reported as end of stream.
    pub fn recv(&self) -> EventMessage {
        match self.rx.recv() {
            Ok(msg) => msg,
            Err(_) => {
                tracing::warn!("Event channel disconnected without end-of-stream");
                EventMessage::EndOfStream
            }
        }
    }

    /// Wait at most `timeout`; `None` if nothing arrived in time
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EventMessage> {
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(EventMessage::EndOfStream),
        }
    }

    /// Iterate records until the first end-of-stream. Nothing is dequeued
    /// after the sentinel.
    pub fn records(&self) -> impl Iterator<Item = VehicleRecord> + '_ {
        let mut done = false;
        std::iter::from_fn(move || {
            if done {
                return None;
            }
            match self.recv() {
                EventMessage::Record(record) => Some(record),
                EventMessage::EndOfStream => {
                    done = true;
                    None
                }
            }
        })
    }

    /// Messages currently queued
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;
    use std::thread;

    fn record(n: u64) -> VehicleRecord {
        VehicleRecord {
            vehicle_number: n,
            track_id: n as u32,
            direction: Direction::LeftToRight,
            distance_pixels: 100.0,
            time_elapsed: 1.0,
            speed_raw: 100.0,
            speed_normalized: 100.0,
            timestamp: n as f64,
        }
    }

    #[test]
    fn test_fifo_then_sentinel() {
        let (tx, rx) = event_channel(8);
        tx.send(record(1)).unwrap();
        tx.send(record(2)).unwrap();
        assert_eq!(tx.end_of_stream(), Ok(true));

        let got: Vec<u64> = rx.records().map(|r| r.vehicle_number).collect();
        assert_eq!(got, vec![1, 2]);
    }

    #[test]
    fn test_sentinel_sent_once_across_clones() {
        let (tx, rx) = event_channel(8);
        let fallback = tx.clone();
        assert_eq!(tx.end_of_stream(), Ok(true));
        assert_eq!(fallback.end_of_stream(), Ok(false));
        assert_eq!(tx.end_of_stream(), Ok(false));

        assert_eq!(rx.recv(), EventMessage::EndOfStream);
        assert!(rx.recv_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn test_records_refused_after_close() {
        let (tx, rx) = event_channel(8);
        let fallback = tx.clone();
        fallback.end_of_stream().unwrap();
        assert_eq!(tx.send(record(1)), Err(SendError::Closed));
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_records_stop_at_sentinel() {
        let (tx, rx) = event_channel(0);
        tx.send(record(1)).unwrap();
        tx.end_of_stream().unwrap();
        let mut it = rx.records();
        assert!(it.next().is_some());
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }

    #[test]
    fn test_dropped_senders_read_as_end_of_stream() {
        let (tx, rx) = event_channel(4);
        tx.send(record(1)).unwrap();
        drop(tx);
        assert!(matches!(rx.recv(), EventMessage::Record(_)));
        assert_eq!(rx.recv(), EventMessage::EndOfStream);
    }

    #[test]
    fn test_send_fails_when_receiver_gone() {
        let (tx, rx) = event_channel(4);
        drop(rx);
        assert_eq!(tx.send(record(1)), Err(SendError::Disconnected));
    }

    #[test]
    fn test_end_of_stream_timeout_on_full_channel() {
        let (tx, rx) = event_channel(1);
        let fallback = tx.clone();
        tx.send(record(1)).unwrap();
        assert_eq!(
            fallback.end_of_stream_timeout(Duration::from_millis(20)),
            Err(SendError::Timeout)
        );
        assert!(!tx.is_closed());

        // Once there is room the sentinel can still be delivered
        assert!(matches!(rx.recv(), EventMessage::Record(_)));
        assert_eq!(fallback.end_of_stream_timeout(Duration::from_millis(20)), Ok(true));
        assert_eq!(tx.end_of_stream(), Ok(false));
        assert_eq!(rx.recv(), EventMessage::EndOfStream);
    }

    #[test]
    fn test_backpressure_across_threads() {
        let (tx, rx) = event_channel(2);
        let producer = thread::spawn(move || {
            for n in 1..=50 {
                tx.send(record(n)).unwrap();
            }
            tx.end_of_stream().unwrap();
        });

        let got: Vec<u64> = rx.records().map(|r| r.vehicle_number).collect();
        producer.join().unwrap();
        assert_eq!(got, (1..=50).collect::<Vec<_>>());
    }
}
