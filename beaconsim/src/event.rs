//! Event types and priority queue ordering for discrete event simulation.

use std::cmp::Ordering;

use beaconlink::{SinkId, Timestamp};

/// Unique sequence number for deterministic event ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Events in the discrete event simulation.
#[derive(Debug, Clone)]
pub enum SimEvent {
    /// A sink emits its next beacon.
    SinkBeacon { sink: SinkId },
    /// The source's pending receive ends without a frame (deadline expiry
    /// or an explicit stop). `epoch` identifies the receive session; stale
    /// lapses are discarded.
    RxLapse { epoch: u64 },
    /// The source's in-flight transmission leaves the air.
    TxAirDone,
    /// The source's earliest alarm may have expired.
    SourceTimer,
}

/// A scheduled event with timestamp and sequence number for ordering.
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    /// When the event should occur.
    pub time: Timestamp,
    /// Sequence number for deterministic ordering of same-time events.
    pub seq: SequenceNumber,
    /// The event to process.
    pub event: SimEvent,
}

impl ScheduledEvent {
    pub fn new(time: Timestamp, seq: SequenceNumber, event: SimEvent) -> Self {
        Self { time, seq, event }
    }
}

// Implement ordering for min-heap (BinaryHeap is max-heap, so we reverse).
impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (BinaryHeap is max-heap).
        // First compare by time, then by sequence number.
        match other.time.as_ticks().cmp(&self.time.as_ticks()) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}
