//! Diagnostic events for protocol tracing.
//!
//! The source appends a [`TraceEvent`] at every decision point. Production
//! wiring normally installs [`NullTrace`]; test harnesses and the simulator
//! install collecting emitters to assert on protocol flow.

use crate::time::{Duration, Timestamp};
use crate::types::SinkId;

/// Trait for receiving diagnostic events from the source.
pub trait TraceEmitter {
    /// Called when a diagnostic event is emitted.
    fn emit(&mut self, event: TraceEvent);
}

/// Diagnostic events emitted by the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    /// Received frame too short to carry a payload; dropped.
    FrameTooShort { len: usize },
    /// Sender address maps outside the configured sink block; dropped.
    InvalidSender { address: u16 },
    /// Frame carried the source's own address (self echo); dropped.
    OwnFrameIgnored,
    /// Beacon payload outside the valid burst sequence range; dropped.
    BadSequence { sink: SinkId, seq: u8 },
    /// Beacon accepted from a sink.
    BeaconSeen { sink: SinkId, seq: u8, at: Timestamp },
    /// Beacon dropped because the radio is locked to another sink.
    BeaconMasked { sink: SinkId, owner: SinkId },
    /// Estimation listen started for a sink.
    ListenStarted { sink: SinkId },
    /// Period estimate committed for a sink.
    EstimateCommitted { sink: SinkId, period: Duration },
    /// Every sink has an estimate; estimation is over for good.
    EstimationFinished,
    /// Estimation listen ended through the reception timeout.
    ReceptionTimeout { sink: SinkId },
    /// In-window transmit instant armed for a sink.
    TransmitWindow { sink: SinkId, at: Timestamp },
    /// Next transmission attempt scheduled for a sink.
    TransmitScheduled { sink: SinkId, at: Timestamp },
    /// Transmission attempt deferred: radio locked to another sink.
    TransmitDeferred { sink: SinkId, owner: SinkId },
    /// Outbound frame handed to the radio.
    TransmitStarted { sink: SinkId },
    /// Outbound frame confirmed on air.
    TransmitComplete { sink: SinkId },
    /// Radio reconfiguration denied by the ownership lock.
    RetuneDenied { requested: SinkId, owner: SinkId },
}

/// Emitter that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTrace;

impl TraceEmitter for NullTrace {
    fn emit(&mut self, _event: TraceEvent) {}
}
