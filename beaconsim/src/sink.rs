//! Modeled sink coordinators.
//!
//! A sink cycles through three phases: a sync phase broadcasting `n`
//! beacons with sequence values counting down `n..=1`, one beacon every
//! `t` ticks; a receive phase of length `t` opening one slot-period after
//! the final beacon; and a sleep phase of ten beacon-less periods. The
//! source's whole job is to land its frame inside the receive phase.

use beaconlink::{Duration, Frame, LinkConfig, SinkId, Timestamp, SLEEP_CYCLES};

/// Parameters of one simulated sink.
#[derive(Debug, Clone, Copy)]
pub struct SinkParams {
    /// Inter-beacon interval "t".
    pub period: Duration,
    /// Beacons per burst "n".
    pub burst_len: u8,
    /// Offset of the first beacon from simulation start.
    pub phase: Duration,
}

/// One frame heard by a sink.
#[derive(Debug, Clone)]
pub struct Reception {
    /// When the frame arrived.
    pub at: Timestamp,
    /// Whether it landed inside the receive phase.
    pub in_window: bool,
    /// Which burst cycle the sink was in (completed bursts so far).
    pub cycle: u64,
    /// The decoded frame.
    pub frame: Frame,
}

/// A simulated sink coordinator.
#[derive(Debug)]
pub struct SimSink {
    id: SinkId,
    params: SinkParams,
    next_seq: u8,
    /// Receive phase of the most recently completed burst.
    window: Option<(Timestamp, Timestamp)>,
    /// Completed bursts.
    cycle: u64,
    received: Vec<Reception>,
}

impl SimSink {
    /// Create a sink; its first beacon is due at `params.phase`.
    pub fn new(id: SinkId, params: SinkParams) -> Self {
        Self {
            id,
            params,
            next_seq: params.burst_len,
            window: None,
            cycle: 0,
            received: Vec::new(),
        }
    }

    /// This sink's index.
    pub fn id(&self) -> SinkId {
        self.id
    }

    /// This sink's parameters.
    pub fn params(&self) -> &SinkParams {
        &self.params
    }

    /// When the first beacon should be scheduled.
    pub fn first_beacon_at(&self) -> Timestamp {
        Timestamp::ZERO + self.params.phase
    }

    /// Emit the beacon due at `now`.
    ///
    /// Returns the encoded beacon and the time of the next one. After the
    /// final beacon the receive phase `[now + t, now + 2t)` opens and the
    /// next burst begins once the sleep phase has passed.
    pub fn emit(&mut self, cfg: &LinkConfig, now: Timestamp) -> (Vec<u8>, Timestamp) {
        let seq = self.next_seq;
        let t = self.params.period;

        let bytes = Frame {
            dest_pan: 0xffff,
            dest_addr: 0xffff,
            src_pan: cfg.sink_pan(self.id),
            src_addr: cfg.sink_address(self.id),
            payload: seq,
        }
        .encode_to_vec();

        let next_at = if seq > 1 {
            self.next_seq = seq - 1;
            now + t
        } else {
            self.window = Some((now + t, now + t * 2));
            self.cycle += 1;
            self.next_seq = self.params.burst_len;
            // Receive phase, then the sleep phase, then the next burst.
            now + t * (2 + SLEEP_CYCLES)
        };

        (bytes, next_at)
    }

    /// Record a frame arriving at this sink's radio.
    ///
    /// Returns whether it landed inside the current receive phase.
    pub fn receive(&mut self, frame: Frame, now: Timestamp) -> bool {
        let in_window = self
            .window
            .map(|(start, end)| now >= start && now < end)
            .unwrap_or(false);
        self.received.push(Reception {
            at: now,
            in_window,
            cycle: self.cycle,
            frame,
        });
        in_window
    }

    /// All frames heard so far.
    pub fn receptions(&self) -> &[Reception] {
        &self.received
    }

    /// Completed bursts so far.
    pub fn cycles_completed(&self) -> u64 {
        self.cycle
    }
}
