//! Radio arbitration: one radio, one owner at a time.
//!
//! The radio is the only genuinely shared resource in the protocol. Three
//! per-sink transmission timelines and the estimation listen all want it,
//! so every channel change funnels through [`RadioArbiter::reconfigure`],
//! which is a silent no-op unless the caller's sink owns the radio or no
//! one does. Acquire and release are the only mutation points of the
//! ownership token; there is no queueing, a contending scheduler simply
//! reschedules itself.

use crate::config::LinkConfig;
use crate::time::Timestamp;
use crate::traits::Radio;
use crate::types::{SinkId, RX_HORIZON};

/// Owner of the physical radio plus its single-writer lock.
pub struct RadioArbiter<R> {
    radio: R,
    owner: Option<SinkId>,
}

impl<R: Radio> RadioArbiter<R> {
    /// Wrap a radio driver with an unlocked arbiter.
    pub fn new(radio: R) -> Self {
        Self { radio, owner: None }
    }

    /// Current lock owner, if any.
    pub fn owner(&self) -> Option<SinkId> {
        self.owner
    }

    /// Whether `sink` may currently reconfigure the radio.
    pub fn permits(&self, sink: SinkId) -> bool {
        match self.owner {
            None => true,
            Some(owner) => owner == sink,
        }
    }

    /// Take the lock for `sink`.
    ///
    /// Succeeds when the lock is free or already held by `sink`; a lock
    /// held by another sink is never stolen.
    pub fn acquire(&mut self, sink: SinkId) -> bool {
        if self.permits(sink) {
            self.owner = Some(sink);
            true
        } else {
            false
        }
    }

    /// Release the lock unconditionally.
    ///
    /// Called only from transmit completion, where the in-flight owner is
    /// by definition done with the radio.
    pub fn release(&mut self) {
        self.owner = None;
    }

    /// Retune the radio to one sink's PAN, address filter and channel.
    ///
    /// Permitted only when the lock is free or held by `sink`; otherwise
    /// nothing happens and `false` is returned, so a non-owning caller
    /// skips the channel change without disturbing the in-flight owner.
    /// When permitted, any receive in flight is stopped first; its empty
    /// completion re-arms reception on the new settings.
    pub fn reconfigure(&mut self, cfg: &LinkConfig, sink: SinkId) -> bool {
        if !self.permits(sink) {
            return false;
        }
        self.radio.stop_rx();
        self.radio.set_pan_id(cfg.sink_pan(sink));
        self.radio.set_short_addr(cfg.source_address);
        self.radio.set_channel(cfg.sink_channel(sink));
        true
    }

    /// Arm reception with the generous session-length deadline.
    pub fn start_rx(&mut self, now: Timestamp) {
        self.radio.start_rx(now + RX_HORIZON);
    }

    /// Hand an encoded frame to the radio for asynchronous transmission.
    pub fn transmit(&mut self, frame: &[u8]) {
        self.radio.transmit(frame);
    }

    /// Stop reception, e.g. on shutdown.
    pub fn stop_rx(&mut self) {
        self.radio.stop_rx();
    }

    /// Access the underlying driver.
    pub fn radio(&self) -> &R {
        &self.radio
    }
}
