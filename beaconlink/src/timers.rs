//! One-shot protocol alarms.
//!
//! The protocol owns a small fixed set of re-armable one-shot alarms: one
//! transmission timer per sink, the sink-selection task, the reception
//! timeout, and the in-window transmit delay. Rather than registering
//! callbacks, the main loop asks for the earliest armed deadline, sleeps
//! until it, then pops and dispatches every expired alarm; the simulator
//! does the same synchronously.

use alloc::vec;
use alloc::vec::Vec;

use crate::time::Timestamp;
use crate::types::{SinkId, TimerId};

/// The protocol's alarm slots.
///
/// Arming an already-armed alarm replaces its deadline; popping one clears
/// it. Expired alarms pop earliest-deadline first, with ties broken in a
/// fixed order (transmit delay, reception timeout, per-sink timers by
/// index, sink selection) so dispatch is deterministic.
#[derive(Debug, Clone)]
pub struct TimerSet {
    sink_tx: Vec<Option<Timestamp>>,
    select: Option<Timestamp>,
    rx_timeout: Option<Timestamp>,
    tx_delay: Option<Timestamp>,
}

impl TimerSet {
    /// Create an alarm set for `sink_count` sinks, all slots idle.
    pub fn new(sink_count: u8) -> Self {
        Self {
            sink_tx: vec![None; sink_count as usize],
            select: None,
            rx_timeout: None,
            tx_delay: None,
        }
    }

    fn slot_mut(&mut self, id: TimerId) -> &mut Option<Timestamp> {
        match id {
            TimerId::SinkTx(sink) => &mut self.sink_tx[sink.index()],
            TimerId::SinkSelect => &mut self.select,
            TimerId::RxTimeout => &mut self.rx_timeout,
            TimerId::TxDelay => &mut self.tx_delay,
        }
    }

    /// Arm an alarm at an absolute tick, replacing any pending deadline.
    pub fn arm(&mut self, id: TimerId, at: Timestamp) {
        *self.slot_mut(id) = Some(at);
    }

    /// Cancel a pending alarm. Idle slots are left alone.
    pub fn cancel(&mut self, id: TimerId) {
        *self.slot_mut(id) = None;
    }

    /// Deadline of one alarm, if armed.
    pub fn deadline(&self, id: TimerId) -> Option<Timestamp> {
        match id {
            TimerId::SinkTx(sink) => self.sink_tx[sink.index()],
            TimerId::SinkSelect => self.select,
            TimerId::RxTimeout => self.rx_timeout,
            TimerId::TxDelay => self.tx_delay,
        }
    }

    fn armed(&self) -> impl Iterator<Item = (TimerId, Timestamp)> + '_ {
        let fixed = [
            (TimerId::TxDelay, self.tx_delay),
            (TimerId::RxTimeout, self.rx_timeout),
        ]
        .into_iter()
        .filter_map(|(id, at)| at.map(|at| (id, at)));

        let sinks = self
            .sink_tx
            .iter()
            .copied()
            .enumerate()
            .filter_map(|(i, at)| at.map(|at| (TimerId::SinkTx(SinkId::new(i as u8)), at)));

        let select = self
            .select
            .map(|at| (TimerId::SinkSelect, at))
            .into_iter();

        fixed.chain(sinks).chain(select)
    }

    /// Earliest armed deadline, for the main loop's sleep target.
    pub fn next_due(&self) -> Option<Timestamp> {
        self.armed().map(|(_, at)| at).min()
    }

    /// Pop the earliest alarm with a deadline at or before `now`.
    ///
    /// Returns `None` when nothing has expired. Callers loop until then so
    /// a single wake-up drains every alarm that came due while busy.
    pub fn pop_due(&mut self, now: Timestamp) -> Option<TimerId> {
        let mut due: Option<(TimerId, Timestamp)> = None;
        for (id, at) in self.armed() {
            if at > now {
                continue;
            }
            // Strictly-earlier wins, so equal deadlines keep scan order.
            match due {
                Some((_, best)) if best <= at => {}
                _ => due = Some((id, at)),
            }
        }

        let (id, _) = due?;
        self.cancel(id);
        Some(id)
    }
}
