//! Receive-side state machine: beacon interpretation.
//!
//! Every receive completion lands here. A beacon is interpreted according
//! to the current mode: while a sink's period is still unknown it feeds the
//! estimator; while a transmission is being lined up it synchronizes the
//! send to the burst's final beacon; otherwise it is ignored. The radio
//! lock shadows beacons from non-owning sinks entirely - an in-progress
//! exchange with one sink costs at most one missed cycle elsewhere.

use crate::time::Timestamp;
use crate::trace::{TraceEmitter, TraceEvent};
use crate::traits::{Clock, Indicator, Radio, RawFrame};
use crate::types::{
    Led, SinkId, TimerId, LAST_BEACON_SEQ, MAX_BURST_LEN, MAX_INTER_BEACON, MIN_INTER_BEACON,
};
use crate::wire::Frame;

use crate::source::Source;

impl<R, C, I, E> Source<R, C, I, E>
where
    R: Radio,
    C: Clock,
    I: Indicator,
    E: TraceEmitter,
{
    /// Handle a receive completion.
    ///
    /// A completion without a frame is the driver reporting expiry or an
    /// explicit stop; reception is re-armed and nothing else changes.
    pub fn handle_rx_complete(&mut self, frame: Option<RawFrame>, now: Timestamp) {
        let bytes = match frame {
            Some(bytes) => bytes,
            None => {
                self.arbiter.start_rx(now);
                return;
            }
        };

        let frame = match Frame::decode_from_slice(&bytes) {
            Ok(frame) => frame,
            Err(_) => {
                self.trace.emit(TraceEvent::FrameTooShort { len: bytes.len() });
                return;
            }
        };

        // The radio can hear this node's own transmissions.
        if frame.src_addr == self.cfg.source_address {
            self.trace.emit(TraceEvent::OwnFrameIgnored);
            return;
        }

        let sink = match self.cfg.sink_index(frame.src_addr) {
            Some(sink) => sink,
            None => {
                self.trace.emit(TraceEvent::InvalidSender {
                    address: frame.src_addr,
                });
                return;
            }
        };

        let seq = frame.payload;
        if seq < LAST_BEACON_SEQ || seq as usize > MAX_BURST_LEN {
            self.trace.emit(TraceEvent::BadSequence { sink, seq });
            return;
        }

        // Track the burst length "n" across cycles. The previous maximum is
        // kept so a repeat of the same maximum can confirm it.
        let state = &mut self.sinks[sink.index()];
        if seq > state.max_seen_n {
            state.prev_max_seen_n = state.max_seen_n;
            state.max_seen_n = seq;
        }
        state.last_beacon = Some(now);

        self.trace.emit(TraceEvent::BeaconSeen { sink, seq, at: now });

        // An exchange locked to another sink takes priority; this beacon is
        // simply missed for the cycle.
        if let Some(owner) = self.arbiter.owner() {
            if owner != sink {
                self.trace.emit(TraceEvent::BeaconMasked { sink, owner });
                return;
            }
        }

        if !self.transmitting && self.sinks[sink.index()].period.is_none() {
            self.handle_estimation_beacon(seq, sink, now);
        } else if self.transmitting {
            self.handle_transmit_sync(seq, sink, now);
        }
        // Otherwise: estimation already concluded for this sink and no send
        // is being lined up - nothing to do with this beacon.
    }

    /// Estimation path: feed the history and decide whether the burst's
    /// final beacon completes an estimate.
    pub(crate) fn handle_estimation_beacon(&mut self, seq: u8, sink: SinkId, now: Timestamp) {
        let state = &mut self.sinks[sink.index()];
        state.history.record(seq, now);
        let estimate = state.history.estimate();

        if seq == LAST_BEACON_SEQ {
            let period = match estimate {
                Some(period) => period,
                // Last beacon but still no estimate: stay listening and let
                // the reception timeout drive recovery.
                None => return,
            };

            self.sinks[sink.index()].period = Some(period);
            self.trace.emit(TraceEvent::EstimateCommitted { sink, period });

            // The listen concluded cleanly; a stale timeout must not fire
            // against the new state.
            self.timers.cancel(TimerId::RxTimeout);
            self.listening_to = None;

            // Claim the radio and line up the send for this very window.
            self.arbiter.acquire(sink);
            self.handle_transmit_sync(seq, sink, now);

            // Give this sink a full cycle before estimation attention moves
            // on to the next unknown sink.
            self.timers.arm(TimerId::SinkSelect, now + period * 2);
        } else {
            // Mid-burst: push the stall detector out past the next expected
            // beacon, twice over so a single miss cannot trip it.
            let window = estimate.unwrap_or(MAX_INTER_BEACON) * 2;
            self.timers.arm(TimerId::RxTimeout, now + window);
        }
    }

    /// Transmit-sync path: anchor the pending send to the burst's final
    /// beacon and keep the following cycle scheduled.
    pub(crate) fn handle_transmit_sync(&mut self, seq: u8, sink: SinkId, now: Timestamp) {
        self.indicator.set(Led::Sync, true);

        if seq == LAST_BEACON_SEQ {
            self.frame.retarget(&self.cfg, sink);

            // One more period closes out the final beacon slot; half the
            // minimum interval then lands the send inside the receive
            // window with margin against jitter on both sides.
            let delay = self.period_or_fallback(sink) + MIN_INTER_BEACON / 2;
            let at = now + delay;
            self.timers.arm(TimerId::TxDelay, at);
            self.trace.emit(TraceEvent::TransmitWindow { sink, at });

            self.indicator.set(Led::Transmit, true);
            self.indicator.set(Led::Sync, false);
        }

        self.schedule_next(sink, now);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::config::LinkConfig;
    use crate::time::Duration;
    use crate::trace::NullTrace;
    use crate::traits::test_impls::{MockClock, MockIndicator, MockRadio, VecTrace};
    use crate::types::MAX_INTER_BEACON;
    use crate::wire::Frame;

    type TestSource<E = NullTrace> = Source<MockRadio, MockClock, MockIndicator, E>;

    fn source() -> TestSource {
        Source::new(
            LinkConfig::default(),
            MockRadio::new(),
            MockClock::new(),
            MockIndicator::new(),
            NullTrace,
        )
        .unwrap()
    }

    fn traced_source() -> TestSource<VecTrace> {
        Source::new(
            LinkConfig::default(),
            MockRadio::new(),
            MockClock::new(),
            MockIndicator::new(),
            VecTrace::new(),
        )
        .unwrap()
    }

    fn beacon(cfg: &LinkConfig, sink: SinkId, seq: u8) -> RawFrame {
        Frame {
            dest_pan: cfg.sink_pan(sink),
            dest_addr: 0xffff,
            src_pan: cfg.sink_pan(sink),
            src_addr: cfg.sink_address(sink),
            payload: seq,
        }
        .encode_to_vec()
    }

    fn t(ticks: u64) -> Timestamp {
        Timestamp::from_ticks(ticks)
    }

    #[test]
    fn test_empty_completion_rearms_reception() {
        let mut src = source();
        src.handle_rx_complete(None, t(100));
        assert!(src.radio().is_receiving());
    }

    #[test]
    fn test_short_frame_changes_nothing() {
        let mut src = traced_source();
        src.handle_rx_complete(Some(vec![0u8; 5]), t(100));
        assert_eq!(
            src.trace().events(),
            &[TraceEvent::FrameTooShort { len: 5 }]
        );
        let a = SinkId::new(0);
        assert_eq!(src.last_beacon_at(a), None);
    }

    #[test]
    fn test_invalid_sender_rejected() {
        let mut src = traced_source();
        let cfg = src.config().clone();
        let mut bytes = beacon(&cfg, SinkId::new(0), 3);
        // Rewrite the source address to just past the sink block.
        bytes[9] = 0x14;
        src.handle_rx_complete(Some(bytes), t(100));
        assert_eq!(
            src.trace().events(),
            &[TraceEvent::InvalidSender { address: 0x14 }]
        );
    }

    #[test]
    fn test_own_transmission_ignored() {
        let mut src = traced_source();
        let cfg = src.config().clone();
        let mut bytes = beacon(&cfg, SinkId::new(0), 3);
        bytes[9] = 0x42;
        src.handle_rx_complete(Some(bytes), t(100));
        assert_eq!(src.trace().events(), &[TraceEvent::OwnFrameIgnored]);
    }

    #[test]
    fn test_full_burst_commits_estimate_and_schedules_send() {
        let mut src = source();
        let cfg = src.config().clone();
        let a = SinkId::new(0);
        src.initialize(t(0));
        src.listening_to = Some(a);

        // Burst of 10 beacons, 250 ticks apart.
        let mut at = t(1000);
        for seq in (1..=10u8).rev() {
            src.handle_rx_complete(Some(beacon(&cfg, a, seq)), at);
            at += Duration::from_ticks(250);
        }
        let last_at = t(1000 + 9 * 250);

        assert_eq!(src.period(a), Some(Duration::from_ticks(250)));
        assert_eq!(src.lock_owner(), Some(a));
        assert_eq!(src.listening_to(), None);
        assert_eq!(src.burst_len(a), 10);
        // Send placed one period plus half the minimum interval after the
        // final beacon.
        assert_eq!(
            src.timers.deadline(TimerId::TxDelay),
            Some(last_at + Duration::from_ticks(250 + 125))
        );
        // The following cycle is already scheduled.
        assert!(src.next_transmit_at(a).is_some());
        // The stall detector was cancelled by the clean conclusion.
        assert_eq!(src.timers.deadline(TimerId::RxTimeout), None);
    }

    #[test]
    fn test_mid_burst_arms_reception_timeout() {
        let mut src = source();
        let cfg = src.config().clone();
        let a = SinkId::new(0);
        src.listening_to = Some(a);

        src.handle_rx_complete(Some(beacon(&cfg, a, 10)), t(1000));
        // One sample: no estimate yet, fallback window applies.
        assert_eq!(
            src.timers.deadline(TimerId::RxTimeout),
            Some(t(1000) + MAX_INTER_BEACON * 2)
        );

        src.handle_rx_complete(Some(beacon(&cfg, a, 9)), t(1250));
        // Two samples: the window now tracks the measured gap.
        assert_eq!(
            src.timers.deadline(TimerId::RxTimeout),
            Some(t(1250) + Duration::from_ticks(500))
        );
    }

    #[test]
    fn test_last_beacon_without_estimate_keeps_listening() {
        let mut src = source();
        let cfg = src.config().clone();
        let a = SinkId::new(0);
        src.listening_to = Some(a);

        // Only the final beacon arrives: not enough to estimate.
        src.handle_rx_complete(Some(beacon(&cfg, a, 1)), t(1000));
        assert_eq!(src.period(a), None);
        assert_eq!(src.listening_to(), Some(a));
        assert_eq!(src.lock_owner(), None);
    }

    #[test]
    fn test_lock_masks_other_sinks() {
        let mut src = traced_source();
        let cfg = src.config().clone();
        let a = SinkId::new(0);
        let b = SinkId::new(1);
        src.arbiter.acquire(a);

        src.handle_rx_complete(Some(beacon(&cfg, b, 4)), t(1000));
        // Arrival bookkeeping still happens, interpretation does not.
        assert_eq!(src.last_beacon_at(b), Some(t(1000)));
        assert_eq!(src.burst_len(b), 4);
        assert!(src
            .trace()
            .events()
            .contains(&TraceEvent::BeaconMasked { sink: b, owner: a }));
        assert_eq!(src.period(b), None);
        assert_eq!(src.timers.deadline(TimerId::RxTimeout), None);
    }

    #[test]
    fn test_transmit_sync_anchors_on_last_beacon() {
        let mut src = source();
        let cfg = src.config().clone();
        let b = SinkId::new(1);
        src.sinks[b.index()].period = Some(Duration::from_ticks(400));
        src.arbiter.acquire(b);
        src.transmitting = true;

        src.handle_rx_complete(Some(beacon(&cfg, b, 3)), t(5000));
        // Not the final beacon: only the next cycle gets scheduled.
        assert_eq!(src.timers.deadline(TimerId::TxDelay), None);
        assert!(src.next_transmit_at(b).is_some());

        src.handle_rx_complete(Some(beacon(&cfg, b, 1)), t(5800));
        assert_eq!(
            src.timers.deadline(TimerId::TxDelay),
            Some(t(5800) + Duration::from_ticks(400 + 125))
        );
        // The outbound frame now points at sink B.
        assert_eq!(src.frame.dest_pan, cfg.sink_pan(b));
        assert_eq!(src.frame.dest_addr, cfg.sink_address(b));
        assert!(src.indicator().is_on(Led::Transmit));
        assert!(!src.indicator().is_on(Led::Sync));
    }

    #[test]
    fn test_estimated_sink_beacons_ignored_when_idle() {
        let mut src = source();
        let cfg = src.config().clone();
        let a = SinkId::new(0);
        src.sinks[a.index()].period = Some(Duration::from_ticks(250));

        src.handle_rx_complete(Some(beacon(&cfg, a, 5)), t(9000));
        // Bookkeeping only: no timers armed, no lock taken.
        assert_eq!(src.last_beacon_at(a), Some(t(9000)));
        assert_eq!(src.lock_owner(), None);
        assert_eq!(src.timers.deadline(TimerId::TxDelay), None);
        assert_eq!(src.timers.deadline(TimerId::RxTimeout), None);
    }
}
