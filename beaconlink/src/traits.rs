//! Collaborator traits: radio driver, clock and indicator abstraction.
//!
//! These traits let the protocol run against different:
//! - Radio drivers (802.15.4-class hardware, simulation)
//! - Time sources (hardware tick counters, simulated time)
//! - Indicator outputs (LEDs, test recorders)
//!
//! All radio operations are asynchronous at the driver level: the driver
//! glue reports receive and transmit completions by pushing
//! [`Event`](crate::types::Event)s into the source's event channel (from an
//! ISR via `try_send`, exactly like a transport interrupt). Stopping an
//! in-flight receive completes it with no frame.

use alloc::vec::Vec;
use core::future::Future;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::time::Timestamp;
use crate::types::Event;

/// Queue size for the protocol event channel.
pub(crate) const EVENT_QUEUE_SIZE: usize = 16;

/// Mutex type used for channels.
pub(crate) type ChannelMutex = CriticalSectionRawMutex;

/// Protocol event channel fed by the radio driver glue and timers.
pub type EventChannel = Channel<ChannelMutex, Event, EVENT_QUEUE_SIZE>;

/// Radio driver trait.
///
/// The protocol only ever calls these through the
/// [`RadioArbiter`](crate::arbiter::RadioArbiter), which enforces the
/// single-owner reconfiguration rule.
pub trait Radio {
    /// Set the PAN id filter.
    fn set_pan_id(&mut self, pan: u16);

    /// Set this node's short address.
    fn set_short_addr(&mut self, addr: u16);

    /// Set the radio channel.
    fn set_channel(&mut self, channel: u8);

    /// Begin an asynchronous receive that expires at `deadline`.
    ///
    /// Completion (frame or expiry) is reported through the event channel
    /// as [`Event::RxComplete`](crate::types::Event::RxComplete).
    fn start_rx(&mut self, deadline: Timestamp);

    /// Stop an in-flight receive.
    ///
    /// The pending receive completes with no frame, which the receive
    /// handler answers by re-arming reception on the (possibly retuned)
    /// radio.
    fn stop_rx(&mut self);

    /// Issue an asynchronous transmit at maximum power, as soon as possible.
    ///
    /// Completion is reported through the event channel as
    /// [`Event::TxComplete`](crate::types::Event::TxComplete).
    fn transmit(&mut self, frame: &[u8]);
}

/// Time source trait for real or simulated ticks.
///
/// # Example (testing with MockClock, `test-support` feature)
///
/// ```ignore
/// use beaconlink::traits::test_impls::MockClock;
/// use beaconlink::traits::Clock;
/// use beaconlink::time::{Duration, Timestamp};
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now(), Timestamp::ZERO);
///
/// clock.advance(Duration::from_millis(250));
/// assert_eq!(clock.now(), Timestamp::from_millis(250));
/// ```
pub trait Clock {
    /// Future type returned by sleep_until.
    type SleepFuture<'a>: Future<Output = ()>
    where
        Self: 'a;

    /// Get the current timestamp.
    fn now(&self) -> Timestamp;

    /// Sleep until the given timestamp.
    ///
    /// For simulation, this should complete when the simulator advances
    /// time past the given timestamp.
    fn sleep_until(&self, time: Timestamp) -> Self::SleepFuture<'_>;
}

/// Binary indicator output trait.
pub trait Indicator {
    /// Switch one indicator on or off.
    fn set(&mut self, led: crate::types::Led, on: bool);
}

/// Raw bytes of one received frame, as handed over by the driver glue.
pub type RawFrame = Vec<u8>;

#[cfg(any(test, feature = "test-support"))]
pub mod test_impls {
    //! Mock implementations of traits for unit testing and simulation.
    //!
    //! Available when running tests or with the `test-support` feature
    //! enabled.

    use core::cell::{Cell, RefCell};
    use core::future::{ready, Ready};

    use alloc::vec::Vec;

    use super::*;
    use crate::time::Duration;
    use crate::types::Led;

    /// One recorded radio driver operation.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RadioOp {
        SetPanId(u16),
        SetShortAddr(u16),
        SetChannel(u8),
        StartRx(Timestamp),
        StopRx,
        Transmit(Vec<u8>),
    }

    /// Snapshot of the mock radio's configuration registers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RadioSettings {
        pub pan_id: u16,
        pub short_addr: u16,
        pub channel: u8,
    }

    /// Mock radio that records every operation.
    ///
    /// Operations are buffered behind a `RefCell` so a simulator holding a
    /// shared reference can drain them after each dispatch.
    #[derive(Default)]
    pub struct MockRadio {
        settings: Cell<RadioSettings>,
        receiving: Cell<bool>,
        ops: RefCell<Vec<RadioOp>>,
    }

    impl MockRadio {
        pub fn new() -> Self {
            Self::default()
        }

        /// Current configuration registers.
        pub fn settings(&self) -> RadioSettings {
            self.settings.get()
        }

        /// Whether a receive is currently armed.
        pub fn is_receiving(&self) -> bool {
            self.receiving.get()
        }

        /// Drain all recorded operations.
        pub fn take_ops(&self) -> Vec<RadioOp> {
            self.ops.borrow_mut().drain(..).collect()
        }

        fn record(&self, op: RadioOp) {
            self.ops.borrow_mut().push(op);
        }
    }

    impl Radio for MockRadio {
        fn set_pan_id(&mut self, pan: u16) {
            let mut s = self.settings.get();
            s.pan_id = pan;
            self.settings.set(s);
            self.record(RadioOp::SetPanId(pan));
        }

        fn set_short_addr(&mut self, addr: u16) {
            let mut s = self.settings.get();
            s.short_addr = addr;
            self.settings.set(s);
            self.record(RadioOp::SetShortAddr(addr));
        }

        fn set_channel(&mut self, channel: u8) {
            let mut s = self.settings.get();
            s.channel = channel;
            self.settings.set(s);
            self.record(RadioOp::SetChannel(channel));
        }

        fn start_rx(&mut self, deadline: Timestamp) {
            self.receiving.set(true);
            self.record(RadioOp::StartRx(deadline));
        }

        fn stop_rx(&mut self) {
            self.receiving.set(false);
            self.record(RadioOp::StopRx);
        }

        fn transmit(&mut self, frame: &[u8]) {
            self.record(RadioOp::Transmit(frame.to_vec()));
        }
    }

    /// Mock clock for testing (synchronous, time advances manually).
    #[derive(Default)]
    pub struct MockClock {
        current: Cell<Timestamp>,
    }

    impl MockClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn at(time: Timestamp) -> Self {
            Self {
                current: Cell::new(time),
            }
        }

        /// Set time to the given timestamp.
        pub fn set(&self, time: Timestamp) {
            self.current.set(time);
        }

        /// Advance time by the given duration.
        pub fn advance(&self, duration: Duration) {
            self.current.set(self.current.get() + duration);
        }
    }

    impl Clock for MockClock {
        type SleepFuture<'a> = Ready<()>;

        fn now(&self) -> Timestamp {
            self.current.get()
        }

        fn sleep_until(&self, _time: Timestamp) -> Self::SleepFuture<'_> {
            // In synchronous tests, sleep completes immediately.
            // The test code should advance time manually.
            ready(())
        }
    }

    /// Mock indicator that records transitions.
    #[derive(Default)]
    pub struct MockIndicator {
        sync_on: Cell<bool>,
        transmit_on: Cell<bool>,
        transitions: RefCell<Vec<(Led, bool)>>,
    }

    impl MockIndicator {
        pub fn new() -> Self {
            Self::default()
        }

        /// Current state of one indicator.
        pub fn is_on(&self, led: Led) -> bool {
            match led {
                Led::Sync => self.sync_on.get(),
                Led::Transmit => self.transmit_on.get(),
            }
        }

        /// Drain all recorded transitions.
        pub fn take_transitions(&self) -> Vec<(Led, bool)> {
            self.transitions.borrow_mut().drain(..).collect()
        }
    }

    impl Indicator for MockIndicator {
        fn set(&mut self, led: Led, on: bool) {
            match led {
                Led::Sync => self.sync_on.set(on),
                Led::Transmit => self.transmit_on.set(on),
            }
            self.transitions.borrow_mut().push((led, on));
        }
    }

    /// Trace emitter that collects events into a vector.
    #[derive(Default)]
    pub struct VecTrace {
        events: Vec<crate::trace::TraceEvent>,
    }

    impl VecTrace {
        pub fn new() -> Self {
            Self::default()
        }

        /// All events emitted so far.
        pub fn events(&self) -> &[crate::trace::TraceEvent] {
            &self.events
        }

        /// Drain all collected events.
        pub fn take(&mut self) -> Vec<crate::trace::TraceEvent> {
            core::mem::take(&mut self.events)
        }
    }

    impl crate::trace::TraceEmitter for VecTrace {
        fn emit(&mut self, event: crate::trace::TraceEvent) {
            self.events.push(event);
        }
    }
}
