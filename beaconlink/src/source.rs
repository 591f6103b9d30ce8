//! Source implementation - the protocol state machine hub.
//!
//! The [`Source`] struct owns all protocol state and is driven entirely by
//! events: radio receive/transmit completions pushed into its event channel
//! by the driver glue, and its own one-shot alarms. Every handler takes
//! `&mut self` and the current time explicitly and runs to completion, so
//! there is no internal concurrency to coordinate; the async [`run`] loop
//! merely serializes event arrival with timer expiry.
//!
//! # Usage
//!
//! ```ignore
//! let mut source = Source::new(LinkConfig::default(), radio, clock, leds, NullTrace)?;
//!
//! // Spawn the protocol loop; the radio ISR glue pushes completions into
//! // source.events().
//! spawn(async move {
//!     source.run().await;
//! });
//! ```
//!
//! [`run`]: Source::run

use alloc::vec;
use alloc::vec::Vec;

use crate::arbiter::RadioArbiter;
use crate::config::{ConfigError, LinkConfig};
use crate::history::BeaconHistory;
use crate::time::{Duration, Timestamp};
use crate::timers::TimerSet;
use crate::trace::TraceEmitter;
use crate::traits::{Clock, EventChannel, Indicator, Radio};
use crate::types::{Event, Led, SinkId, TimerId, MAX_INTER_BEACON, STARTUP_SETTLE};
use crate::wire::Frame;

/// Everything the protocol tracks about one sink.
#[derive(Debug, Clone, Default)]
pub(crate) struct SinkState {
    /// Arrival ticks of the current/most recent burst, by sequence slot.
    pub history: BeaconHistory,
    /// Committed inter-beacon period estimate, or unknown.
    pub period: Option<Duration>,
    /// Highest burst sequence value seen in the current cycle.
    pub max_seen_n: u8,
    /// The maximum observed immediately before `max_seen_n`; equality of
    /// the two signals that the burst length has stabilized.
    pub prev_max_seen_n: u8,
    /// Arrival tick of the most recent beacon, the recovery anchor.
    pub last_beacon: Option<Timestamp>,
    /// Absolute tick of the next scheduled transmission attempt.
    pub next_tx_at: Option<Timestamp>,
}

/// The source node protocol state machine.
///
/// Generic over:
/// - `R`: Radio driver implementation
/// - `C`: Clock/timer implementation
/// - `I`: Indicator output implementation
/// - `E`: Trace emitter implementation
pub struct Source<R, C, I, E> {
    // Dependencies (injected)
    pub(crate) arbiter: RadioArbiter<R>,
    pub(crate) clock: C,
    pub(crate) indicator: I,
    pub(crate) trace: E,

    // Driver glue pushes completions here
    events: EventChannel,

    // Configuration
    pub(crate) cfg: LinkConfig,

    // Per-sink state
    pub(crate) sinks: Vec<SinkState>,

    // Alarms
    pub(crate) timers: TimerSet,

    // Global mode flags
    pub(crate) estimation_done: bool,
    pub(crate) listening_to: Option<SinkId>,
    pub(crate) transmitting: bool,

    // Reusable outbound frame; destination overwritten per sink
    pub(crate) frame: Frame,
}

impl<R, C, I, E> Source<R, C, I, E>
where
    R: Radio,
    C: Clock,
    I: Indicator,
    E: TraceEmitter,
{
    /// Create a source for a validated configuration.
    pub fn new(
        cfg: LinkConfig,
        radio: R,
        clock: C,
        indicator: I,
        trace: E,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;

        let frame = Frame::outbound(&cfg);
        let sinks = vec![SinkState::default(); cfg.sink_count as usize];
        let timers = TimerSet::new(cfg.sink_count);

        Ok(Self {
            arbiter: RadioArbiter::new(radio),
            clock,
            indicator,
            trace,
            events: EventChannel::new(),
            cfg,
            sinks,
            timers,
            estimation_done: false,
            listening_to: None,
            transmitting: false,
            frame,
        })
    }

    /// Tune to the first sink, start listening and arm the first
    /// sink-selection pass after the power-up settle delay.
    pub fn initialize(&mut self, now: Timestamp) {
        self.arbiter.reconfigure(&self.cfg, SinkId::new(0));
        self.arbiter.start_rx(now);
        self.timers.arm(TimerId::SinkSelect, now + STARTUP_SETTLE);
    }

    /// Stop receiving and drop any radio claim. The only teardown path.
    pub fn shutdown(&mut self) {
        self.arbiter.stop_rx();
        self.arbiter.release();
        self.transmitting = false;
        self.indicator.set(Led::Sync, false);
        self.indicator.set(Led::Transmit, false);
    }

    /// Consume one protocol event. The single dispatch point.
    pub fn dispatch(&mut self, event: Event, now: Timestamp) {
        match event {
            Event::RxComplete { frame } => self.handle_rx_complete(frame, now),
            Event::TxComplete { sent } => self.handle_tx_complete(sent, now),
            Event::Timer(id) => self.handle_timer(id, now),
        }
    }

    /// Dispatch one expired alarm.
    pub fn handle_timer(&mut self, id: TimerId, now: Timestamp) {
        match id {
            TimerId::SinkTx(sink) => self.handle_sink_timer(sink, now),
            TimerId::SinkSelect => self.handle_sink_select(now),
            TimerId::RxTimeout => self.handle_rx_timeout(now),
            TimerId::TxDelay => self.handle_tx_delay(now),
        }
    }

    /// Earliest pending alarm deadline, for external loop drivers.
    pub fn next_timer_due(&self) -> Option<Timestamp> {
        self.timers.next_due()
    }

    /// Fire every alarm that has expired by `now`, earliest first.
    pub fn poll_timers(&mut self, now: Timestamp) {
        while let Some(id) = self.timers.pop_due(now) {
            self.handle_timer(id, now);
        }
    }

    /// Run the protocol loop.
    ///
    /// Fully event-driven and runs forever: sleeps until the earliest armed
    /// alarm, waking early whenever the driver glue delivers a completion.
    /// Call this from an async task/executor; the simulator bypasses it and
    /// drives the handlers synchronously instead.
    pub async fn run(&mut self) -> ! {
        use embassy_futures::select::{select, Either};

        let now = self.clock.now();
        self.initialize(now);

        loop {
            let wake = match self.timers.next_due() {
                Some(at) => at,
                // Nothing armed: idle heartbeat.
                None => self.clock.now() + Duration::from_secs(60),
            };

            let result = select(self.events.receive(), self.clock.sleep_until(wake)).await;

            let now = self.clock.now();
            match result {
                Either::First(event) => self.dispatch(event, now),
                Either::Second(()) => self.poll_timers(now),
            }
        }
    }

    /// Channel the radio driver glue pushes completions into.
    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    /// This source's configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.cfg
    }

    /// Committed period estimate for a sink, or unknown.
    pub fn period(&self, sink: SinkId) -> Option<Duration> {
        self.sinks[sink.index()].period
    }

    /// Period estimate with the conservative fallback substituted.
    pub(crate) fn period_or_fallback(&self, sink: SinkId) -> Duration {
        self.sinks[sink.index()].period.unwrap_or(MAX_INTER_BEACON)
    }

    /// Next scheduled transmission attempt for a sink.
    pub fn next_transmit_at(&self, sink: SinkId) -> Option<Timestamp> {
        self.sinks[sink.index()].next_tx_at
    }

    /// Arrival tick of the most recent beacon from a sink.
    pub fn last_beacon_at(&self, sink: SinkId) -> Option<Timestamp> {
        self.sinks[sink.index()].last_beacon
    }

    /// Highest burst sequence value observed from a sink.
    pub fn burst_len(&self, sink: SinkId) -> u8 {
        self.sinks[sink.index()].max_seen_n
    }

    /// Whether every sink has produced an estimate. Monotonic.
    pub fn estimation_done(&self) -> bool {
        self.estimation_done
    }

    /// The sink currently being listened to for estimation, if any.
    pub fn listening_to(&self) -> Option<SinkId> {
        self.listening_to
    }

    /// Whether a send is in flight or imminent.
    pub fn is_transmitting(&self) -> bool {
        self.transmitting
    }

    /// Current radio lock owner, if any.
    pub fn lock_owner(&self) -> Option<SinkId> {
        self.arbiter.owner()
    }

    /// Access the radio driver.
    pub fn radio(&self) -> &R {
        self.arbiter.radio()
    }

    /// Access the clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Access the indicator output.
    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    /// Access the trace emitter.
    pub fn trace(&self) -> &E {
        &self.trace
    }

    /// Mutable access to the trace emitter (draining collected events).
    pub fn trace_mut(&mut self) -> &mut E {
        &mut self.trace
    }
}
