//! Discrete event simulator for the beaconlink protocol.
//!
//! The simulator owns one source (driven synchronously through its public
//! handlers, with mock collaborators standing in for hardware) and a set of
//! modeled sinks. Radio physics are reduced to what the protocol can
//! observe: a beacon reaches the source only while its radio is tuned to
//! that sink's channel and PAN with a receive pending and no transmission
//! in flight; an outbound frame reaches whichever sink owns the channel the
//! radio is on when it leaves the air.

use std::collections::BinaryHeap;

use beaconlink::traits::test_impls::{MockClock, MockIndicator, MockRadio, RadioOp, VecTrace};
use beaconlink::{ConfigError, Duration, Event, Frame, LinkConfig, SinkId, Source, Timestamp};

use crate::event::{ScheduledEvent, SequenceNumber, SimEvent};
use crate::metrics::{SimMetrics, SimulationResult};
use crate::sink::{SimSink, SinkParams};

/// The source type driven by the simulator: mock radio, manual clock,
/// recorded indicators, collected trace.
pub type SimSource = Source<MockRadio, MockClock, MockIndicator, VecTrace>;

/// Ticks a frame spends on the air before its completion is reported.
pub const TX_AIRTIME: Duration = Duration::from_ticks(2);

/// Discrete event simulator for one source and its sinks.
pub struct Simulator {
    cfg: LinkConfig,
    source: SimSource,
    sinks: Vec<SimSink>,
    /// Current simulation time.
    current_time: Timestamp,
    /// Priority queue of scheduled events.
    event_queue: BinaryHeap<ScheduledEvent>,
    /// Next sequence number for event ordering.
    next_seq: u64,
    /// Collected metrics.
    metrics: SimMetrics,
    /// Receive session counter; stale lapse events are discarded by it.
    rx_epoch: u64,
    /// Whether the source has a receive pending.
    rx_pending: bool,
    /// Frame currently on the air, if any.
    tx_in_flight: Option<Vec<u8>>,
    /// Earliest source-timer wakeup currently scheduled.
    pending_timer: Option<Timestamp>,
}

impl Simulator {
    /// Create a simulator: one source configured for `params.len()` sinks,
    /// initialized at time zero with every sink's first beacon scheduled.
    pub fn new(mut cfg: LinkConfig, params: Vec<SinkParams>) -> Result<Self, ConfigError> {
        cfg.sink_count = params.len() as u8;
        let source = Source::new(
            cfg.clone(),
            MockRadio::new(),
            MockClock::new(),
            MockIndicator::new(),
            VecTrace::new(),
        )?;
        let sinks = params
            .into_iter()
            .enumerate()
            .map(|(i, p)| SimSink::new(SinkId::new(i as u8), p))
            .collect();

        let mut sim = Self {
            cfg,
            source,
            sinks,
            current_time: Timestamp::ZERO,
            event_queue: BinaryHeap::new(),
            next_seq: 0,
            metrics: SimMetrics::new(),
            rx_epoch: 0,
            rx_pending: false,
            tx_in_flight: None,
            pending_timer: None,
        };
        sim.start();
        Ok(sim)
    }

    fn start(&mut self) {
        let now = self.current_time;
        self.source.clock().set(now);
        self.source.initialize(now);
        self.after_source(now);

        for i in 0..self.sinks.len() {
            let at = self.sinks[i].first_beacon_at();
            let sink = self.sinks[i].id();
            self.schedule(at, SimEvent::SinkBeacon { sink });
        }
    }

    /// The simulated source.
    pub fn source(&self) -> &SimSource {
        &self.source
    }

    /// Mutable access to the simulated source (e.g. draining its trace).
    pub fn source_mut(&mut self) -> &mut SimSource {
        &mut self.source
    }

    /// One simulated sink.
    pub fn sink(&self, sink: SinkId) -> &SimSink {
        &self.sinks[sink.index()]
    }

    /// All simulated sinks.
    pub fn sinks(&self) -> &[SimSink] {
        &self.sinks
    }

    /// The link configuration in force.
    pub fn config(&self) -> &LinkConfig {
        &self.cfg
    }

    /// Current simulation time.
    pub fn current_time(&self) -> Timestamp {
        self.current_time
    }

    /// Collected metrics.
    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    /// Schedule an event.
    fn schedule(&mut self, time: Timestamp, event: SimEvent) {
        let seq = SequenceNumber::new(self.next_seq);
        self.next_seq += 1;
        self.event_queue.push(ScheduledEvent::new(time, seq, event));
    }

    /// Run simulation until the specified time.
    pub fn run_until(&mut self, end_time: Timestamp) -> SimulationResult {
        while let Some(event) = self.event_queue.peek() {
            if event.time > end_time {
                break;
            }

            let event = match self.event_queue.pop() {
                Some(event) => event,
                None => break,
            };
            self.advance_time(event.time);
            self.process_event(event.event);
        }

        // Advance to end_time even if no more events
        self.advance_time(end_time);

        SimulationResult {
            end_time: self.current_time,
            metrics: self.metrics.clone(),
            queue_exhausted: self.event_queue.peek().is_none(),
        }
    }

    /// Run simulation for the specified duration.
    pub fn run_for(&mut self, duration: Duration) -> SimulationResult {
        self.run_until(self.current_time + duration)
    }

    /// Advance simulation time.
    fn advance_time(&mut self, time: Timestamp) {
        if time > self.current_time {
            self.current_time = time;
        }
    }

    /// Process a single event.
    fn process_event(&mut self, event: SimEvent) {
        match event {
            SimEvent::SinkBeacon { sink } => self.sink_beacon(sink),
            SimEvent::RxLapse { epoch } => self.rx_lapse(epoch),
            SimEvent::TxAirDone => self.tx_air_done(),
            SimEvent::SourceTimer => self.source_timer(),
        }
    }

    /// A sink emits its next beacon.
    fn sink_beacon(&mut self, sink: SinkId) {
        let now = self.current_time;
        let (bytes, next_at) = self.sinks[sink.index()].emit(&self.cfg, now);
        self.metrics.beacons_emitted += 1;
        self.metrics.sink_mut(sink).beacons_emitted += 1;
        self.schedule(next_at, SimEvent::SinkBeacon { sink });

        let settings = self.source.radio().settings();
        let tuned = settings.channel == self.cfg.sink_channel(sink)
            && settings.pan_id == self.cfg.sink_pan(sink);

        if tuned && self.rx_pending && self.tx_in_flight.is_none() {
            self.metrics.beacons_delivered += 1;
            self.dispatch_source(Event::RxComplete { frame: Some(bytes) }, now);
        } else {
            self.metrics.beacons_unheard += 1;
        }
    }

    /// A receive session ends without a frame.
    fn rx_lapse(&mut self, epoch: u64) {
        if epoch != self.rx_epoch {
            return; // A newer session replaced this one.
        }
        self.rx_pending = false;
        let now = self.current_time;
        self.dispatch_source(Event::RxComplete { frame: None }, now);
    }

    /// The in-flight frame leaves the air: deliver it to whichever sink
    /// owns the channel the radio is tuned to, then report completion.
    fn tx_air_done(&mut self) {
        let now = self.current_time;
        let bytes = match self.tx_in_flight.take() {
            Some(bytes) => bytes,
            None => return,
        };

        let channel = self.source.radio().settings().channel;
        if let Ok(frame) = Frame::decode_from_slice(&bytes) {
            let target = (0..self.sinks.len())
                .find(|&i| self.cfg.sink_channel(self.sinks[i].id()) == channel);
            if let Some(i) = target {
                let id = self.sinks[i].id();
                let in_window = self.sinks[i].receive(frame, now);
                let stats = self.metrics.sink_mut(id);
                if in_window {
                    stats.frames_in_window += 1;
                } else {
                    stats.frames_out_window += 1;
                }
            }
        }

        self.dispatch_source(Event::TxComplete { sent: true }, now);
    }

    /// The source's earliest alarm may have expired.
    fn source_timer(&mut self) {
        self.pending_timer = None;
        let now = self.current_time;
        self.source.clock().set(now);
        self.source.poll_timers(now);
        self.after_source(now);
    }

    /// Hand one event to the source and absorb its reactions.
    fn dispatch_source(&mut self, event: Event, now: Timestamp) {
        self.source.clock().set(now);
        self.source.dispatch(event, now);
        self.after_source(now);
    }

    /// Materialize the radio operations the source just issued and keep a
    /// timer wakeup scheduled at its earliest alarm.
    fn after_source(&mut self, now: Timestamp) {
        for op in self.source.radio().take_ops() {
            match op {
                RadioOp::StartRx(deadline) => {
                    self.rx_epoch += 1;
                    self.rx_pending = true;
                    let epoch = self.rx_epoch;
                    self.schedule(deadline, SimEvent::RxLapse { epoch });
                }
                RadioOp::StopRx => {
                    // Stopping a pending receive completes it empty; the
                    // source answers by re-arming on the new settings.
                    if self.rx_pending {
                        self.rx_pending = false;
                        let epoch = self.rx_epoch;
                        self.schedule(now, SimEvent::RxLapse { epoch });
                    }
                }
                RadioOp::Transmit(bytes) => {
                    self.metrics.frames_transmitted += 1;
                    self.tx_in_flight = Some(bytes);
                    self.schedule(now + TX_AIRTIME, SimEvent::TxAirDone);
                }
                RadioOp::SetPanId(_) | RadioOp::SetShortAddr(_) | RadioOp::SetChannel(_) => {
                    // Settings live in the mock radio itself.
                }
            }
        }

        if let Some(due) = self.source.next_timer_due() {
            let due = due.max(self.current_time);
            let earlier = self.pending_timer.map_or(true, |p| due < p);
            if earlier {
                self.schedule(due, SimEvent::SourceTimer);
                self.pending_timer = Some(due);
            }
        }
    }
}
