//! Metrics collected during simulation.

use beaconlink::{SinkId, Timestamp};
use hashbrown::HashMap;

/// Per-sink delivery counters.
#[derive(Debug, Clone, Default)]
pub struct SinkStats {
    /// Beacons this sink put on the air.
    pub beacons_emitted: u64,
    /// Source frames that landed inside the receive phase.
    pub frames_in_window: u64,
    /// Source frames that arrived outside the receive phase.
    pub frames_out_window: u64,
}

/// Counters accumulated over a simulation run.
#[derive(Debug, Clone, Default)]
pub struct SimMetrics {
    /// Beacons emitted across all sinks.
    pub beacons_emitted: u64,
    /// Beacons the source's radio actually heard.
    pub beacons_delivered: u64,
    /// Beacons lost to tuning, an idle receiver, or an in-flight transmit.
    pub beacons_unheard: u64,
    /// Frames the source handed to its radio.
    pub frames_transmitted: u64,
    /// Per-sink breakdown, keyed by sink index.
    per_sink: HashMap<u8, SinkStats>,
}

impl SimMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters for one sink (zeroed if never touched).
    pub fn sink(&self, sink: SinkId) -> SinkStats {
        self.per_sink.get(&sink.raw()).cloned().unwrap_or_default()
    }

    pub(crate) fn sink_mut(&mut self, sink: SinkId) -> &mut SinkStats {
        self.per_sink.entry(sink.raw()).or_default()
    }

    /// Frames landed in-window across all sinks.
    pub fn total_in_window(&self) -> u64 {
        self.per_sink.values().map(|s| s.frames_in_window).sum()
    }
}

/// Outcome of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Simulated time when the run stopped.
    pub end_time: Timestamp,
    /// Counters accumulated up to that point.
    pub metrics: SimMetrics,
    /// Whether the event queue ran dry before the end time.
    pub queue_exhausted: bool,
}
