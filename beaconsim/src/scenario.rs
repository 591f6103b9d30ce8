//! Scenario builders for common simulation setups.

use beaconlink::{Duration, LinkConfig};

use crate::sim::Simulator;
use crate::sink::SinkParams;

/// Builder for a simulation scenario.
pub struct ScenarioBuilder {
    cfg: LinkConfig,
    sinks: Vec<SinkParams>,
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioBuilder {
    /// Start from the reference link configuration and no sinks.
    pub fn new() -> Self {
        Self {
            cfg: LinkConfig::default(),
            sinks: Vec::new(),
        }
    }

    /// Use a custom link configuration (its sink count is overwritten by
    /// the number of sinks added).
    pub fn with_config(mut self, cfg: LinkConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Add a sink with the given inter-beacon period, burst length and
    /// phase offset of its first beacon.
    pub fn sink(mut self, period: Duration, burst_len: u8, phase: Duration) -> Self {
        self.sinks.push(SinkParams {
            period,
            burst_len,
            phase,
        });
        self
    }

    /// Build the simulator.
    pub fn build(self) -> Simulator {
        Simulator::new(self.cfg, self.sinks).expect("scenario configuration is valid")
    }
}

/// The reference deployment: three sinks with distinct periods and burst
/// lengths, staggered phases.
pub fn reference_scenario() -> Simulator {
    ScenarioBuilder::new()
        .sink(Duration::from_ticks(250), 10, Duration::ZERO)
        .sink(Duration::from_ticks(600), 7, Duration::from_ticks(130))
        .sink(Duration::from_ticks(1000), 4, Duration::from_ticks(270))
        .build()
}
