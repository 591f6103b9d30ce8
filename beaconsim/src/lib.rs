//! beaconsim - discrete event simulator for the beaconlink protocol.
//!
//! Drives a [`beaconlink::Source`] through simulated time against modeled
//! sink coordinators, with deterministic event ordering. The simulator
//! reduces radio physics to what the protocol can observe: channel tuning,
//! pending receives, and airtime. Used for end-to-end protocol tests that
//! would be impractical against real hardware.
//!
//! # Example
//!
//! ```
//! use beaconlink::{Duration, SinkId};
//! use beaconsim::ScenarioBuilder;
//!
//! let mut sim = ScenarioBuilder::new()
//!     .sink(Duration::from_ticks(250), 10, Duration::ZERO)
//!     .build();
//!
//! sim.run_for(Duration::from_secs(30));
//!
//! let a = SinkId::new(0);
//! assert_eq!(sim.source().period(a), Some(Duration::from_ticks(250)));
//! assert!(sim.metrics().sink(a).frames_in_window > 0);
//! ```
//!
//! # Module Structure
//!
//! - [`event`] - Event types and deterministic queue ordering
//! - [`sink`] - Modeled sink coordinators
//! - [`sim`] - The simulator core
//! - [`metrics`] - Run counters
//! - [`scenario`] - Scenario builders

// Links the host critical-section implementation for embassy-sync inside
// beaconlink.
use critical_section as _;

pub mod event;
pub mod metrics;
pub mod scenario;
pub mod sim;
pub mod sink;

pub use event::{ScheduledEvent, SequenceNumber, SimEvent};
pub use metrics::{SimMetrics, SimulationResult, SinkStats};
pub use scenario::{reference_scenario, ScenarioBuilder};
pub use sim::{SimSource, Simulator, TX_AIRTIME};
pub use sink::{Reception, SimSink, SinkParams};
