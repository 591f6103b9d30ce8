#![forbid(unsafe_code)]
//! beaconlink - beacon-synchronized transmission scheduling for a
//! single-radio source node.
//!
//! A source node shares one physical radio with several fixed coordinators
//! ("sinks"), each broadcasting its own periodic beacon bursts: sequence
//! values counting down to 1, one beacon every `t` ticks, `n` beacons per
//! burst, then a long sleep. The source learns each sink's `t` and `n`
//! purely from received beacon timestamps - tolerating lost beacons and
//! interference from its own transmissions - and then delivers exactly one
//! application frame per sink per cycle, timed to land inside that sink's
//! receive window.
//!
//! This crate is `no_std` but requires the `alloc` crate. All platform
//! dependencies are injected behind traits ([`Radio`], [`Clock`],
//! [`Indicator`]), so the protocol runs identically against hardware and
//! against the `beaconsim` discrete-event simulator.
//!
//! # Key Properties
//!
//! - Period estimation interpolates across gaps from missed beacons
//! - One radio, many timelines: a single-owner lock arbitrates retuning
//! - Contention never drifts: deferred attempts re-derive from the
//!   originally intended instant
//! - A reception timeout rescues listens interrupted mid-burst
//! - At most one attempted transmission per sink per estimated cycle
//!
//! # Example (integration pattern)
//!
//! ```ignore
//! use beaconlink::{LinkConfig, NullTrace, Source};
//!
//! // Implement Radio, Clock and Indicator for your platform...
//! let mut source = Source::new(LinkConfig::default(), radio, clock, leds, NullTrace)?;
//!
//! // Spawn the protocol loop; radio ISR glue pushes completions into
//! // source.events().
//! spawn(async move {
//!     source.run().await;
//! });
//! ```
//!
//! # Module Structure
//!
//! - [`types`] - Core types and protocol constants
//! - [`time`] - Tick timestamps and durations
//! - [`config`] - Sink addressing and radio identity
//! - [`wire`] - Frame wire format
//! - [`traits`] - Radio, Clock, Indicator seams
//! - [`history`] - Beacon history and period estimation
//! - [`arbiter`] - Radio ownership and guarded retuning
//! - [`timers`] - One-shot protocol alarms
//! - [`trace`] - Diagnostic events
//! - [`source`] - The protocol state machine hub

#![no_std]

extern crate alloc;

pub mod arbiter;
pub mod config;
pub mod history;
mod receive;
mod sched;
pub mod source;
pub mod time;
pub mod timers;
pub mod trace;
pub mod traits;
pub mod types;
pub mod wire;

// Re-export main types at crate root
pub use config::{ConfigError, LinkConfig};
pub use history::BeaconHistory;
pub use source::Source;
pub use time::{Duration, Timestamp};
pub use trace::{NullTrace, TraceEmitter, TraceEvent};
pub use traits::{Clock, EventChannel, Indicator, Radio};
pub use types::{Event, Led, SinkId, TimerId};
pub use wire::{DecodeError, Frame};

// Re-export constants
pub use types::{
    LAST_BEACON_SEQ, MAX_BURST_LEN, MAX_INTER_BEACON, MIN_INTER_BEACON, SLEEP_CYCLES,
    STARTUP_SETTLE,
};
