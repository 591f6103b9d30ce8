//! Core types and constants for the beaconlink protocol.

use alloc::vec::Vec;
use core::fmt;

use crate::time::Duration;

// Protocol constants
/// Payload value that marks the final beacon of a synchronization burst.
pub const LAST_BEACON_SEQ: u8 = 1;
/// Maximum number of beacons in one burst ("n").
pub const MAX_BURST_LEN: usize = 10;
/// Number of beacon-less sleep cycles between bursts in the sink protocol.
pub const SLEEP_CYCLES: u64 = 10;

// Timing constants
/// Smallest inter-beacon interval any sink uses ("t" lower bound).
pub const MIN_INTER_BEACON: Duration = Duration::from_millis(250);
/// Largest inter-beacon interval any sink uses ("t" upper bound).
///
/// Doubles as the conservative fallback wherever a schedule or timeout must
/// be armed before a period estimate exists.
pub const MAX_INTER_BEACON: Duration = Duration::from_millis(1500);
/// Delay before the first sink-selection pass, leaving the radio time to
/// settle after power-up.
pub const STARTUP_SETTLE: Duration = Duration::from_millis(100);
/// Receive deadline horizon. Longer than any session, so reception only
/// ends when explicitly stopped or restarted.
pub const RX_HORIZON: Duration = Duration::from_secs(60);

/// Index of one sink coordinator within the configured contiguous block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SinkId(u8);

impl SinkId {
    /// Create a sink id from a raw index.
    ///
    /// The caller is responsible for range-checking against the configured
    /// sink count; [`LinkConfig::sink_index`](crate::config::LinkConfig::sink_index)
    /// is the validated constructor.
    pub const fn new(index: u8) -> Self {
        SinkId(index)
    }

    /// Raw index value.
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Index usable for per-sink array access.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink{}", self.0)
    }
}

/// One-shot alarms owned by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerId {
    /// Per-sink transmission attempt is due.
    SinkTx(SinkId),
    /// Sink-selection pass: pick the next sink to estimate.
    SinkSelect,
    /// Estimation listen stalled (beacon train interrupted).
    RxTimeout,
    /// In-window transmit instant reached.
    TxDelay,
}

/// Events consumed by the protocol's single dispatch function.
///
/// Everything the source reacts to arrives through this enum: radio
/// completions pushed by the driver glue and internal timer expiries. Each
/// handler runs to completion before the next event is dispatched.
#[derive(Debug, Clone)]
pub enum Event {
    /// An asynchronous receive completed. `None` means the receive expired
    /// or was stopped without a frame; the handler simply re-arms reception.
    RxComplete { frame: Option<Vec<u8>> },
    /// An asynchronous transmit completed. `sent` is false when the driver
    /// gave up without putting the frame on air.
    TxComplete { sent: bool },
    /// A protocol alarm fired.
    Timer(TimerId),
}

/// Binary indicator outputs.
///
/// The reference hardware drives two LEDs: green while synchronizing to a
/// beacon train, red while a transmission is imminent or in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Led {
    /// Synchronization in progress.
    Sync,
    /// Transmission armed or in flight.
    Transmit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_id_roundtrip() {
        let s = SinkId::new(2);
        assert_eq!(s.raw(), 2);
        assert_eq!(s.index(), 2);
    }

    #[test]
    fn test_timing_bounds() {
        assert!(MIN_INTER_BEACON < MAX_INTER_BEACON);
        assert_eq!(MIN_INTER_BEACON.as_millis(), 250);
        assert_eq!(MAX_INTER_BEACON.as_millis(), 1500);
    }
}
