//! Per-sink beacon arrival history and period estimation.
//!
//! A burst's beacons count down from the burst length to 1, so a beacon's
//! sequence value doubles as a slot index: the history keeps the most recent
//! arrival tick per slot. The estimator reconstructs the inter-beacon period
//! from whatever subset of slots was actually observed, interpolating across
//! gaps left by missed or interference-corrupted beacons instead of naively
//! averaging raw deltas.

use crate::time::{Duration, Timestamp};
use crate::types::MAX_BURST_LEN;

/// Arrival history for one sink's current (or most recent) burst.
#[derive(Debug, Clone, Default)]
pub struct BeaconHistory {
    slots: [Option<Timestamp>; MAX_BURST_LEN],
}

impl BeaconHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a beacon arrival.
    ///
    /// `seq` counts down within the burst, so slot `seq - 1` holds it. Any
    /// previous observation for the slot is overwritten: only the most
    /// recent cycle's arrivals matter. Out-of-range sequence values are the
    /// caller's to reject; this guard only keeps them from corrupting slots.
    pub fn record(&mut self, seq: u8, at: Timestamp) {
        let seq = seq as usize;
        if seq >= 1 && seq <= MAX_BURST_LEN {
            self.slots[seq - 1] = Some(at);
        }
    }

    /// Number of slots currently holding an observation.
    pub fn sample_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Estimate the inter-beacon period from the recorded arrivals.
    ///
    /// Scans from the highest slot (earliest expected in the burst) to the
    /// lowest. For each pair of present samples separated by `skipped`
    /// absent slots, the gap contributes `(later - earlier) / (skipped + 1)`
    /// to the mean, so dropped beacons dilute nothing. A pair that runs
    /// backwards in time is a leftover from an earlier cycle that has not
    /// been overwritten yet; it contributes nothing.
    ///
    /// Returns `None` when no usable pair of samples exists.
    pub fn estimate(&self) -> Option<Duration> {
        let mut skipped: u64 = 0;
        let mut prev: Option<Timestamp> = None;
        let mut sum = Duration::ZERO;
        let mut count: u64 = 0;

        for slot in self.slots.iter().rev() {
            match (slot, prev) {
                (None, Some(_)) => skipped += 1,
                (None, None) => {}
                (Some(at), earlier) => {
                    // Slots run oldest to newest here, so the current
                    // sample should be the later of the pair.
                    if let Some(gap) = earlier.and_then(|e| at.checked_sub(e)) {
                        sum += gap / (skipped + 1);
                        count += 1;
                    }
                    prev = Some(*at);
                    skipped = 0;
                }
            }
        }

        sum.checked_div(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consecutive_samples() {
        let mut h = BeaconHistory::new();
        h.record(3, Timestamp::from_ticks(1500));
        h.record(2, Timestamp::from_ticks(1750));
        h.record(1, Timestamp::from_ticks(2000));

        assert_eq!(h.estimate(), Some(Duration::from_ticks(250)));
    }

    #[test]
    fn test_gap_is_interpolated() {
        // Beacon seq 2 lost: samples at seq 3 and seq 1 are two slot-periods
        // apart, so the 500-tick gap averages to 250 per period.
        let mut h = BeaconHistory::new();
        h.record(3, Timestamp::from_ticks(1000));
        h.record(1, Timestamp::from_ticks(1500));

        assert_eq!(h.estimate(), Some(Duration::from_ticks(250)));
    }

    #[test]
    fn test_mixed_gaps() {
        // Full burst of 10 with seq 7 and 6 lost; every contribution is
        // still 250 once the double gap is split three ways.
        let mut h = BeaconHistory::new();
        for seq in (1..=10u8).rev() {
            if seq == 7 || seq == 6 {
                continue;
            }
            let at = Timestamp::from_ticks(1000 + (10 - seq as u64) * 250);
            h.record(seq, at);
        }

        assert_eq!(h.sample_count(), 8);
        assert_eq!(h.estimate(), Some(Duration::from_ticks(250)));
    }

    #[test]
    fn test_too_few_samples_is_unknown() {
        let mut h = BeaconHistory::new();
        assert_eq!(h.estimate(), None);

        h.record(5, Timestamp::from_ticks(1000));
        assert_eq!(h.estimate(), None);
    }

    #[test]
    fn test_rerecord_overwrites_slot() {
        let mut h = BeaconHistory::new();
        h.record(2, Timestamp::from_ticks(100));
        h.record(1, Timestamp::from_ticks(400));
        // A later cycle's observation replaces the stale slot.
        h.record(2, Timestamp::from_ticks(4100));
        h.record(1, Timestamp::from_ticks(4400));

        assert_eq!(h.estimate(), Some(Duration::from_ticks(300)));
    }

    #[test]
    fn test_stale_cycle_pair_is_discarded() {
        // Slot 0 still holds last cycle's final beacon; this cycle's
        // samples start at slot 6. The backwards pair across the cycle
        // boundary must not poison the mean.
        let mut h = BeaconHistory::new();
        h.record(1, Timestamp::from_ticks(3130));
        h.record(7, Timestamp::from_ticks(9130));
        assert_eq!(h.estimate(), None);

        h.record(6, Timestamp::from_ticks(9630));
        assert_eq!(h.estimate(), Some(Duration::from_ticks(500)));
    }

    #[test]
    fn test_out_of_range_seq_ignored() {
        let mut h = BeaconHistory::new();
        h.record(0, Timestamp::from_ticks(100));
        h.record(11, Timestamp::from_ticks(200));
        assert_eq!(h.sample_count(), 0);
    }
}
