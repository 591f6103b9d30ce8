//! Tick-based time types for the beaconlink protocol.
//!
//! The protocol never reads a platform clock directly: every handler takes
//! the current [`Timestamp`] explicitly, so the same code runs against real
//! hardware ticks or simulated time. One tick corresponds to one millisecond
//! of the platform's monotonic counter.

use core::ops::{Add, AddAssign, Div, Mul, Sub};

/// Monotonic protocol timestamp in ticks.
///
/// Wraps a `u64` to keep points-in-time and spans from mixing silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Zero timestamp (boot).
    pub const ZERO: Timestamp = Timestamp(0);

    /// Create a timestamp from raw ticks.
    #[inline]
    pub const fn from_ticks(ticks: u64) -> Self {
        Timestamp(ticks)
    }

    /// Create a timestamp from milliseconds.
    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Timestamp(ms)
    }

    /// Get the timestamp as raw ticks.
    #[inline]
    pub const fn as_ticks(self) -> u64 {
        self.0
    }

    /// Saturating addition of a duration.
    #[inline]
    pub const fn saturating_add(self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_add(duration.0))
    }

    /// Saturating subtraction of another timestamp, returning a duration.
    #[inline]
    pub const fn saturating_sub(self, other: Timestamp) -> Duration {
        Duration(self.0.saturating_sub(other.0))
    }

    /// Checked subtraction of another timestamp.
    #[inline]
    pub const fn checked_sub(self, other: Timestamp) -> Option<Duration> {
        match self.0.checked_sub(other.0) {
            Some(d) => Some(Duration(d)),
            None => None,
        }
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs.0)
    }
}

impl AddAssign<Duration> for Timestamp {
    #[inline]
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.0;
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Timestamp) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

/// Span of time in ticks.
///
/// Supports the integer arithmetic the period estimator leans on:
/// multiplication by a cycle count and division by a sample count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(u64);

impl Duration {
    /// Zero duration.
    pub const ZERO: Duration = Duration(0);

    /// Create a duration from raw ticks.
    #[inline]
    pub const fn from_ticks(ticks: u64) -> Self {
        Duration(ticks)
    }

    /// Create a duration from milliseconds.
    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Duration(ms)
    }

    /// Create a duration from seconds.
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Duration(secs.saturating_mul(1000))
    }

    /// Get the duration as raw ticks.
    #[inline]
    pub const fn as_ticks(self) -> u64 {
        self.0
    }

    /// Get the duration as milliseconds.
    #[inline]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Saturating addition.
    #[inline]
    pub const fn saturating_add(self, other: Duration) -> Self {
        Duration(self.0.saturating_add(other.0))
    }

    /// Saturating multiplication.
    #[inline]
    pub const fn saturating_mul(self, n: u64) -> Self {
        Duration(self.0.saturating_mul(n))
    }

    /// Checked division by an integer count.
    ///
    /// Returns `None` for a zero divisor. Used when averaging inter-beacon
    /// gaps over a variable number of sample pairs.
    #[inline]
    pub const fn checked_div(self, n: u64) -> Option<Duration> {
        match self.0.checked_div(n) {
            Some(d) => Some(Duration(d)),
            None => None,
        }
    }
}

impl Add for Duration {
    type Output = Duration;

    #[inline]
    fn add(self, rhs: Duration) -> Duration {
        Duration(self.0 + rhs.0)
    }
}

impl AddAssign for Duration {
    #[inline]
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.0;
    }
}

impl Sub for Duration {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Duration) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl Mul<u64> for Duration {
    type Output = Duration;

    #[inline]
    fn mul(self, rhs: u64) -> Duration {
        Duration(self.0 * rhs)
    }
}

impl Div<u64> for Duration {
    type Output = Duration;

    #[inline]
    fn div(self, rhs: u64) -> Duration {
        Duration(self.0 / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_creation() {
        let t = Timestamp::from_ticks(1500);
        assert_eq!(t.as_ticks(), 1500);
        assert_eq!(Timestamp::from_millis(250), Timestamp::from_ticks(250));
    }

    #[test]
    fn test_timestamp_arithmetic() {
        let t1 = Timestamp::from_ticks(1000);
        let d = Duration::from_ticks(250);

        assert_eq!((t1 + d).as_ticks(), 1250);
        assert_eq!(Timestamp::from_ticks(1500) - t1, Duration::from_ticks(500));
    }

    #[test]
    fn test_saturating_operations() {
        let t1 = Timestamp::from_ticks(5);
        let t2 = Timestamp::from_ticks(10);
        assert_eq!(t1.saturating_sub(t2), Duration::ZERO);
        assert_eq!(t2.saturating_sub(t1), Duration::from_ticks(5));
        assert_eq!(t1.checked_sub(t2), None);
    }

    #[test]
    fn test_duration_scaling() {
        let t = Duration::from_ticks(250);
        assert_eq!((t * 12).as_ticks(), 3000);
        assert_eq!((t / 2).as_ticks(), 125);
        assert_eq!(Duration::from_ticks(500).checked_div(2), Some(t));
        assert_eq!(t.checked_div(0), None);
    }

    #[test]
    fn test_ordering() {
        assert!(Timestamp::from_ticks(5) < Timestamp::from_ticks(10));
        assert!(Duration::from_ticks(250) < Duration::from_ticks(1500));
    }
}
