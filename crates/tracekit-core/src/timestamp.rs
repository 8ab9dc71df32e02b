//! Packet timestamps in 64-bit binary fixed point.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: u64 = 1_000_000_000;
const FRACTION_ONE: f64 = 4_294_967_296.0;

/// Time since the Unix epoch as seconds (upper 32 bits) plus a binary
/// fraction of a second (lower 32 bits), the ERF timestamp encoding.
///
/// Ordering is chronological, which seeking relies on.
///
/// # Examples
/// ```
/// use tracekit_core::Timestamp;
///
/// let ts = Timestamp::from_parts(1_500, 500_000_000);
/// assert_eq!(ts.erf(), (1_500u64 << 32) | 0x8000_0000);
/// assert_eq!(ts.seconds(), 1_500.5);
/// assert_eq!(ts.subsec_micros(), 500_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_erf(raw: u64) -> Self {
        Self(raw)
    }

    /// Build from whole seconds and nanoseconds; excess nanoseconds carry.
    pub fn from_parts(secs: u32, nanos: u32) -> Self {
        let nanos = u64::from(nanos);
        let secs = u64::from(secs) + nanos / NANOS_PER_SEC;
        let frac = ((nanos % NANOS_PER_SEC) << 32) / NANOS_PER_SEC;
        Self(((secs & 0xffff_ffff) << 32) | frac)
    }

    pub fn from_timeval(secs: u32, micros: u32) -> Self {
        Self::from_parts(secs, micros.saturating_mul(1_000))
    }

    /// Saturates at the representable range; negative or non-finite input
    /// maps to the epoch.
    pub fn from_seconds(seconds: f64) -> Self {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Self(0);
        }
        if seconds >= u32::MAX as f64 + 1.0 {
            return Self(u64::MAX);
        }
        let whole = seconds.trunc();
        let frac = ((seconds - whole) * FRACTION_ONE) as u64;
        Self(((whole as u64) << 32) | frac.min(0xffff_ffff))
    }

    pub fn from_duration(since_epoch: Duration) -> Self {
        let secs = u32::try_from(since_epoch.as_secs()).unwrap_or(u32::MAX);
        Self::from_parts(secs, since_epoch.subsec_nanos())
    }

    /// Wall-clock time, for live capture.
    pub fn now() -> Self {
        Self::from_duration(SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default())
    }

    pub const fn erf(self) -> u64 {
        self.0
    }

    pub const fn secs(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn subsec_nanos(self) -> u32 {
        let frac = self.0 & 0xffff_ffff;
        let nanos = (frac * NANOS_PER_SEC + (1 << 31)) >> 32;
        nanos.min(NANOS_PER_SEC - 1) as u32
    }

    pub fn subsec_micros(self) -> u32 {
        self.subsec_nanos() / 1_000
    }

    pub fn seconds(self) -> f64 {
        f64::from(self.secs()) + (self.0 & 0xffff_ffff) as f64 / FRACTION_ONE
    }

    pub fn as_duration(self) -> Duration {
        Duration::new(u64::from(self.secs()), self.subsec_nanos())
    }

    /// Elapsed time from `earlier` to `self`, zero when `earlier` is later.
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        self.as_duration().saturating_sub(earlier.as_duration())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.secs(), self.subsec_nanos())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Timestamp;

    #[test]
    fn microsecond_values_survive_conversion() {
        for micros in [0, 1, 100, 999_999, 123_456] {
            let ts = Timestamp::from_timeval(42, micros);
            assert_eq!(ts.secs(), 42);
            assert_eq!(ts.subsec_micros(), micros, "{micros}");
        }
    }

    #[test]
    fn nanoseconds_carry_into_seconds() {
        let ts = Timestamp::from_parts(1, 2_500_000_000);
        assert_eq!(ts.secs(), 3);
        assert_eq!(ts.subsec_nanos(), 500_000_000);
    }

    #[test]
    fn float_seconds_round_trip() {
        let ts = Timestamp::from_seconds(1_700_000_000.25);
        assert_eq!(ts.secs(), 1_700_000_000);
        assert_eq!(ts.erf() & 0xffff_ffff, 0x4000_0000);
        assert_eq!(ts.seconds(), 1_700_000_000.25);
        assert_eq!(Timestamp::from_seconds(-3.0).erf(), 0);
        assert_eq!(Timestamp::from_seconds(f64::NAN).erf(), 0);
    }

    #[test]
    fn ordering_is_chronological() {
        let a = Timestamp::from_parts(10, 999_999_999);
        let b = Timestamp::from_parts(11, 0);
        assert!(a < b);
        assert_eq!(b.saturating_since(a), Duration::from_nanos(1));
        assert_eq!(a.saturating_since(b), Duration::ZERO);
    }

    #[test]
    fn display_uses_nanoseconds() {
        assert_eq!(Timestamp::from_parts(5, 42).to_string(), "5.000000042");
    }
}
