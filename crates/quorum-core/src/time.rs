//! Host-supplied time
//!
//! The engine never reads a wall clock. Every operation receives `now` from
//! the host, which is trusted to be monotonically non-decreasing but nothing
//! more. Timestamps are milliseconds since the Unix epoch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Length of one daily spending window
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Millisecond timestamp injected by the host
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// The Unix epoch
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Create from milliseconds
    pub const fn from_millis(ts_ms: u64) -> Self {
        Self(ts_ms)
    }

    /// Create from whole seconds
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// Milliseconds since the epoch
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// `self + duration`, clamped at the maximum representable time
    pub fn saturating_add(self, duration: Duration) -> Self {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(ms))
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_saturates() {
        let t0 = Timestamp::from_secs(10);
        assert_eq!(t0.saturating_add(DAY).as_millis(), 10_000 + 86_400_000);
        assert_eq!(Timestamp(u64::MAX).saturating_add(DAY), Timestamp(u64::MAX));
        assert_eq!(t0.saturating_since(Timestamp::from_secs(20)), Duration::ZERO);
        assert_eq!(
            Timestamp::from_secs(20).saturating_since(t0),
            Duration::from_secs(10)
        );
    }
}
