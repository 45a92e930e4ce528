//! Time sources used by the router

use chrono::{DateTime, Utc};
use std::time::Instant;

/// Wall-clock and monotonic time source
pub trait Clock: Send + Sync {
    /// Current UTC time, used for audit timestamps
    fn now(&self) -> DateTime<Utc>;

    /// Monotonic instant, used for latency measurement
    fn monotonic(&self) -> Instant;
}

/// Clock backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic(&self) -> Instant {
        Instant::now()
    }
}

/// Milliseconds between two instants, clamped at zero
pub fn latency_ms(started: Instant, finished: Instant) -> u64 {
    let elapsed = finished.saturating_duration_since(started).as_millis();
    u64::try_from(elapsed).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_latency_is_never_negative() {
        let start = Instant::now();
        let later = start + Duration::from_millis(1500);
        assert_eq!(latency_ms(start, later), 1500);
        assert_eq!(latency_ms(later, start), 0);
    }
}
