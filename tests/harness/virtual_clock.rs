// tests/harness/virtual_clock.rs
//
// Virtual clock for driving scan deadlines without waiting on real time.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, RwLock};

use mailthread::Clock;

/// A clock that can be controlled for testing.
/// Clones share state, so a store can advance the clock a scan is reading.
#[derive(Clone)]
pub struct VirtualClock {
    inner: Arc<RwLock<DateTime<Utc>>>,
}

impl VirtualClock {
    /// Create a virtual clock set to a specific time.
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(time)),
        }
    }

    /// Advance time by the given duration.
    pub fn advance(&self, duration: Duration) {
        let mut guard = self.inner.write().unwrap();
        *guard += duration;
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::at(Utc::now())
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.inner.read().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailthread::scan::Cancellation;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T09:00:00+00:00")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_virtual_clock_advance() {
        let clock = VirtualClock::at(start());
        clock.advance_secs(90);
        assert_eq!(clock.now(), start() + Duration::seconds(90));
    }

    #[test]
    fn test_virtual_clock_clones_share_time() {
        let clock = VirtualClock::at(start());
        let other = clock.clone();
        clock.advance(Duration::minutes(5));
        assert_eq!(other.now(), clock.now());
    }

    #[test]
    fn test_deadline_follows_virtual_time() {
        let clock = VirtualClock::at(start());
        let cancel = Cancellation::new(clock.clone()).with_timeout(Duration::seconds(30));

        clock.advance_secs(29);
        assert!(!cancel.is_expired());
        clock.advance_secs(1);
        assert!(cancel.is_expired());
    }
}
