use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset, Local, TimeDelta, Utc};

/// Wall-clock abstraction for slot resolution and event timestamps.
///
/// - now(): local wall-clock time including its UTC offset
/// - now_utc(): the same instant in UTC (event timestamps)
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;

    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }
}

/// Default clock backed by the host's local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Deterministic clock whose time only moves when told to.
///
/// Clones share the same instant, so a test can keep a handle and advance the
/// clock a component already owns.
#[derive(Debug, Clone)]
pub struct FixedClock {
    at: Arc<Mutex<DateTime<FixedOffset>>>,
}

impl FixedClock {
    pub fn new(at: DateTime<FixedOffset>) -> Self {
        Self {
            at: Arc::new(Mutex::new(at)),
        }
    }

    /// Advance the clock by the given delta.
    pub fn advance(&self, d: TimeDelta) {
        if let Ok(mut at) = self.at.lock() {
            *at += d;
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: DateTime<FixedOffset>) {
        if let Ok(mut at) = self.at.lock() {
            *at = to;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        match self.at.lock() {
            Ok(g) => *g,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_advances_shared_handles() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        let clock = FixedClock::new(tz.with_ymd_and_hms(2026, 10, 19, 9, 59, 0).unwrap());
        let handle = clock.clone();
        handle.advance(TimeDelta::minutes(2));
        assert_eq!(clock.now().format("%H:%M").to_string(), "10:01");
        assert_eq!(clock.now_utc().format("%H:%M").to_string(), "09:01");
    }

    #[test]
    fn system_clock_is_close_to_utc_now() {
        let clock = SystemClock::new();
        let skew = (clock.now_utc() - Utc::now()).num_seconds().abs();
        assert!(skew < 5);
    }
}
