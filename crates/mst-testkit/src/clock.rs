use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};

/// A deterministic, manually-advanced clock for tests that need repeatable
/// `executed_at`/`now` values — daily trading-window checks, backtest day
/// boundaries, cooldown expiry, etc. Not used by production code, which
/// always calls `Utc::now()` directly.
pub struct TestClock {
    millis: AtomicI64,
}

impl TestClock {
    pub fn at(start: DateTime<Utc>) -> Self {
        Self { millis: AtomicI64::new(start.timestamp_millis()) }
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.millis.load(Ordering::SeqCst)).single().expect("valid timestamp")
    }

    pub fn advance(&self, delta: chrono::Duration) {
        self.millis.fetch_add(delta.num_milliseconds(), Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn advance_moves_now_forward() {
        let clock = TestClock::at(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let before = clock.now();
        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), before + Duration::hours(2));
    }
}
