//! Millisecond wall clock used by the tracker and the store.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, LocalResult, NaiveTime, TimeZone, Utc};

/// Source of "now" in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant, so a test can hand one copy to the
/// component under test and keep another to advance time.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Returns the timestamp of local midnight at the start of the day containing `now_ms`.
///
/// On days where midnight does not exist (DST gaps) the earliest valid
/// instant of that day is used.
pub fn local_midnight_ms(now_ms: i64) -> i64 {
    let Some(now) = DateTime::<Utc>::from_timestamp_millis(now_ms) else {
        return now_ms;
    };
    let date = now.with_timezone(&Local).date_naive();
    let midnight = date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.timestamp_millis(),
        LocalResult::None => {
            // Midnight skipped by a DST jump; the day starts at the first valid hour.
            (1..=3)
                .filter_map(|hour| {
                    let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
                    Local.from_local_datetime(&date.and_time(time)).earliest()
                })
                .map(|dt| dt.timestamp_millis())
                .next()
                .unwrap_or(now_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(1_000);
        let other = clock.clone();
        clock.advance(500);
        assert_eq!(other.now_ms(), 1_500);
        other.set(42);
        assert_eq!(clock.now_ms(), 42);
    }

    #[test]
    fn local_midnight_is_not_after_now() {
        let now = SystemClock.now_ms();
        let midnight = local_midnight_ms(now);
        assert!(midnight <= now);
        assert!(now - midnight < 25 * 60 * 60 * 1000);
    }

    #[test]
    fn local_midnight_is_stable_within_a_day() {
        let now = SystemClock.now_ms();
        let midnight = local_midnight_ms(now);
        assert_eq!(local_midnight_ms(midnight), midnight);
    }
}
