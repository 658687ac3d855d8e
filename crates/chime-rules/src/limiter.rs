//! Per-rule fixed-window rate limiting.

use chime_core::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::model::RateLimit;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: DateTime<Utc>,
    count: u32,
}

/// Counter state keyed by rule id. Lives in memory only, so budgets restart
/// with the process and whenever a rule is re-activated.
pub struct RateLimiter {
    windows: Mutex<HashMap<u64, Window>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Take one unit of budget. `false` means the window is exhausted.
    pub fn try_acquire(&self, rule_id: u64, limit: &RateLimit) -> bool {
        let now = self.clock.now();
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let window = windows.entry(rule_id).or_insert(Window { started: now, count: 0 });
        // A window too long to represent never rolls over.
        let expired = window_length(limit).is_some_and(|length| now - window.started >= length);
        if expired {
            *window = Window { started: now, count: 0 };
        }
        if window.count < limit.limit {
            window.count += 1;
            true
        } else {
            tracing::debug!("⏳ Rule {rule_id} rate limited ({}/{}s)", limit.limit, limit.window_secs);
            false
        }
    }

    pub fn reset(&self, rule_id: u64) {
        self.windows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&rule_id);
    }
}

/// Window length as a duration, `None` when it does not fit.
pub fn window_length(limit: &RateLimit) -> Option<Duration> {
    Duration::try_seconds(i64::try_from(limit.window_secs).ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chime_core::clock::ManualClock;

    #[test]
    fn test_fixed_window() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let limiter = RateLimiter::new(clock.clone());
        let limit = RateLimit { limit: 3, window_secs: 60 };

        assert!(limiter.try_acquire(1, &limit));
        assert!(limiter.try_acquire(1, &limit));
        clock.advance(Duration::seconds(30));
        assert!(limiter.try_acquire(1, &limit));
        assert!(!limiter.try_acquire(1, &limit));
        // other rules have their own budget
        assert!(limiter.try_acquire(2, &limit));

        clock.advance(Duration::seconds(30));
        assert!(limiter.try_acquire(1, &limit));
    }

    #[test]
    fn test_reset() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let limiter = RateLimiter::new(clock);
        let limit = RateLimit { limit: 1, window_secs: 3600 };
        assert!(limiter.try_acquire(7, &limit));
        assert!(!limiter.try_acquire(7, &limit));
        limiter.reset(7);
        assert!(limiter.try_acquire(7, &limit));
    }

    #[test]
    fn test_unrepresentable_window_never_rolls_over() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let limiter = RateLimiter::new(clock.clone());
        let limit = RateLimit { limit: 1, window_secs: u64::MAX };
        assert!(window_length(&limit).is_none());
        assert!(limiter.try_acquire(3, &limit));
        clock.advance(Duration::days(365));
        assert!(!limiter.try_acquire(3, &limit));
    }
}
