use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};

/// Sliding-window request counter used by the anti-spam guard.
///
/// Keeps the timestamps of recent requests per user and drops those older
/// than the window on every access. The windows live in memory only and are
/// lost on restart.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    windows: HashMap<i64, VecDeque<DateTime<Utc>>>,
    window: Duration,
}

impl RateLimiter {
    /// Creates a limiter with the given trailing window.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use mediagrab::core::rate_limiter::RateLimiter;
    ///
    /// let mut limiter = RateLimiter::new(Duration::minutes(5));
    /// assert_eq!(limiter.record(1, Utc::now()), 1);
    /// ```
    pub fn new(window: Duration) -> Self {
        Self {
            windows: HashMap::new(),
            window,
        }
    }

    /// Records a request from `user_id` at `now`.
    ///
    /// # Returns
    ///
    /// The number of requests inside the trailing window, including this one.
    pub fn record(&mut self, user_id: i64, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        let entries = self.windows.entry(user_id).or_default();
        while entries.front().is_some_and(|t| *t < cutoff) {
            entries.pop_front();
        }
        entries.push_back(now);
        entries.len()
    }
}
