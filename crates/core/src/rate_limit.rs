//! Sliding-window admission control for publish calls.
//!
//! [`RateLimiter`] records the time of every publish attempt, admitted or
//! not, and reports the limit as exceeded once the number of attempts inside
//! the trailing window is strictly greater than the configured threshold.
//! State lives in memory only and resets on restart.

use std::collections::VecDeque;

use chrono::{TimeDelta, Utc};
use tokio::sync::Mutex;

use crate::types::Timestamp;

/// Default number of publish attempts allowed per window.
pub const DEFAULT_PUBLISH_RATE_LIMIT: usize = 40;

/// Default window length in seconds (one hour).
pub const DEFAULT_WINDOW_SECS: i64 = 3600;

/// Outcome of recording one publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The attempt is within the limit.
    Admitted { attempts: usize },
    /// More than `threshold` attempts have been made inside the window.
    Exceeded { attempts: usize },
}

impl Admission {
    pub fn is_exceeded(&self) -> bool {
        matches!(self, Admission::Exceeded { .. })
    }

    /// Number of attempts inside the window, including this one.
    pub fn attempts(&self) -> usize {
        match self {
            Admission::Admitted { attempts } | Admission::Exceeded { attempts } => *attempts,
        }
    }
}

/// Process-wide sliding-window limiter, shared via `Arc<RateLimiter>`.
pub struct RateLimiter {
    threshold: usize,
    window: TimeDelta,
    calls: Mutex<VecDeque<Timestamp>>,
}

impl RateLimiter {
    pub fn new(threshold: usize, window: TimeDelta) -> Self {
        Self {
            threshold,
            window,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Record an attempt at the current time and check the limit.
    ///
    /// The clock is read while the lock is held so the sequence stays
    /// time-ordered under concurrent callers.
    pub async fn admit(&self) -> Admission {
        let mut calls = self.calls.lock().await;
        let now = Utc::now();
        self.record(&mut calls, now)
    }

    /// Record an attempt at an explicit time (callers must pass
    /// non-decreasing timestamps).
    pub async fn admit_at(&self, now: Timestamp) -> Admission {
        let mut calls = self.calls.lock().await;
        self.record(&mut calls, now)
    }

    /// Number of attempts currently held in the window.
    pub async fn attempts(&self) -> usize {
        self.calls.lock().await.len()
    }

    fn record(&self, calls: &mut VecDeque<Timestamp>, now: Timestamp) -> Admission {
        calls.push_back(now);

        // Time-ordered, so eviction is a prefix trim.
        if let Some(cutoff) = now.checked_sub_signed(self.window) {
            while calls.front().is_some_and(|t| *t < cutoff) {
                calls.pop_front();
            }
        }

        let attempts = calls.len();
        if attempts > self.threshold {
            Admission::Exceeded { attempts }
        } else {
            Admission::Admitted { attempts }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(
            DEFAULT_PUBLISH_RATE_LIMIT,
            TimeDelta::seconds(DEFAULT_WINDOW_SECS),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn nth_plus_one_attempt_is_rejected() {
        let limiter = RateLimiter::new(3, TimeDelta::hours(1));
        for i in 0..3 {
            assert_eq!(
                limiter.admit_at(at(i)).await,
                Admission::Admitted { attempts: i as usize + 1 }
            );
        }
        assert_eq!(
            limiter.admit_at(at(3)).await,
            Admission::Exceeded { attempts: 4 }
        );
    }

    #[tokio::test]
    async fn rejected_attempts_are_still_recorded() {
        let limiter = RateLimiter::new(1, TimeDelta::hours(1));
        limiter.admit_at(at(0)).await;
        assert!(limiter.admit_at(at(1)).await.is_exceeded());
        assert!(limiter.admit_at(at(2)).await.is_exceeded());
        assert_eq!(limiter.attempts().await, 3);
    }

    #[tokio::test]
    async fn attempts_older_than_window_do_not_count() {
        let limiter = RateLimiter::new(2, TimeDelta::hours(1));
        limiter.admit_at(at(0)).await;
        limiter.admit_at(at(10)).await;

        // 3601 s later the first two have left the window.
        let admission = limiter.admit_at(at(3611)).await;
        assert_eq!(admission, Admission::Admitted { attempts: 1 });
    }

    #[tokio::test]
    async fn attempt_exactly_at_window_edge_still_counts() {
        let limiter = RateLimiter::new(1, TimeDelta::hours(1));
        limiter.admit_at(at(0)).await;
        assert!(limiter.admit_at(at(3600)).await.is_exceeded());
    }

    #[tokio::test]
    async fn zero_threshold_rejects_everything() {
        let limiter = RateLimiter::new(0, TimeDelta::hours(1));
        assert!(limiter.admit().await.is_exceeded());
    }

    #[tokio::test]
    async fn concurrent_callers_are_all_recorded() {
        let limiter = Arc::new(RateLimiter::new(100, TimeDelta::hours(1)));
        let handles: Vec<_> = (0..50)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.admit().await })
            })
            .collect();
        for handle in handles {
            assert!(!handle.await.unwrap().is_exceeded());
        }
        assert_eq!(limiter.attempts().await, 50);
    }
}
