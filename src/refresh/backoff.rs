//! Exponential backoff for failing feeds.
//!
//! Failure counts live in memory only; a restart retries everything. The
//! backoff window doubles per consecutive failure, starting at one scheduler
//! tick, and never exceeds the feed's own refresh interval, so a failing feed
//! degrades to its normal schedule rather than disappearing.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Failure counts stop growing once the uncapped window would span a day.
const MAX_WINDOW_SECS: i64 = 86_400;

#[derive(Debug, Clone)]
pub struct RetryState {
    pub count: u32,
    pub last_retry: DateTime<Utc>,
    pub message: String,
}

pub struct RetryTracker {
    tick_secs: i64,
    max_count: u32,
    states: HashMap<i64, RetryState>,
}

impl RetryTracker {
    pub fn new(tick_secs: i64) -> Self {
        let tick_secs = tick_secs.max(1);
        // Smallest count where tick * 2^(count-1) >= a day.
        let mut max_count = 1;
        while tick_secs << (max_count - 1) < MAX_WINDOW_SECS && max_count < 63 {
            max_count += 1;
        }
        Self {
            tick_secs,
            max_count: max_count as u32,
            states: HashMap::new(),
        }
    }

    /// Whether `feed_id` should be skipped this tick. A feed is suppressed
    /// until more than `min(tick * 2^(count-1), refresh_secs)` seconds have
    /// passed since its last attempt.
    pub fn suppressed(&self, feed_id: i64, refresh_secs: i64, now: DateTime<Utc>) -> bool {
        let Some(state) = self.states.get(&feed_id) else {
            return false;
        };
        let window = backoff_window(state.count, self.tick_secs, refresh_secs);
        now.signed_duration_since(state.last_retry).num_seconds() <= window
    }

    pub fn record_failure(&mut self, feed_id: i64, message: String, now: DateTime<Utc>) {
        let count = self
            .states
            .get(&feed_id)
            .map(|state| (state.count + 1).min(self.max_count))
            .unwrap_or(1);
        self.states.insert(
            feed_id,
            RetryState {
                count,
                last_retry: now,
                message,
            },
        );
    }

    pub fn record_success(&mut self, feed_id: i64) {
        self.states.remove(&feed_id);
    }

    pub fn state(&self, feed_id: i64) -> Option<&RetryState> {
        self.states.get(&feed_id)
    }
}

fn backoff_window(count: u32, tick_secs: i64, refresh_secs: i64) -> i64 {
    let exponent = count.saturating_sub(1).min(62);
    let uncapped = tick_secs.saturating_mul(1_i64.checked_shl(exponent).unwrap_or(i64::MAX));
    uncapped.min(refresh_secs.max(tick_secs))
}
