//! Per-session request throttling.
//!
//! The first request opens a window of `interval`; further mutating requests
//! inside that window are rejected. A zero interval disables throttling.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Upper bound on tracked sessions before expired entries are swept.
const MAX_TRACKED: usize = 10_000;

pub struct Throttle {
    interval: Duration,
    seen: Mutex<HashMap<i64, Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request for `user_id`. Returns `false` when it arrives inside
    /// the window opened by an earlier request.
    pub fn check(&self, user_id: i64) -> bool {
        self.check_at(user_id, Instant::now())
    }

    fn check_at(&self, user_id: i64, now: Instant) -> bool {
        if self.interval.is_zero() {
            return true;
        }
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(&opened) = seen.get(&user_id) {
            if now.duration_since(opened) < self.interval {
                tracing::warn!(user_id, "Throttling user");
                return false;
            }
        }
        if seen.len() >= MAX_TRACKED {
            let interval = self.interval;
            seen.retain(|_, opened| now.duration_since(*opened) < interval);
        }
        seen.insert(user_id, now);
        true
    }
}
