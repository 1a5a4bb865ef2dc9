//! Per-origin sliding-window limiter for operator endpoints.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

/// Status checks each origin may trigger per minute.
pub const STATUS_CHECKS_PER_MINUTE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed {
        /// Requests left in the current window
        remaining: usize,
    },
    Limited {
        /// Time until the oldest counted request leaves the window
        retry_after: Duration,
    },
}

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self { max_requests, window, hits: Mutex::new(HashMap::new()) }
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Count one request from `key` unless the window is already full.
    pub async fn check(&self, key: &str) -> RateLimitResult {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;

        // Forget origins whose last request already left the window.
        hits.retain(|_, times| times.back().is_some_and(|t| now.duration_since(*t) < self.window));

        let times = hits.entry(key.to_string()).or_default();
        while times.front().is_some_and(|t| now.duration_since(*t) >= self.window) {
            times.pop_front();
        }

        if times.len() >= self.max_requests {
            let retry_after = times
                .front()
                .map_or(self.window, |oldest| self.window.saturating_sub(now.duration_since(*oldest)));
            debug!(key, retry_after_ms = retry_after.as_millis() as u64, "Rate limit reached");
            return RateLimitResult::Limited { retry_after };
        }

        times.push_back(now);
        RateLimitResult::Allowed { remaining: self.max_requests - times.len() }
    }
}
