//! In-memory sliding-window rate limiter.
//!
//! Single-instance only: a multi-worker deployment needs a distributed
//! backend (Redis, etc.) behind the same `check`/`cleanup` interface.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Sliding window counter keyed by an arbitrary string, typically
/// `"{tenant}:{scope}"`.
pub struct RateLimiter {
    window: Duration,
    requests: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    /// Construct a limiter with a `window_seconds`-wide sliding window
    /// (default 60 per the original design).
    pub fn new(window_seconds: u64) -> Self {
        Self {
            window: Duration::from_secs(window_seconds),
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Check whether one more call under `key` is allowed given `limit`
    /// calls per window. Returns `(allowed, retry_after_seconds)`; denied
    /// calls always report `retry_after_seconds >= 1`.
    pub fn check(&self, key: &str, limit: u32) -> (bool, u64) {
        let now = Instant::now();
        let cutoff = now.checked_sub(self.window).unwrap_or(now);

        let mut requests = self.requests.lock();
        let timestamps = requests.entry(key.to_string()).or_default();
        timestamps.retain(|t| *t > cutoff);

        if timestamps.len() as u32 >= limit {
            let retry_after = timestamps[0].saturating_duration_since(cutoff).as_secs() + 1;
            return (false, retry_after.max(1));
        }
        timestamps.push(now);
        (true, 0)
    }

    /// Evict keys whose timestamp list is empty after expiry. Returns the
    /// number of keys removed. Intended to run periodically, not on the
    /// request path.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let cutoff = now.checked_sub(self.window).unwrap_or(now);
        let mut requests = self.requests.lock();
        let mut removed = 0;
        requests.retain(|_, timestamps| {
            timestamps.retain(|t| *t > cutoff);
            let keep = !timestamps.is_empty();
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }
}
