//! Sliding-window rate limiter. The reference implementation
//! is a small hand-rolled per-client timestamp window; `GovernorRateLimiter`
//! wraps `governor` for production use, the idiomatic sliding/leaky-window
//! crate in this ecosystem.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{Quota, RateLimiter as GovernorLimiter};
use parking_lot::Mutex;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// `true` if the request is admitted under client `client_id`'s window.
    async fn allow_request(&self, client_id: &str) -> bool;
}

/// Sliding window `(limit, window_ms)` per client.
pub struct SlidingWindowRateLimiter {
    limit: usize,
    window_ms: i64,
    windows: Mutex<HashMap<String, Vec<i64>>>,
}

impl SlidingWindowRateLimiter {
    pub fn new(limit: usize, window_ms: i64) -> Self {
        Self {
            limit,
            window_ms,
            windows: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowRateLimiter {
    async fn allow_request(&self, client_id: &str) -> bool {
        let now = now_ms();
        let mut windows = self.windows.lock();
        let timestamps = windows.entry(client_id.to_string()).or_default();
        timestamps.retain(|t| now - *t < self.window_ms);

        if timestamps.len() < self.limit {
            timestamps.push(now);
            true
        } else {
            false
        }
    }
}

/// `governor`-backed limiter, one keyed instance per process, recommended
/// for `zkid-server` deployments.
pub struct GovernorRateLimiter {
    limiter: governor::DefaultKeyedRateLimiter<String>,
}

impl GovernorRateLimiter {
    pub fn new(limit_per_window: u32, window_ms: u64) -> Self {
        let quota = Quota::with_period(std::time::Duration::from_millis(window_ms.max(1)))
            .expect("window_ms must be non-zero")
            .allow_burst(NonZeroU32::new(limit_per_window.max(1)).expect("limit must be non-zero"));
        Self {
            limiter: GovernorLimiter::keyed(quota),
        }
    }
}

#[async_trait]
impl RateLimiter for GovernorRateLimiter {
    async fn allow_request(&self, client_id: &str) -> bool {
        self.limiter.check_key(&client_id.to_string()).is_ok()
    }
}

pub type SharedRateLimiter = Arc<dyn RateLimiter>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_the_limit_then_denies() {
        let limiter = SlidingWindowRateLimiter::new(2, 60_000);
        assert!(limiter.allow_request("client-a").await);
        assert!(limiter.allow_request("client-a").await);
        assert!(!limiter.allow_request("client-a").await);
    }

    #[tokio::test]
    async fn clients_are_independent() {
        let limiter = SlidingWindowRateLimiter::new(1, 60_000);
        assert!(limiter.allow_request("client-a").await);
        assert!(limiter.allow_request("client-b").await);
    }

    #[tokio::test]
    async fn window_eviction_readmits_after_expiry() {
        let limiter = SlidingWindowRateLimiter::new(1, -1);
        assert!(limiter.allow_request("client-a").await);
        assert!(limiter.allow_request("client-a").await);
    }
}
