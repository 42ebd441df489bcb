//! Challenge store: `issue`/`consume` with atomic, idempotent
//! consumption and lazy TTL eviction. Built over a single `parking_lot`
//! mutex guarding the whole map, the same discipline used for the rate
//! limiter and metrics maps elsewhere in this crate.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Issue a fresh challenge, valid for `ttl_ms` from now.
    async fn issue(&self, nonce: &str, request_timestamp_ms: i64, ttl_ms: i64);

    /// Atomically consume `nonce`, returning its stored timestamp exactly
    /// once. A second `consume` for the same nonce returns `None`.
    async fn consume(&self, nonce: &str) -> Option<i64>;
}

struct Entry {
    request_timestamp_ms: i64,
    expires_at_ms: i64,
}

#[derive(Default)]
pub struct InMemoryChallengeStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn evict_expired(entries: &mut HashMap<String, Entry>, now: i64) {
        entries.retain(|_, e| e.expires_at_ms > now);
    }
}

#[async_trait]
impl ChallengeStore for InMemoryChallengeStore {
    async fn issue(&self, nonce: &str, request_timestamp_ms: i64, ttl_ms: i64) {
        let now = now_ms();
        let mut entries = self.entries.lock();
        Self::evict_expired(&mut entries, now);
        entries.insert(
            nonce.to_string(),
            Entry {
                request_timestamp_ms,
                expires_at_ms: now + ttl_ms,
            },
        );
    }

    async fn consume(&self, nonce: &str) -> Option<i64> {
        let now = now_ms();
        let mut entries = self.entries.lock();
        Self::evict_expired(&mut entries, now);
        entries.remove(nonce).map(|e| e.request_timestamp_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn consume_is_single_use() {
        let store = InMemoryChallengeStore::new();
        store.issue("n1", 1000, 60_000).await;
        assert_eq!(store.consume("n1").await, Some(1000));
        assert_eq!(store.consume("n1").await, None);
    }

    #[tokio::test]
    async fn expired_challenges_are_invisible() {
        let store = InMemoryChallengeStore::new();
        store.issue("n1", 1000, -1).await;
        assert_eq!(store.consume("n1").await, None);
    }

    #[tokio::test]
    async fn unknown_nonce_returns_none() {
        let store = InMemoryChallengeStore::new();
        assert_eq!(store.consume("never-issued").await, None);
    }
}
