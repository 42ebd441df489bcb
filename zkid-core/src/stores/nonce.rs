//! Nonce (replay) store: `has`/`add` with per-entry TTL,
//! default 5 minutes. `InMemoryNonceStore::test_and_set` fuses `has`+`add`
//! into a single locked critical section, so the replay-check/replay-record
//! pair is linearizable without a caller-visible race.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

pub const DEFAULT_NONCE_TTL_MS: i64 = 5 * 60 * 1000;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
pub trait NonceStore: Send + Sync {
    async fn has(&self, nonce: &str) -> bool;
    async fn add(&self, nonce: &str, ttl_ms: i64);

    /// Atomically check-then-insert, returning `true` if `nonce` was
    /// already present (the replay case) and inserting it with `ttl_ms`
    /// otherwise.
    async fn test_and_set(&self, nonce: &str, ttl_ms: i64) -> bool;
}

#[derive(Default)]
pub struct InMemoryNonceStore {
    seen: Mutex<HashMap<String, i64>>,
}

impl InMemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn evict_expired(seen: &mut HashMap<String, i64>, now: i64) {
        seen.retain(|_, expires_at| *expires_at > now);
    }
}

#[async_trait]
impl NonceStore for InMemoryNonceStore {
    async fn has(&self, nonce: &str) -> bool {
        let now = now_ms();
        let mut seen = self.seen.lock();
        Self::evict_expired(&mut seen, now);
        seen.contains_key(nonce)
    }

    async fn add(&self, nonce: &str, ttl_ms: i64) {
        let now = now_ms();
        let mut seen = self.seen.lock();
        Self::evict_expired(&mut seen, now);
        seen.insert(nonce.to_string(), now + ttl_ms);
    }

    async fn test_and_set(&self, nonce: &str, ttl_ms: i64) -> bool {
        let now = now_ms();
        let mut seen = self.seen.lock();
        Self::evict_expired(&mut seen, now);
        if seen.contains_key(nonce) {
            true
        } else {
            seen.insert(nonce.to_string(), now + ttl_ms);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replay_is_detected() {
        let store = InMemoryNonceStore::new();
        assert!(!store.has("n1").await);
        store.add("n1", DEFAULT_NONCE_TTL_MS).await;
        assert!(store.has("n1").await);
    }

    #[tokio::test]
    async fn test_and_set_is_atomic_in_effect() {
        let store = InMemoryNonceStore::new();
        assert!(!store.test_and_set("n1", DEFAULT_NONCE_TTL_MS).await);
        assert!(store.test_and_set("n1", DEFAULT_NONCE_TTL_MS).await);
    }

    #[tokio::test]
    async fn ttl_expiry_reopens_the_nonce() {
        let store = InMemoryNonceStore::new();
        store.add("n1", -1).await;
        assert!(!store.has("n1").await);
    }
}
