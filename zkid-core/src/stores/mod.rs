//! Challenge, nonce, and rate-limit stores — pluggable
//! capability interfaces with in-memory reference implementations.

pub mod challenge;
pub mod nonce;
pub mod rate_limit;

pub use challenge::{ChallengeStore, InMemoryChallengeStore};
pub use nonce::{InMemoryNonceStore, NonceStore, DEFAULT_NONCE_TTL_MS};
pub use rate_limit::{GovernorRateLimiter, RateLimiter, SharedRateLimiter, SlidingWindowRateLimiter};
