use serde::{Deserialize, Serialize};

/// A one-time `{nonce, request_timestamp}` pair issued by the verifier,
/// consumable exactly once within its TTL.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Challenge {
    pub nonce: String,
    pub request_timestamp_ms: i64,
    pub expires_at_ms: i64,
}
