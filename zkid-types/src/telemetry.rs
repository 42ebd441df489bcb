use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single terminal verification outcome, emitted on every success or
/// rejection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationEvent {
    pub timestamp: DateTime<Utc>,
    pub claim_type: String,
    pub verified: bool,
    pub verification_time_ms: u64,
    pub client_identifier: Option<String>,
    pub error: Option<String>,
}

/// An append-only audit record for issuer and revocation administrative
/// actions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub subject: String,
    pub detail: Option<String>,
}
