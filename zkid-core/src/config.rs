//! Verifier configuration: the options table gating each
//! optional state-machine check, loadable from a TOML file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use zkid_types::{ZkIdError, ZkIdResult, DEFAULT_SMT_DEPTH};

const DEFAULT_CHALLENGE_TTL_MS: i64 = 5 * 60 * 1000;
const DEFAULT_NONCE_TTL_MS: i64 = 5 * 60 * 1000;
const DEFAULT_MAX_REQUEST_AGE_MS: i64 = 5 * 60 * 1000;

/// Gate (2) behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolVersionPolicy {
    /// Gate (2) is skipped entirely.
    #[default]
    Off,
    /// Mismatches are logged but do not reject the request.
    Warn,
    /// A missing or incompatible version rejects the request.
    Strict,
}

/// Gate (4): when set, the proof's corresponding public signal must match
/// exactly or the request is rejected with `POLICY_VIOLATION`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequiredPolicy {
    pub min_age: Option<u16>,
    pub nationality: Option<u16>,
}

/// Gate (1): sliding-window rate limiter parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub limit: usize,
    pub window_ms: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 60,
            window_ms: 60_000,
        }
    }
}

/// Revocation tree sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationTreeConfig {
    pub depth: usize,
}

impl Default for RevocationTreeConfig {
    fn default() -> Self {
        Self { depth: DEFAULT_SMT_DEPTH }
    }
}

/// The verifier state machine's full option set. Every field has
/// a spec-mandated or conservative default so a bare `VerifierConfig::default()`
/// runs every gate that can run without external configuration (rate
/// limiting, challenge store, and revocation are opt-in via the collaborator
/// being present, not via a flag here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    pub require_signed_credentials: bool,
    pub max_request_age_ms: i64,
    pub required_policy: RequiredPolicy,
    pub protocol_version_policy: ProtocolVersionPolicy,
    pub challenge_ttl_ms: i64,
    pub nonce_ttl_ms: i64,
    pub revocation_tree: RevocationTreeConfig,
    pub rate_limit: RateLimitConfig,
    /// When set, `VerifyOutcome::error_kind` carries the error taxonomy
    /// label (see `ZkIdError::kind`) alongside the human-readable message.
    #[serde(default)]
    pub verbose_errors: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            require_signed_credentials: true,
            max_request_age_ms: DEFAULT_MAX_REQUEST_AGE_MS,
            required_policy: RequiredPolicy::default(),
            protocol_version_policy: ProtocolVersionPolicy::default(),
            challenge_ttl_ms: DEFAULT_CHALLENGE_TTL_MS,
            nonce_ttl_ms: DEFAULT_NONCE_TTL_MS,
            revocation_tree: RevocationTreeConfig::default(),
            rate_limit: RateLimitConfig::default(),
            verbose_errors: false,
        }
    }
}

impl VerifierConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> ZkIdResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ZkIdError::Config(format!("failed to read verifier config: {e}")))?;
        toml::from_str(&contents).map_err(|e| ZkIdError::Config(format!("failed to parse verifier config TOML: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let config = VerifierConfig::default();
        assert!(config.require_signed_credentials);
        assert_eq!(config.max_request_age_ms, 5 * 60 * 1000);
        assert_eq!(config.challenge_ttl_ms, 5 * 60 * 1000);
        assert_eq!(config.nonce_ttl_ms, 5 * 60 * 1000);
        assert_eq!(config.protocol_version_policy, ProtocolVersionPolicy::Off);
        assert_eq!(config.revocation_tree.depth, DEFAULT_SMT_DEPTH);
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = VerifierConfig::default();
        config.required_policy.min_age = Some(21);
        config.protocol_version_policy = ProtocolVersionPolicy::Strict;

        let serialized = toml::to_string(&config).unwrap();
        let parsed: VerifierConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.required_policy.min_age, Some(21));
        assert_eq!(parsed.protocol_version_policy, ProtocolVersionPolicy::Strict);
    }
}
