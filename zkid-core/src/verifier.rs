//! Verifier state machine: the ordered gate pipeline that turns
//! a submitted `ProofResponse` into a pass/fail verdict. Gate *order* is
//! fixed, sequential `?`-chained code rather than a generic middleware
//! stack, while each gate's collaborator (challenge store, nonce store,
//! rate limiter, revocation backend, issuer registry, verifying-key store,
//! telemetry sink) is a pluggable trait object supplied through
//! `VerifierBuilder`.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use zkid_types::{
    AggregatedResult, Challenge, ClaimResult, IssuerStatus, ProofEnvelope, ProofResponse,
    SignedCredential, VerificationEvent, ZkIdError, ZkIdResult,
};

use crate::config::{ProtocolVersionPolicy, VerifierConfig};
use crate::proof::{self, VerifyingKeyStore};
use crate::registry::IssuerRegistry;
use crate::revocation::RevocationBackend;
use crate::scenario;
use crate::stores::{ChallengeStore, NonceStore, SharedRateLimiter};
use crate::telemetry::{TelemetrySink, TracingTelemetrySink};

/// The wire protocol version this verifier speaks: `zk-id/<major>.<minor>[-draft]`.
pub const PROTOCOL_VERSION: &str = "zk-id/1.0";

fn major_version(version: &str) -> Option<&str> {
    version.strip_prefix("zk-id/")?.split(['.', '-']).next()
}

/// Same-major compatibility rule.
fn is_compatible_version(declared: Option<&str>) -> bool {
    match declared.and_then(major_version) {
        Some(major) => Some(major) == major_version(PROTOCOL_VERSION),
        None => false,
    }
}

/// The public verdict of `verify_proof`/`verify_signed_proof`: the HTTP
/// surface serializes this directly as the `POST /verify` response body.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyOutcome {
    pub verified: bool,
    pub claim_type: Option<String>,
    pub min_age: Option<u8>,
    pub target_nationality: Option<u16>,
    pub error: Option<String>,
    /// The error taxonomy label, present only when `verbose_errors` is set
    /// in the verifier's config. Never includes cryptographic secrets or
    /// stack traces — see `ZkIdError::kind`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

/// One entry in a scenario/multi-claim bundle submission: a claim's label
/// paired with the envelope proving it. All entries in a bundle
/// must share one outer nonce and timestamp, checked by
/// `scenario::check_bundle_consistency` before any gate runs.
///
/// `expected_min_age`/`expected_nationality` come from the claim's own
/// `ClaimSpec` rather than the verifier's global
/// `required_policy` — a scenario bundling an age claim and a nationality
/// claim under one session needs each claim checked against its own
/// requirement, not one global policy shared by every claim in the bundle.
#[derive(Clone, Debug)]
pub struct BundleEntry {
    pub label: String,
    pub envelope: ProofEnvelope,
    pub expected_min_age: Option<u16>,
    pub expected_nationality: Option<u16>,
}

/// Builds a `Verifier` from a `VerifierConfig` plus whichever collaborators
/// the deployment wants wired in. Only a verifying-key store is mandatory;
/// every other collaborator being absent simply turns its gate into a
/// no-op.
pub struct VerifierBuilder {
    config: VerifierConfig,
    challenge_store: Option<Arc<dyn ChallengeStore>>,
    nonce_store: Option<Arc<dyn NonceStore>>,
    rate_limiter: Option<SharedRateLimiter>,
    revocation_backend: Option<Arc<dyn RevocationBackend>>,
    issuer_registry: Option<Arc<dyn IssuerRegistry>>,
    vk_store: Option<Arc<dyn VerifyingKeyStore>>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
}

impl VerifierBuilder {
    pub fn new(config: VerifierConfig) -> Self {
        Self {
            config,
            challenge_store: None,
            nonce_store: None,
            rate_limiter: None,
            revocation_backend: None,
            issuer_registry: None,
            vk_store: None,
            telemetry: None,
        }
    }

    pub fn challenge_store(mut self, store: Arc<dyn ChallengeStore>) -> Self {
        self.challenge_store = Some(store);
        self
    }

    pub fn nonce_store(mut self, store: Arc<dyn NonceStore>) -> Self {
        self.nonce_store = Some(store);
        self
    }

    /// Rate limiting (gate 1) is only enabled when both a limiter is
    /// configured here *and* a `client_id` is supplied to `verify_proof`.
    pub fn rate_limiter(mut self, limiter: SharedRateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Revocation checking (gate 10) is only enabled when a backend is
    /// configured here.
    pub fn revocation_backend(mut self, backend: Arc<dyn RevocationBackend>) -> Self {
        self.revocation_backend = Some(backend);
        self
    }

    /// Required for `require_signed_credentials` (gate 3) and for
    /// `verify_signed_proof`'s issuer-bits gate.
    pub fn issuer_registry(mut self, registry: Arc<dyn IssuerRegistry>) -> Self {
        self.issuer_registry = Some(registry);
        self
    }

    pub fn vk_store(mut self, store: Arc<dyn VerifyingKeyStore>) -> Self {
        self.vk_store = Some(store);
        self
    }

    pub fn telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    pub fn build(self) -> ZkIdResult<Verifier> {
        let vk_store = self
            .vk_store
            .ok_or_else(|| ZkIdError::Config("Verifier requires a verifying-key store".to_string()))?;

        Ok(Verifier {
            config: self.config,
            challenge_store: self.challenge_store,
            nonce_store: self.nonce_store,
            rate_limiter: self.rate_limiter,
            revocation_backend: self.revocation_backend,
            issuer_registry: self.issuer_registry,
            vk_store,
            telemetry: self.telemetry.unwrap_or_else(|| Arc::new(TracingTelemetrySink)),
        })
    }
}

/// The verifier state machine. Thread-safe, callable from many
/// tasks concurrently: every collaborator is behind `Arc<dyn
/// Trait>` and the machine itself holds no per-call mutable state.
pub struct Verifier {
    config: VerifierConfig,
    challenge_store: Option<Arc<dyn ChallengeStore>>,
    nonce_store: Option<Arc<dyn NonceStore>>,
    rate_limiter: Option<SharedRateLimiter>,
    revocation_backend: Option<Arc<dyn RevocationBackend>>,
    issuer_registry: Option<Arc<dyn IssuerRegistry>>,
    vk_store: Arc<dyn VerifyingKeyStore>,
    telemetry: Arc<dyn TelemetrySink>,
}

fn record_window_ok(record: &zkid_types::IssuerRecord, now: chrono::DateTime<Utc>) -> bool {
    record.valid_from.map(|f| now >= f).unwrap_or(true) && record.valid_to.map(|t| now <= t).unwrap_or(true)
}

impl Verifier {
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Issue a fresh one-time `{nonce, request_timestamp}` pair. A no-op on
    /// the store side when no challenge store is configured — the returned
    /// challenge is then informational only, since gate (6) will never
    /// consume it.
    pub async fn create_challenge(&self) -> Challenge {
        let nonce = Uuid::new_v4().to_string();
        let request_timestamp_ms = Utc::now().timestamp_millis();
        let expires_at_ms = request_timestamp_ms + self.config.challenge_ttl_ms;
        if let Some(challenge_store) = &self.challenge_store {
            challenge_store.issue(&nonce, request_timestamp_ms, self.config.challenge_ttl_ms).await;
        }
        Challenge { nonce, request_timestamp_ms, expires_at_ms }
    }

    /// Gate (1).
    async fn check_rate_limit(&self, client_id: &str) -> ZkIdResult<()> {
        if let Some(limiter) = &self.rate_limiter {
            if !limiter.allow_request(client_id).await {
                return Err(ZkIdError::RateLimit);
            }
        }
        Ok(())
    }

    /// Gate (2).
    fn check_protocol_version(&self, declared: Option<&str>) -> ZkIdResult<()> {
        match self.config.protocol_version_policy {
            ProtocolVersionPolicy::Off => Ok(()),
            ProtocolVersionPolicy::Warn => {
                if !is_compatible_version(declared) {
                    tracing::warn!(declared = ?declared, expected = PROTOCOL_VERSION, "protocol version mismatch");
                }
                Ok(())
            }
            ProtocolVersionPolicy::Strict => {
                if is_compatible_version(declared) {
                    Ok(())
                } else {
                    Err(ZkIdError::Proof(format!(
                        "PROTOCOL_VERSION_MISMATCH: expected a version compatible with {PROTOCOL_VERSION}, got {declared:?}"
                    )))
                }
            }
        }
    }

    /// Gate (3): only used by `verify_proof`, never `verify_signed_proof`.
    async fn check_signed_credential(
        &self,
        signed: &SignedCredential,
        credential_id: Option<&str>,
        credential_hash: &zkid_types::FieldElement,
    ) -> ZkIdResult<()> {
        let registry = self
            .issuer_registry
            .as_ref()
            .ok_or_else(|| ZkIdError::Config("issuer registry not configured".to_string()))?;

        let records = registry.list_records(&signed.issuer).await;
        if records.is_empty() {
            return Err(ZkIdError::Credential("ISSUER_UNKNOWN".to_string()));
        }

        let now = Utc::now();
        let record = match records.iter().find(|r| record_window_ok(r, now)) {
            None => return Err(ZkIdError::Credential("ISSUER_EXPIRED".to_string())),
            Some(r) if r.status != IssuerStatus::Active => {
                return Err(ZkIdError::Credential("ISSUER_INACTIVE".to_string()))
            }
            Some(r) => r,
        };

        let payload = zkid_crypto::canonical_payload(
            &signed.credential.id,
            signed.credential.commitment.as_decimal(),
            signed.credential.created_at,
            &signed.issuer,
            signed.issued_at,
        );
        let valid = zkid_crypto::verify_signature(&record.public_key, payload.as_bytes(), &signed.signature)?;
        if !valid {
            return Err(ZkIdError::Crypto("SIGNATURE_INVALID".to_string()));
        }

        if &signed.credential.commitment != credential_hash {
            return Err(ZkIdError::Proof("COMMITMENT_MISMATCH".to_string()));
        }

        match credential_id {
            Some(id) if id == signed.credential.id => Ok(()),
            _ => Err(ZkIdError::Proof("CREDENTIAL_ID_MISMATCH".to_string())),
        }
    }

    /// Gate (4).
    fn check_policy(&self, envelope: &ProofEnvelope) -> ZkIdResult<()> {
        if let Some(required) = self.config.required_policy.min_age {
            match envelope.min_age() {
                Some(actual) if actual as u16 == required => {}
                Some(_) => return Err(ZkIdError::Proof("POLICY_VIOLATION".to_string())),
                None => {}
            }
        }
        if let Some(required) = self.config.required_policy.nationality {
            match envelope.target_nationality() {
                Some(actual) if actual == required => {}
                Some(_) => return Err(ZkIdError::Proof("POLICY_VIOLATION".to_string())),
                None => {}
            }
        }
        Ok(())
    }

    /// Gate (5).
    fn check_timestamp_window(&self, request_timestamp_ms: i64) -> ZkIdResult<()> {
        if request_timestamp_ms <= 0 {
            return Err(ZkIdError::Validation("request_timestamp_ms must be positive".to_string()));
        }
        let now = Utc::now().timestamp_millis();
        if (now - request_timestamp_ms).abs() > self.config.max_request_age_ms {
            return Err(ZkIdError::Validation("REQUEST_TIMESTAMP_OUT_OF_WINDOW".to_string()));
        }
        Ok(())
    }

    /// Gate (10).
    async fn check_revocation(&self, envelope: &ProofEnvelope) -> ZkIdResult<()> {
        let Some(backend) = &self.revocation_backend else {
            return Ok(());
        };
        if backend.contains(envelope.credential_hash()).await? {
            return Err(ZkIdError::Revocation("REVOKED".to_string()));
        }
        if let Some(merkle_root) = envelope.merkle_root() {
            let current_root = backend.get_root().await?;
            if merkle_root != &current_root {
                return Err(ZkIdError::Revocation("STALE_MERKLE_ROOT".to_string()));
            }
        }
        Ok(())
    }

    /// The issuer-bits gate `verify_signed_proof` adds after gate (7).
    async fn check_issuer_bits(&self, envelope: &ProofEnvelope, issuer_name: &str) -> ZkIdResult<()> {
        let registry = self
            .issuer_registry
            .as_ref()
            .ok_or_else(|| ZkIdError::Config("issuer registry not configured".to_string()))?;
        let record = registry
            .get_issuer(issuer_name)
            .await
            .ok_or_else(|| ZkIdError::Credential("ISSUER_UNKNOWN".to_string()))?;
        let expected_bits = proof::public_key_bits(&record.public_key)?;
        proof::check_issuer_bits(envelope, &expected_bits)
    }

    /// Gates (9)+(11)'s nonce bookkeeping, per's explicit allowance
    /// to fuse has-check/add into one `test_and_set`: calling it here means
    /// a proof that later fails revocation or SNARK verification still
    /// burns its nonce, which is the safer reading when the challenge store
    /// isn't the only line of defense against replay. A no-op when no nonce
    /// store is configured.
    async fn check_replay(&self, nonce: &str) -> ZkIdResult<()> {
        let Some(nonce_store) = &self.nonce_store else {
            return Ok(());
        };
        if nonce_store.test_and_set(nonce, self.config.nonce_ttl_ms).await {
            return Err(ZkIdError::Replay);
        }
        Ok(())
    }

    /// Gates (6)+(7)+(8): consume the challenge and bind the envelope's own
    /// nonce/timestamp to the outer session values the challenge was issued
    /// for. A no-op when no challenge store is configured.
    async fn consume_and_bind(&self, envelope: &ProofEnvelope, nonce: &str, request_timestamp_ms: i64) -> ZkIdResult<()> {
        let Some(challenge_store) = &self.challenge_store else {
            return Ok(());
        };
        let challenge_timestamp = challenge_store
            .consume(nonce)
            .await
            .ok_or_else(|| ZkIdError::Challenge("UNKNOWN_OR_EXPIRED_CHALLENGE".to_string()))?;
        if challenge_timestamp != request_timestamp_ms {
            return Err(ZkIdError::Challenge("CHALLENGE_TIMESTAMP_MISMATCH".to_string()));
        }
        if envelope.nonce() != nonce {
            return Err(ZkIdError::Proof("NONCE_BINDING_MISMATCH".to_string()));
        }
        if envelope.request_timestamp_ms() != request_timestamp_ms {
            return Err(ZkIdError::Proof("TIMESTAMP_BINDING_MISMATCH".to_string()));
        }
        Ok(())
    }

    /// A claim's own requirement, when the caller
    /// supplied one, takes precedence over the verifier's global
    /// `required_policy` — each claim in a bundle is checked against its
    /// own label's requirement, not one shared policy.
    fn check_claim_policy(
        &self,
        envelope: &ProofEnvelope,
        expected_min_age: Option<u16>,
        expected_nationality: Option<u16>,
    ) -> ZkIdResult<()> {
        if expected_min_age.is_none() && expected_nationality.is_none() {
            return self.check_policy(envelope);
        }
        if let Some(required) = expected_min_age {
            if envelope.min_age().map(|a| a as u16) != Some(required) {
                return Err(ZkIdError::Proof("POLICY_VIOLATION".to_string()));
            }
        }
        if let Some(required) = expected_nationality {
            if envelope.target_nationality() != Some(required) {
                return Err(ZkIdError::Proof("POLICY_VIOLATION".to_string()));
            }
        }
        Ok(())
    }

    /// Per-claim tail of the pipeline shared by a scenario bundle's
    /// members: policy, revocation, SNARK verify (gates 4, 10, 11). The
    /// bundle-wide gates (1, 2, 5, 6, 7, 8, 9) run once, before this, over
    /// the bundle's shared nonce/timestamp.
    async fn verify_claim_envelope(&self, entry: &BundleEntry) -> ZkIdResult<()> {
        self.check_claim_policy(&entry.envelope, entry.expected_min_age, entry.expected_nationality)?;
        self.check_revocation(&entry.envelope).await?;
        let verified =
            proof::verify_envelope(&entry.envelope, self.vk_store.as_ref(), entry.envelope.merkle_root()).await?;
        if !verified {
            return Err(ZkIdError::Crypto("SNARK_VERIFY_FAILED".to_string()));
        }
        Ok(())
    }

    async fn run_verify_proof(
        &self,
        response: &ProofResponse,
        client_id: Option<&str>,
        protocol_version: Option<&str>,
    ) -> ZkIdResult<()> {
        let envelope = &response.proof;

        if let Some(client_id) = client_id {
            self.check_rate_limit(client_id).await?;
        }
        self.check_protocol_version(protocol_version)?;

        if self.config.require_signed_credentials {
            let signed = response
                .signed_credential
                .as_ref()
                .ok_or_else(|| ZkIdError::Credential("SIGNED_CREDENTIAL_REQUIRED".to_string()))?;
            self.check_signed_credential(signed, response.credential_id.as_deref(), envelope.credential_hash())
                .await?;
        }

        self.check_policy(envelope)?;
        self.check_timestamp_window(response.request_timestamp_ms)?;
        self.consume_and_bind(envelope, &response.nonce, response.request_timestamp_ms).await?;
        self.check_replay(&response.nonce).await?;
        self.check_revocation(envelope).await?;

        let verified = proof::verify_envelope(envelope, self.vk_store.as_ref(), envelope.merkle_root()).await?;
        if !verified {
            return Err(ZkIdError::Crypto("SNARK_VERIFY_FAILED".to_string()));
        }
        Ok(())
    }

    /// `verify_proof(response, client_id?, protocol_version?)`:
    /// the single public entry for a standalone, unsigned-or-issuer-signed
    /// proof submission.
    pub async fn verify_proof(
        &self,
        response: &ProofResponse,
        client_id: Option<&str>,
        protocol_version: Option<&str>,
    ) -> VerifyOutcome {
        let start = Instant::now();
        let result = self.run_verify_proof(response, client_id, protocol_version).await;
        self.finish(&response.proof, client_id, start, result).await
    }

    async fn run_verify_signed_proof(
        &self,
        response: &ProofResponse,
        issuer_name: &str,
        client_id: Option<&str>,
        protocol_version: Option<&str>,
    ) -> ZkIdResult<()> {
        let envelope = &response.proof;

        if let Some(client_id) = client_id {
            self.check_rate_limit(client_id).await?;
        }
        self.check_protocol_version(protocol_version)?;
        // Gate (3) skipped: the issuer signature is bound inside the SNARK
        // for the *-signed variants.
        self.check_policy(envelope)?;
        self.check_timestamp_window(response.request_timestamp_ms)?;
        self.consume_and_bind(envelope, &response.nonce, response.request_timestamp_ms).await?;
        self.check_issuer_bits(envelope, issuer_name).await?;
        self.check_replay(&response.nonce).await?;
        self.check_revocation(envelope).await?;

        let verified = proof::verify_envelope(envelope, self.vk_store.as_ref(), envelope.merkle_root()).await?;
        if !verified {
            return Err(ZkIdError::Crypto("SNARK_VERIFY_FAILED".to_string()));
        }
        Ok(())
    }

    /// Same gate order as `verify_proof` but for the `*-signed` variants:
    /// skips gate (3) and adds an issuer-bits match after gate (7).
    /// `issuer_name` identifies which registry record the proof's
    /// in-circuit `issuer_public_key_bits` are checked against.
    pub async fn verify_signed_proof(
        &self,
        response: &ProofResponse,
        issuer_name: &str,
        client_id: Option<&str>,
        protocol_version: Option<&str>,
    ) -> VerifyOutcome {
        let start = Instant::now();
        let result = self.run_verify_signed_proof(response, issuer_name, client_id, protocol_version).await;
        self.finish(&response.proof, client_id, start, result).await
    }

    /// Verify a scenario/multi-claim bundle: bundle-wide gates run once over the shared
    /// nonce/timestamp, then each entry's policy/revocation/SNARK gates run
    /// independently so a bundle can report a mixed per-claim verdict.
    pub async fn verify_scenario_bundle(
        &self,
        entries: &[BundleEntry],
        nonce: &str,
        request_timestamp_ms: i64,
        client_id: Option<&str>,
        protocol_version: Option<&str>,
    ) -> ZkIdResult<AggregatedResult> {
        let start = Instant::now();

        let envelopes: Vec<&ProofEnvelope> = entries.iter().map(|e| &e.envelope).collect();
        scenario::check_bundle_consistency(&envelopes)?;

        let first = entries
            .first()
            .ok_or_else(|| ZkIdError::Validation("scenario bundle must not be empty".to_string()))?;

        if let Some(client_id) = client_id {
            self.check_rate_limit(client_id).await?;
        }
        self.check_protocol_version(protocol_version)?;
        self.check_timestamp_window(request_timestamp_ms)?;
        self.consume_and_bind(&first.envelope, nonce, request_timestamp_ms).await?;
        self.check_replay(nonce).await?;

        let mut results = Vec::with_capacity(entries.len());
        for entry in entries {
            let outcome = self.verify_claim_envelope(entry).await;
            results.push(ClaimResult {
                label: entry.label.clone(),
                verified: outcome.is_ok(),
                error: outcome.err().map(|e| e.public_message()),
            });
        }

        let aggregated = scenario::aggregate(results);

        self.telemetry
            .record(VerificationEvent {
                timestamp: Utc::now(),
                claim_type: "scenario".to_string(),
                verified: aggregated.all_verified,
                verification_time_ms: start.elapsed().as_millis() as u64,
                client_identifier: client_id.map(|s| s.to_string()),
                error: if aggregated.all_verified {
                    None
                } else {
                    Some(format!("failed claims: {:?}", aggregated.failed_labels()))
                },
            })
            .await;

        Ok(aggregated)
    }

    async fn finish(
        &self,
        envelope: &ProofEnvelope,
        client_id: Option<&str>,
        start: Instant,
        result: ZkIdResult<()>,
    ) -> VerifyOutcome {
        let verification_time_ms = start.elapsed().as_millis() as u64;
        let claim_type = envelope.variant_name().to_string();

        let outcome = match result {
            Ok(()) => VerifyOutcome {
                verified: true,
                claim_type: Some(claim_type.clone()),
                min_age: envelope.min_age(),
                target_nationality: envelope.target_nationality(),
                error: None,
                error_kind: None,
            },
            Err(e) => VerifyOutcome {
                verified: false,
                claim_type: Some(claim_type.clone()),
                min_age: None,
                target_nationality: None,
                error_kind: self.config.verbose_errors.then(|| e.kind().to_string()),
                error: Some(e.public_message()),
            },
        };

        self.telemetry
            .record(VerificationEvent {
                timestamp: Utc::now(),
                claim_type,
                verified: outcome.verified,
                verification_time_ms,
                client_identifier: client_id.map(|s| s.to_string()),
                error: outcome.error.clone(),
            })
            .await;

        outcome
    }
}
