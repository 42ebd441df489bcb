//! End-to-end scenario tests exercising `Verifier` through its public API
//! rather than individual gate functions. Groth16 proving/verifying key
//! generation requires a real circuit, which sits outside this crate's
//! boundary (`snark_verify` is an adapter over an externally-supplied
//! verifying key and proof). Scenarios that require `verified: true` are
//! therefore asserted up to the point where the SNARK call itself would
//! run: every earlier gate — rate limit, protocol version, signed-credential
//! binding, policy, timestamp window, challenge, nonce/timestamp binding,
//! replay, revocation — must have accepted the request for the failure to
//! land on the verifying-key lookup rather than an earlier rejection.

use std::sync::Arc;

use chrono::Utc;

use zkid_core::proof::StaticVerifyingKeyStore;
use zkid_core::registry::{InMemoryIssuerRegistry, IssuerRegistry};
use zkid_core::revocation::{RevocationBackend, SparseRevocationBackend};
use zkid_core::stores::{InMemoryChallengeStore, InMemoryNonceStore};
use zkid_core::{RequiredPolicy, VerifierBuilder, VerifierConfig};
use zkid_types::{
    AgeSignals, Credential, FieldElement, Groth16ProofData, IssuerRecord, IssuerStatus,
    MultiClaimRequest, ClaimSpec, ClaimType, ProofEnvelope, ProofResponse, SignedCredential,
};

fn zero_proof() -> Groth16ProofData {
    Groth16ProofData::new(
        [FieldElement::zero(), FieldElement::zero()],
        [[FieldElement::zero(), FieldElement::zero()], [FieldElement::zero(), FieldElement::zero()]],
        [FieldElement::zero(), FieldElement::zero()],
    )
}

fn sample_credential(commitment: &str) -> Credential {
    Credential {
        id: "cred-1".to_string(),
        birth_year: 1990,
        nationality: 840,
        salt: "aa".repeat(32),
        commitment: FieldElement::from_decimal(commitment).unwrap(),
        created_at: Utc::now(),
    }
}

fn age_envelope(nonce: &str, request_timestamp_ms: i64, min_age: u8, credential_hash: &str) -> ProofEnvelope {
    ProofEnvelope::Age {
        proof: zero_proof(),
        public_signals: AgeSignals {
            current_year: 2026,
            min_age,
            credential_hash: FieldElement::from_decimal(credential_hash).unwrap(),
            nonce: nonce.to_string(),
            request_timestamp_ms,
        },
    }
}

/// S1 — age 21 success, up to the SNARK call: a valid credential,
/// matching nonce/timestamp and policy. Every gate before the SNARK
/// verify must pass, landing on the verifying-key-store error rather
/// than any earlier rejection.
#[tokio::test]
async fn s1_age_success_reaches_the_snark_stage() {
    let config = VerifierConfig {
        require_signed_credentials: false,
        required_policy: RequiredPolicy { min_age: Some(21), nationality: None },
        ..VerifierConfig::default()
    };
    let verifier = VerifierBuilder::new(config)
        .vk_store(Arc::new(StaticVerifyingKeyStore::new()))
        .challenge_store(Arc::new(InMemoryChallengeStore::new()))
        .nonce_store(Arc::new(InMemoryNonceStore::new()))
        .build()
        .unwrap();

    let challenge = verifier.create_challenge().await;
    let response = ProofResponse {
        proof: age_envelope(&challenge.nonce, challenge.request_timestamp_ms, 21, "42"),
        nonce: challenge.nonce.clone(),
        request_timestamp_ms: challenge.request_timestamp_ms,
        credential_id: None,
        signed_credential: None,
    };

    let outcome = verifier.verify_proof(&response, None, None).await;
    assert!(!outcome.verified);
    assert!(outcome.error.unwrap().contains("no verifying key configured"));
}

/// S2 — replay: submitting the same `ProofResponse` twice. The first
/// attempt consumes the challenge and the nonce; the second must be
/// rejected at the replay gate, not re-reach the challenge store.
#[tokio::test]
async fn s2_replay_is_rejected() {
    let config = VerifierConfig {
        require_signed_credentials: false,
        ..VerifierConfig::default()
    };
    let verifier = VerifierBuilder::new(config)
        .vk_store(Arc::new(StaticVerifyingKeyStore::new()))
        .challenge_store(Arc::new(InMemoryChallengeStore::new()))
        .nonce_store(Arc::new(InMemoryNonceStore::new()))
        .build()
        .unwrap();

    let challenge = verifier.create_challenge().await;
    let response = ProofResponse {
        proof: age_envelope(&challenge.nonce, challenge.request_timestamp_ms, 0, "42"),
        nonce: challenge.nonce.clone(),
        request_timestamp_ms: challenge.request_timestamp_ms,
        credential_id: None,
        signed_credential: None,
    };

    let first = verifier.verify_proof(&response, None, None).await;
    assert!(!first.verified);

    let second = verifier.verify_proof(&response, None, None).await;
    assert!(!second.verified);
    assert_eq!(second.error.as_deref(), Some("replay detected"));
}

/// S3 — revoked credential: the commitment is in the revocation store
/// before the proof is submitted. Expect `REVOKED`, and — since an empty
/// `StaticVerifyingKeyStore` would surface a distinct "no verifying key
/// configured" error if the SNARK stage were ever reached — this also
/// proves the revocation gate short-circuits before `snark_verify`.
#[tokio::test]
async fn s3_revoked_credential_short_circuits_before_snark_verify() {
    let commitment = FieldElement::from_decimal("42").unwrap();
    let backend = Arc::new(SparseRevocationBackend::new(zkid_core::revocation::SparseMerkleTree::new(16).unwrap()));
    backend.add(&commitment).await.unwrap();

    let config = VerifierConfig {
        require_signed_credentials: false,
        ..VerifierConfig::default()
    };
    let verifier = VerifierBuilder::new(config)
        .vk_store(Arc::new(StaticVerifyingKeyStore::new()))
        .challenge_store(Arc::new(InMemoryChallengeStore::new()))
        .nonce_store(Arc::new(InMemoryNonceStore::new()))
        .revocation_backend(backend as Arc<dyn RevocationBackend>)
        .build()
        .unwrap();

    let challenge = verifier.create_challenge().await;
    let response = ProofResponse {
        proof: age_envelope(&challenge.nonce, challenge.request_timestamp_ms, 0, "42"),
        nonce: challenge.nonce.clone(),
        request_timestamp_ms: challenge.request_timestamp_ms,
        credential_id: None,
        signed_credential: None,
    };

    let outcome = verifier.verify_proof(&response, None, None).await;
    assert!(!outcome.verified);
    assert!(outcome.error.unwrap().contains("REVOKED"));
}

/// S4 — issuer-substitution attack: a validly-signed credential, then the
/// `issuer` field is overwritten with a different (also trusted) issuer's
/// name before resubmission. Since `issuer`/`issued_at` are bound into the
/// signed payload, the signature no longer matches and verification must
/// fail with `SIGNATURE_INVALID`.
#[tokio::test]
async fn s4_issuer_substitution_breaks_the_signature() {
    let (signing_key, verifying_key) = zkid_crypto::generate_keypair();
    let public_key_hex = hex::encode(verifying_key.to_bytes());

    let credential = sample_credential("42");
    let issued_at = Utc::now();
    let payload = zkid_crypto::canonical_payload(
        &credential.id,
        credential.commitment.as_decimal(),
        credential.created_at,
        "issuer-a",
        issued_at,
    );
    let signature = zkid_crypto::sign(&signing_key, payload.as_bytes());

    let mut signed = SignedCredential {
        credential,
        issuer: "issuer-a".to_string(),
        signature,
        issued_at,
    };
    // The attack: swap in a different issuer name the registry also trusts.
    signed.issuer = "issuer-b".to_string();

    let registry = InMemoryIssuerRegistry::new();
    for name in ["issuer-a", "issuer-b"] {
        registry
            .upsert(IssuerRecord {
                issuer: name.to_string(),
                public_key: public_key_hex.clone(),
                status: IssuerStatus::Active,
                valid_from: None,
                valid_to: None,
                jurisdiction: None,
            })
            .await;
    }

    let config = VerifierConfig::default();
    let verifier = VerifierBuilder::new(config)
        .vk_store(Arc::new(StaticVerifyingKeyStore::new()))
        .challenge_store(Arc::new(InMemoryChallengeStore::new()))
        .nonce_store(Arc::new(InMemoryNonceStore::new()))
        .issuer_registry(Arc::new(registry))
        .build()
        .unwrap();

    let challenge = verifier.create_challenge().await;
    let response = ProofResponse {
        proof: age_envelope(&challenge.nonce, challenge.request_timestamp_ms, 0, "42"),
        nonce: challenge.nonce.clone(),
        request_timestamp_ms: challenge.request_timestamp_ms,
        credential_id: Some(signed.credential.id.clone()),
        signed_credential: Some(signed),
    };

    let outcome = verifier.verify_proof(&response, None, None).await;
    assert!(!outcome.verified);
    assert!(outcome.error.unwrap().contains("SIGNATURE_INVALID"));
}

/// S5 — non-membership: a depth-4 sparse tree containing commitment `A`;
/// requesting a non-membership witness for a distinct, unoccupied `B`
/// yields a witness whose terminal leaf is zero and whose folding matches
/// the current root.
#[test]
fn s5_non_membership_witness_folds_to_the_current_root() {
    let mut tree = zkid_core::revocation::SparseMerkleTree::new(4).unwrap();
    let a = FieldElement::from_decimal("7").unwrap();
    tree.add(&a).unwrap();

    let mut b_n = 8u64;
    let b = loop {
        let candidate = FieldElement::from_decimal(b_n.to_string()).unwrap();
        if tree.get_non_membership_witness(&candidate).unwrap().is_some() {
            break candidate;
        }
        b_n += 1;
    };

    assert!(tree.get_witness(&b).unwrap().is_none(), "B occupies no leaf, so membership lookup must be None");

    let witness = tree.get_non_membership_witness(&b).unwrap().expect("B's slot is unoccupied");
    assert_eq!(witness.root, tree.get_root());
}

/// S6 — scenario VOTING_ELIGIBILITY_US: an age≥18 claim and a
/// nationality=840 claim proved together against one credential and one
/// shared nonce. The bundle consumes its outer challenge exactly once
/// regardless of how many claims it carries.
#[tokio::test]
async fn s6_voting_eligibility_scenario_has_two_claims_sharing_one_nonce() {
    let request = MultiClaimRequest::new(
        vec![
            ClaimSpec {
                label: "age-requirement".to_string(),
                claim_type: ClaimType::Age,
                min_age: Some(18),
                target_nationality: None,
            },
            ClaimSpec {
                label: "citizenship".to_string(),
                claim_type: ClaimType::Nationality,
                min_age: None,
                target_nationality: Some(840),
            },
        ],
        "shared-nonce".to_string(),
        Utc::now().timestamp_millis(),
    )
    .unwrap();

    let checks = zkid_core::scenario::expand(&request);
    assert_eq!(checks.len(), 2);
    assert!(checks.iter().all(|c| c.nonce == "shared-nonce"));
    assert_eq!(checks[0].label, "age-requirement");
    assert_eq!(checks[1].label, "citizenship");
}

/// The mismatched-nationality half of S6: a bundle whose claims disagree
/// on the shared credential is caught by bundle-consistency checking
/// before any claim's gates run.
#[tokio::test]
async fn s6_mismatched_bundle_is_rejected_as_inconsistent() {
    let shared_nonce = "shared-nonce";
    let ts = Utc::now().timestamp_millis();
    let age_proof = age_envelope(shared_nonce, ts, 18, "42");
    let mut nationality_proof = age_envelope(shared_nonce, ts, 0, "99"); // distinct credential_hash
    if let ProofEnvelope::Age { public_signals, .. } = &mut nationality_proof {
        public_signals.credential_hash = FieldElement::from_decimal("99").unwrap();
    }

    let err = zkid_core::scenario::check_bundle_consistency(&[&age_proof, &nationality_proof]).unwrap_err();
    assert!(format!("{err:?}").contains("BUNDLE_INCONSISTENT"));
}
