//! The per-variant `verify` operation and the parallel `verify_batch`. Each envelope's public signals are assembled in their defined
//! wire order and handed to `zkid_crypto::snark_verify`, mirroring
//! `ZkCredentialSystem::verify_proof`'s public-input vector assembly.

use std::sync::Arc;

use ark_bn254::Bn254;
use ark_groth16::PreparedVerifyingKey;

use zkid_crypto::{groth16::RawProof, parse_proof, snark_verify};
use zkid_types::{FieldElement, Groth16ProofData, ProofEnvelope, ZkIdResult};

use super::vk_store::VerifyingKeyStore;

fn to_raw(proof: &Groth16ProofData) -> RawProof {
    RawProof {
        pi_a: [proof.pi_a[0].as_decimal().to_string(), proof.pi_a[1].as_decimal().to_string()],
        pi_b: [
            [proof.pi_b[0][0].as_decimal().to_string(), proof.pi_b[0][1].as_decimal().to_string()],
            [proof.pi_b[1][0].as_decimal().to_string(), proof.pi_b[1][1].as_decimal().to_string()],
        ],
        pi_c: [proof.pi_c[0].as_decimal().to_string(), proof.pi_c[1].as_decimal().to_string()],
    }
}

fn public_signals(envelope: &ProofEnvelope) -> Vec<FieldElement> {
    match envelope {
        ProofEnvelope::Age { public_signals, .. } => vec![
            FieldElement::from_decimal(public_signals.current_year.to_string()).expect("u32 is always decimal"),
            FieldElement::from_decimal(public_signals.min_age.to_string()).expect("u8 is always decimal"),
            public_signals.credential_hash.clone(),
            nonce_field(&public_signals.nonce),
            FieldElement::from_decimal(public_signals.request_timestamp_ms.max(0).to_string())
                .expect("clamped timestamp is always decimal"),
        ],
        ProofEnvelope::Nationality { public_signals, .. } => vec![
            FieldElement::from_decimal(public_signals.target_nationality.to_string()).expect("u16 is always decimal"),
            public_signals.credential_hash.clone(),
            nonce_field(&public_signals.nonce),
            FieldElement::from_decimal(public_signals.request_timestamp_ms.max(0).to_string())
                .expect("clamped timestamp is always decimal"),
        ],
        ProofEnvelope::AgeRevocable { public_signals, .. } => vec![
            FieldElement::from_decimal(public_signals.current_year.to_string()).expect("u32 is always decimal"),
            FieldElement::from_decimal(public_signals.min_age.to_string()).expect("u8 is always decimal"),
            public_signals.credential_hash.clone(),
            public_signals.merkle_root.clone(),
            nonce_field(&public_signals.nonce),
            FieldElement::from_decimal(public_signals.request_timestamp_ms.max(0).to_string())
                .expect("clamped timestamp is always decimal"),
        ],
        ProofEnvelope::AgeSigned { public_signals, .. } => {
            let mut signals = vec![
                FieldElement::from_decimal(public_signals.current_year.to_string()).expect("u32 is always decimal"),
                FieldElement::from_decimal(public_signals.min_age.to_string()).expect("u8 is always decimal"),
                public_signals.credential_hash.clone(),
                nonce_field(&public_signals.nonce),
                FieldElement::from_decimal(public_signals.request_timestamp_ms.max(0).to_string())
                    .expect("clamped timestamp is always decimal"),
            ];
            signals.extend(bits_to_fields(&public_signals.issuer_public_key_bits));
            signals
        }
        ProofEnvelope::NationalitySigned { public_signals, .. } => {
            let mut signals = vec![
                FieldElement::from_decimal(public_signals.target_nationality.to_string())
                    .expect("u16 is always decimal"),
                public_signals.credential_hash.clone(),
                nonce_field(&public_signals.nonce),
                FieldElement::from_decimal(public_signals.request_timestamp_ms.max(0).to_string())
                    .expect("clamped timestamp is always decimal"),
            ];
            signals.extend(bits_to_fields(&public_signals.issuer_public_key_bits));
            signals
        }
    }
}

/// The nonce is a string on the wire but the SNARK's public-input vector is
/// entirely field elements; fold it in the same way the circuit would.
fn nonce_field(nonce: &str) -> FieldElement {
    zkid_crypto::fr_to_field(&zkid_crypto::string_to_fr(nonce))
}

fn bits_to_fields(bits: &[u8]) -> Vec<FieldElement> {
    bits.iter()
        .map(|b| FieldElement::from_decimal(if *b != 0 { "1" } else { "0" }).expect("bit is 0 or 1"))
        .collect()
}

fn proof_data(envelope: &ProofEnvelope) -> &Groth16ProofData {
    match envelope {
        ProofEnvelope::Age { proof, .. } => proof,
        ProofEnvelope::Nationality { proof, .. } => proof,
        ProofEnvelope::AgeRevocable { proof, .. } => proof,
        ProofEnvelope::AgeSigned { proof, .. } => proof,
        ProofEnvelope::NationalitySigned { proof, .. } => proof,
    }
}

/// Verify a single envelope against the verifying key for its variant.
/// `expected_merkle_root`, when supplied for the revocable variant, is
/// checked before the (expensive) SNARK call.
pub async fn verify(
    envelope: &ProofEnvelope,
    vk_store: &dyn VerifyingKeyStore,
    expected_merkle_root: Option<&FieldElement>,
) -> ZkIdResult<bool> {
    if let (Some(expected), Some(actual)) = (expected_merkle_root, envelope.merkle_root()) {
        if expected != actual {
            return Ok(false);
        }
    }

    let prepared_vk = vk_store.get(envelope.variant_name()).await?;
    verify_with_key(envelope, &prepared_vk)
}

/// Verify against an already-fetched prepared key (used by the batch path
/// to avoid repeated store round-trips when many proofs share a variant).
pub fn verify_with_key(envelope: &ProofEnvelope, prepared_vk: &PreparedVerifyingKey<Bn254>) -> ZkIdResult<bool> {
    let raw = to_raw(proof_data(envelope));
    let proof = parse_proof(&raw)?;
    let signals = public_signals(envelope);
    snark_verify(prepared_vk, &signals, &proof)
}

/// Outcome of verifying one entry in a batch.
#[derive(Debug, Clone)]
pub struct BatchEntryResult {
    pub verified: bool,
    pub error: Option<String>,
}

/// Aggregate result of `verify_batch`.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub results: Vec<BatchEntryResult>,
    pub all_verified: bool,
    pub verified_count: usize,
    pub total_count: usize,
}

/// Verify many `(envelope, vk)` pairs independently and in parallel, with
/// no forced cancellation of siblings on an individual failure.
pub async fn verify_batch(entries: &[(ProofEnvelope, Arc<PreparedVerifyingKey<Bn254>>)]) -> BatchResult {
    let futures = entries.iter().map(|(envelope, vk)| async move {
        match verify_with_key(envelope, vk) {
            Ok(verified) => BatchEntryResult { verified, error: None },
            Err(e) => BatchEntryResult {
                verified: false,
                error: Some(e.public_message()),
            },
        }
    });

    let results: Vec<BatchEntryResult> = futures::future::join_all(futures).await;
    let verified_count = results.iter().filter(|r| r.verified).count();
    let total_count = results.len();

    BatchResult {
        all_verified: verified_count == total_count,
        verified_count,
        total_count,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkid_types::{AgeRevocableSignals, Groth16ProofData};

    fn dummy_proof() -> Groth16ProofData {
        Groth16ProofData::new(
            [FieldElement::zero(), FieldElement::zero()],
            [[FieldElement::zero(), FieldElement::zero()], [FieldElement::zero(), FieldElement::zero()]],
            [FieldElement::zero(), FieldElement::zero()],
        )
    }

    struct EmptyVkStore;

    #[async_trait::async_trait]
    impl VerifyingKeyStore for EmptyVkStore {
        async fn get(&self, variant: &str) -> ZkIdResult<Arc<PreparedVerifyingKey<Bn254>>> {
            Err(zkid_types::ZkIdError::Config(format!("no key for {variant}")))
        }
    }

    #[tokio::test]
    async fn merkle_root_mismatch_short_circuits_before_the_vk_store() {
        let envelope = ProofEnvelope::AgeRevocable {
            proof: dummy_proof(),
            public_signals: AgeRevocableSignals {
                current_year: 2026,
                min_age: 21,
                credential_hash: FieldElement::from_decimal("1").unwrap(),
                merkle_root: FieldElement::from_decimal("2").unwrap(),
                nonce: "n".into(),
                request_timestamp_ms: 1,
            },
        };
        let expected_root = FieldElement::from_decimal("999").unwrap();
        let result = verify(&envelope, &EmptyVkStore, Some(&expected_root)).await.unwrap();
        assert!(!result);
    }
}
