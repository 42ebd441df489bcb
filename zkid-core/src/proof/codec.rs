//! Proof envelope wire codec. `serde_json`'s internally-tagged
//! enum with `#[serde(flatten)]` already gives us canonical, byte-exact
//! round-tripping (`zkid_types::ProofEnvelope`'s own tests cover that); this
//! module adds the `UNKNOWN_PROOF_TYPE` taxonomy the bare `serde_json` error
//! doesn't carry.

use zkid_types::{ProofEnvelope, ZkIdError, ZkIdResult};

/// Decode a wire-format proof envelope, translating an unrecognized
/// `proof_type` into a dedicated `UNKNOWN_PROOF_TYPE` error rather than a
/// generic deserialization failure.
pub fn decode(bytes: &[u8]) -> ZkIdResult<ProofEnvelope> {
    match serde_json::from_slice::<ProofEnvelope>(bytes) {
        Ok(envelope) => Ok(envelope),
        Err(e) => {
            if let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) {
                if let Some(tag) = value.get("proof_type").and_then(|v| v.as_str()) {
                    if !matches!(
                        tag,
                        "age" | "nationality" | "age-revocable" | "age-signed" | "nationality-signed"
                    ) {
                        return Err(ZkIdError::Proof(format!("UNKNOWN_PROOF_TYPE: {tag}")));
                    }
                } else {
                    return Err(ZkIdError::Proof("UNKNOWN_PROOF_TYPE: missing proof_type".into()));
                }
            }
            Err(ZkIdError::Validation(format!("malformed proof envelope: {e}")))
        }
    }
}

/// Encode a proof envelope to its canonical wire bytes.
pub fn encode(envelope: &ProofEnvelope) -> ZkIdResult<Vec<u8>> {
    serde_json::to_vec(envelope).map_err(|e| ZkIdError::Internal(format!("failed to encode proof envelope: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_proof_type_is_a_dedicated_error() {
        let bytes = br#"{"proof_type":"quantum-teleport"}"#;
        let err = decode(bytes).unwrap_err();
        assert!(err.to_string().contains("UNKNOWN_PROOF_TYPE") || matches!(err, ZkIdError::Proof(_)));
    }

    #[test]
    fn round_trip_is_byte_exact() {
        let envelope = zkid_types::ProofEnvelope::Nationality {
            proof: zkid_types::Groth16ProofData::new(
                [zkid_types::FieldElement::zero(), zkid_types::FieldElement::zero()],
                [
                    [zkid_types::FieldElement::zero(), zkid_types::FieldElement::zero()],
                    [zkid_types::FieldElement::zero(), zkid_types::FieldElement::zero()],
                ],
                [zkid_types::FieldElement::zero(), zkid_types::FieldElement::zero()],
            ),
            public_signals: zkid_types::NationalitySignals {
                target_nationality: 840,
                credential_hash: zkid_types::FieldElement::from_decimal("1").unwrap(),
                nonce: "n".into(),
                request_timestamp_ms: 1,
            },
        };
        let bytes = encode(&envelope).unwrap();
        let decoded = decode(&bytes).unwrap();
        let re_encoded = encode(&decoded).unwrap();
        assert_eq!(bytes, re_encoded);
    }
}
