use serde::{Deserialize, Serialize};

use crate::credential::SignedCredential;
use crate::field::FieldElement;

/// The raw Groth16 proof triple, decimal-string encoded.
/// `pi_b` is the pair-of-pairs G2 point representation (`[[x0,x1],[y0,y1]]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Groth16ProofData {
    pub pi_a: [FieldElement; 2],
    pub pi_b: [[FieldElement; 2]; 2],
    pub pi_c: [FieldElement; 2],
    pub protocol: String,
    pub curve: String,
}

impl Groth16ProofData {
    pub fn new(pi_a: [FieldElement; 2], pi_b: [[FieldElement; 2]; 2], pi_c: [FieldElement; 2]) -> Self {
        Self {
            pi_a,
            pi_b,
            pi_c,
            protocol: "groth16".to_string(),
            curve: "bn128".to_string(),
        }
    }
}

/// Public signals for the `age` variant, in wire order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgeSignals {
    pub current_year: u32,
    pub min_age: u8,
    pub credential_hash: FieldElement,
    pub nonce: String,
    pub request_timestamp_ms: i64,
}

/// Public signals for the `nationality` variant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NationalitySignals {
    pub target_nationality: u16,
    pub credential_hash: FieldElement,
    pub nonce: String,
    pub request_timestamp_ms: i64,
}

/// Public signals for the `age-revocable` variant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgeRevocableSignals {
    pub current_year: u32,
    pub min_age: u8,
    pub credential_hash: FieldElement,
    pub merkle_root: FieldElement,
    pub nonce: String,
    pub request_timestamp_ms: i64,
}

/// Public signals for the `age-signed` variant: age fields plus the 256
/// in-circuit issuer public-key bits.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgeSignedSignals {
    pub current_year: u32,
    pub min_age: u8,
    pub credential_hash: FieldElement,
    pub nonce: String,
    pub request_timestamp_ms: i64,
    pub issuer_public_key_bits: Vec<u8>,
}

/// Public signals for the `nationality-signed` variant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NationalitySignedSignals {
    pub target_nationality: u16,
    pub credential_hash: FieldElement,
    pub nonce: String,
    pub request_timestamp_ms: i64,
    pub issuer_public_key_bits: Vec<u8>,
}

/// A tagged proof envelope. `proof_type` drives both (de)serialization and
/// dispatch in the verifier primitives.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "proof_type", rename_all = "kebab-case")]
pub enum ProofEnvelope {
    Age {
        #[serde(flatten)]
        proof: Groth16ProofData,
        public_signals: AgeSignals,
    },
    Nationality {
        #[serde(flatten)]
        proof: Groth16ProofData,
        public_signals: NationalitySignals,
    },
    AgeRevocable {
        #[serde(flatten)]
        proof: Groth16ProofData,
        public_signals: AgeRevocableSignals,
    },
    AgeSigned {
        #[serde(flatten)]
        proof: Groth16ProofData,
        public_signals: AgeSignedSignals,
    },
    NationalitySigned {
        #[serde(flatten)]
        proof: Groth16ProofData,
        public_signals: NationalitySignedSignals,
    },
}

impl ProofEnvelope {
    pub fn variant_name(&self) -> &'static str {
        match self {
            ProofEnvelope::Age { .. } => "age",
            ProofEnvelope::Nationality { .. } => "nationality",
            ProofEnvelope::AgeRevocable { .. } => "age-revocable",
            ProofEnvelope::AgeSigned { .. } => "age-signed",
            ProofEnvelope::NationalitySigned { .. } => "nationality-signed",
        }
    }

    pub fn nonce(&self) -> &str {
        match self {
            ProofEnvelope::Age { public_signals, .. } => &public_signals.nonce,
            ProofEnvelope::Nationality { public_signals, .. } => &public_signals.nonce,
            ProofEnvelope::AgeRevocable { public_signals, .. } => &public_signals.nonce,
            ProofEnvelope::AgeSigned { public_signals, .. } => &public_signals.nonce,
            ProofEnvelope::NationalitySigned { public_signals, .. } => &public_signals.nonce,
        }
    }

    pub fn request_timestamp_ms(&self) -> i64 {
        match self {
            ProofEnvelope::Age { public_signals, .. } => public_signals.request_timestamp_ms,
            ProofEnvelope::Nationality { public_signals, .. } => public_signals.request_timestamp_ms,
            ProofEnvelope::AgeRevocable { public_signals, .. } => public_signals.request_timestamp_ms,
            ProofEnvelope::AgeSigned { public_signals, .. } => public_signals.request_timestamp_ms,
            ProofEnvelope::NationalitySigned { public_signals, .. } => public_signals.request_timestamp_ms,
        }
    }

    pub fn credential_hash(&self) -> &FieldElement {
        match self {
            ProofEnvelope::Age { public_signals, .. } => &public_signals.credential_hash,
            ProofEnvelope::Nationality { public_signals, .. } => &public_signals.credential_hash,
            ProofEnvelope::AgeRevocable { public_signals, .. } => &public_signals.credential_hash,
            ProofEnvelope::AgeSigned { public_signals, .. } => &public_signals.credential_hash,
            ProofEnvelope::NationalitySigned { public_signals, .. } => &public_signals.credential_hash,
        }
    }

    pub fn merkle_root(&self) -> Option<&FieldElement> {
        match self {
            ProofEnvelope::AgeRevocable { public_signals, .. } => Some(&public_signals.merkle_root),
            _ => None,
        }
    }

    pub fn issuer_public_key_bits(&self) -> Option<&[u8]> {
        match self {
            ProofEnvelope::AgeSigned { public_signals, .. } => {
                Some(&public_signals.issuer_public_key_bits)
            }
            ProofEnvelope::NationalitySigned { public_signals, .. } => {
                Some(&public_signals.issuer_public_key_bits)
            }
            _ => None,
        }
    }

    pub fn min_age(&self) -> Option<u8> {
        match self {
            ProofEnvelope::Age { public_signals, .. } => Some(public_signals.min_age),
            ProofEnvelope::AgeRevocable { public_signals, .. } => Some(public_signals.min_age),
            ProofEnvelope::AgeSigned { public_signals, .. } => Some(public_signals.min_age),
            _ => None,
        }
    }

    pub fn target_nationality(&self) -> Option<u16> {
        match self {
            ProofEnvelope::Nationality { public_signals, .. } => Some(public_signals.target_nationality),
            ProofEnvelope::NationalitySigned { public_signals, .. } => {
                Some(public_signals.target_nationality)
            }
            _ => None,
        }
    }
}

/// The wire-level request body for `POST /verify`: the SNARK
/// envelope plus the session-level `{nonce, request_timestamp_ms}` the
/// challenge was issued for (bound, independently of the circuit's own
/// public signals, by verifier gates 7/8), and — when the verifier is
/// configured with `require_signed_credentials` — the accompanying
/// `SignedCredential` whose issuer signature and commitment are checked
/// against this same envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofResponse {
    pub proof: ProofEnvelope,
    pub nonce: String,
    pub request_timestamp_ms: i64,
    pub credential_id: Option<String>,
    pub signed_credential: Option<SignedCredential>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_proof() -> Groth16ProofData {
        Groth16ProofData::new(
            [FieldElement::zero(), FieldElement::zero()],
            [
                [FieldElement::zero(), FieldElement::zero()],
                [FieldElement::zero(), FieldElement::zero()],
            ],
            [FieldElement::zero(), FieldElement::zero()],
        )
    }

    #[test]
    fn codec_round_trip_age() {
        let envelope = ProofEnvelope::Age {
            proof: sample_proof(),
            public_signals: AgeSignals {
                current_year: 2026,
                min_age: 21,
                credential_hash: FieldElement::from_decimal("42").unwrap(),
                nonce: "abc".into(),
                request_timestamp_ms: 1000,
            },
        };
        let bytes = serde_json::to_vec(&envelope).unwrap();
        let decoded: ProofEnvelope = serde_json::from_slice(&bytes).unwrap();
        let re_encoded = serde_json::to_vec(&decoded).unwrap();
        assert_eq!(bytes, re_encoded);
        assert_eq!(decoded.variant_name(), "age");
    }

    #[test]
    fn unknown_proof_type_fails() {
        let bad = serde_json::json!({"proof_type": "quantum-teleport"});
        let result: Result<ProofEnvelope, _> = serde_json::from_value(bad);
        assert!(result.is_err());
    }
}
