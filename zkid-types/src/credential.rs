use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::field::FieldElement;

/// An issued credential. Immutable after creation; `commitment` binds
/// `birth_year`, `nationality`, and `salt` via Poseidon.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    pub birth_year: u16,
    pub nationality: u16,
    /// Lowercase hex encoding of a 32-byte salt, uniform over the field.
    pub salt: String,
    pub commitment: FieldElement,
    pub created_at: DateTime<Utc>,
}

/// The external (interchange) form: strips `salt`, adds `issuer_did`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternalCredential {
    pub id: String,
    pub birth_year: u16,
    pub nationality: u16,
    pub commitment: FieldElement,
    pub created_at: DateTime<Utc>,
    pub issuer_did: String,
}

/// A credential accompanied by an issuer's Ed25519 signature over the
/// canonical payload. `issuer` and `issued_at` are bound into
/// the signature to prevent issuer-substitution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedCredential {
    pub credential: Credential,
    pub issuer: String,
    /// Standard base64 (with padding) encoding of the 64-byte Ed25519 signature.
    pub signature: String,
    pub issued_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_credential_strips_salt_and_adds_issuer_did() {
        let external = ExternalCredential {
            id: "cred-1".into(),
            birth_year: 1990,
            nationality: 840,
            commitment: FieldElement::from_decimal("123").unwrap(),
            created_at: Utc::now(),
            issuer_did: "did:example:issuer".into(),
        };
        let value = serde_json::to_value(&external).unwrap();
        assert!(value.get("salt").is_none());
        assert!(value.get("issuer_did").is_some());
    }
}
