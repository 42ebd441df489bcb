//! Credential construction and validation. Pure functions, no
//! I/O: building over `zkid_crypto::commitment` for the Poseidon binding and
//! `zkid_crypto::ed25519`/ `zkid_crypto::poseidon` for the signed form.

use chrono::{DateTime, Datelike, Utc};

use zkid_crypto::compute_commitment;
use zkid_types::{Credential, ExternalCredential, ZkIdError, ZkIdResult};

const MIN_BIRTH_YEAR: u16 = 1900;

fn current_year() -> u16 {
    Utc::now().year() as u16
}

/// Build a fresh credential for `birth_year`/`nationality`, generating a
/// random salt and deriving the commitment.
pub fn create(id: impl Into<String>, birth_year: u16, nationality: u16) -> ZkIdResult<Credential> {
    let salt = zkid_crypto::random_salt();
    let commitment = compute_commitment(birth_year, nationality, &salt)?;
    let credential = Credential {
        id: id.into(),
        birth_year,
        nationality,
        salt,
        commitment,
        created_at: Utc::now(),
    };
    validate(&credential)?;
    Ok(credential)
}

/// Validate a credential's attribute ranges and commitment binding,
/// returning `INVALID_FORMAT` on any violation.
pub fn validate(credential: &Credential) -> ZkIdResult<()> {
    let this_year = current_year();
    if credential.birth_year < MIN_BIRTH_YEAR || credential.birth_year > this_year {
        return Err(ZkIdError::Validation(format!(
            "INVALID_FORMAT: birth_year {} out of range [{MIN_BIRTH_YEAR}, {this_year}]",
            credential.birth_year
        )));
    }
    if credential.nationality < 1 || credential.nationality > 999 {
        return Err(ZkIdError::Validation(format!(
            "INVALID_FORMAT: nationality {} out of range [1, 999]",
            credential.nationality
        )));
    }
    if credential.id.is_empty() {
        return Err(ZkIdError::Validation("INVALID_FORMAT: credential id is empty".into()));
    }

    let expected = compute_commitment(credential.birth_year, credential.nationality, &credential.salt)?;
    if expected != credential.commitment {
        return Err(ZkIdError::Validation(
            "INVALID_FORMAT: commitment does not match birth_year/nationality/salt".into(),
        ));
    }

    Ok(())
}

/// Recompute a credential's commitment.
pub fn commitment(credential: &Credential) -> ZkIdResult<zkid_types::FieldElement> {
    compute_commitment(credential.birth_year, credential.nationality, &credential.salt)
}

/// Reconstruct the internal credential from its external (salt-stripped)
/// interchange form, re-deriving the commitment and failing if it doesn't
/// match the one the external record carries.
pub fn from_external(
    external: &ExternalCredential,
    credential_id: impl Into<String>,
    salt: impl Into<String>,
    created_at: DateTime<Utc>,
) -> ZkIdResult<Credential> {
    let salt = salt.into();
    let recomputed = compute_commitment(external.birth_year, external.nationality, &salt)?;
    if recomputed != external.commitment {
        return Err(ZkIdError::Validation(
            "INVALID_FORMAT: recomputed commitment does not match external credential".into(),
        ));
    }

    let credential = Credential {
        id: credential_id.into(),
        birth_year: external.birth_year,
        nationality: external.nationality,
        salt,
        commitment: external.commitment.clone(),
        created_at,
    };
    validate(&credential)?;
    Ok(credential)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_produces_a_valid_credential() {
        let credential = create("cred-1", 1990, 840).unwrap();
        assert!(validate(&credential).is_ok());
    }

    #[test]
    fn rejects_out_of_range_birth_year() {
        let mut credential = create("cred-1", 1990, 840).unwrap();
        credential.birth_year = 1899;
        assert!(validate(&credential).is_err());
    }

    #[test]
    fn rejects_out_of_range_nationality() {
        let mut credential = create("cred-1", 1990, 840).unwrap();
        credential.nationality = 1000;
        assert!(validate(&credential).is_err());
    }

    #[test]
    fn tampered_commitment_fails_validation() {
        let mut credential = create("cred-1", 1990, 840).unwrap();
        credential.commitment = zkid_types::FieldElement::zero();
        assert!(validate(&credential).is_err());
    }

    #[test]
    fn from_external_round_trips() {
        let credential = create("cred-1", 1990, 840).unwrap();
        let external = ExternalCredential {
            id: credential.id.clone(),
            birth_year: credential.birth_year,
            nationality: credential.nationality,
            commitment: credential.commitment.clone(),
            created_at: credential.created_at,
            issuer_did: "did:example:issuer".to_string(),
        };

        let restored = from_external(&external, "cred-1", credential.salt.clone(), credential.created_at).unwrap();
        assert_eq!(restored.commitment, credential.commitment);
    }

    #[test]
    fn from_external_rejects_salt_mismatch() {
        let credential = create("cred-1", 1990, 840).unwrap();
        let external = ExternalCredential {
            id: credential.id.clone(),
            birth_year: credential.birth_year,
            nationality: credential.nationality,
            commitment: credential.commitment.clone(),
            created_at: credential.created_at,
            issuer_did: "did:example:issuer".to_string(),
        };

        assert!(from_external(&external, "cred-1", zkid_crypto::random_salt(), credential.created_at).is_err());
    }
}
