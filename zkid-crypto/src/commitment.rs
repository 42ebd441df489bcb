//! Credential commitment computation:
//! `commitment = poseidon_hash(birth_year, nationality, salt)`.

use ark_bn254::Fr;

use zkid_types::{FieldElement, ZkIdError, ZkIdResult};

use crate::poseidon::{bytes_to_fr, fr_to_field, poseidon_hash3_fields};

/// Decode a lowercase-hex 32-byte salt into its field representation.
pub fn salt_to_fr(salt_hex: &str) -> ZkIdResult<Fr> {
    let bytes = hex::decode(salt_hex)
        .map_err(|e| ZkIdError::Validation(format!("salt is not valid hex: {e}")))?;
    if bytes.len() != 32 {
        return Err(ZkIdError::Validation(format!(
            "salt must decode to 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(bytes_to_fr(&arr))
}

/// Compute the Poseidon commitment binding `birth_year`, `nationality`, and
/// `salt` (lowercase hex).
pub fn compute_commitment(birth_year: u16, nationality: u16, salt_hex: &str) -> ZkIdResult<FieldElement> {
    let salt_fr = salt_to_fr(salt_hex)?;
    let commitment = poseidon_hash3_fields(Fr::from(birth_year as u64), Fr::from(nationality as u64), salt_fr);
    Ok(fr_to_field(&commitment))
}

/// Generate a fresh, uniformly random 32-byte salt, lowercase-hex encoded.
pub fn random_salt() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn commitment_is_deterministic_and_binds_all_inputs() {
        let salt = "aa".repeat(32);
        let c1 = compute_commitment(1990, 840, &salt).unwrap();
        let c2 = compute_commitment(1990, 840, &salt).unwrap();
        assert_eq!(c1, c2);

        let c3 = compute_commitment(1991, 840, &salt).unwrap();
        assert_ne!(c1, c3);

        let c4 = compute_commitment(1990, 826, &salt).unwrap();
        assert_ne!(c1, c4);

        let other_salt = "bb".repeat(32);
        let c5 = compute_commitment(1990, 840, &other_salt).unwrap();
        assert_ne!(c1, c5);
    }

    #[test]
    fn rejects_malformed_salt() {
        assert!(compute_commitment(1990, 840, "not-hex").is_err());
        assert!(compute_commitment(1990, 840, "aa").is_err());
    }

    proptest::proptest! {
        #[test]
        fn commitment_is_deterministic_for_any_inputs(
            birth_year in 1900u16..2100,
            nationality in 1u16..999,
            salt_byte in any::<u8>(),
        ) {
            let salt = hex::encode([salt_byte; 32]);
            let c1 = compute_commitment(birth_year, nationality, &salt).unwrap();
            let c2 = compute_commitment(birth_year, nationality, &salt).unwrap();
            assert_eq!(c1, c2);
        }

        #[test]
        fn changing_birth_year_alone_changes_the_commitment(
            birth_year in 1900u16..2099,
            nationality in 1u16..999,
            salt_byte in any::<u8>(),
        ) {
            let salt = hex::encode([salt_byte; 32]);
            let c1 = compute_commitment(birth_year, nationality, &salt).unwrap();
            let c2 = compute_commitment(birth_year + 1, nationality, &salt).unwrap();
            assert_ne!(c1, c2);
        }
    }
}
