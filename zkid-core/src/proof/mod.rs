//! Proof envelope codec and verifier primitives.

pub mod codec;
pub mod constraints;
pub mod verify;
pub mod vk_store;

pub use codec::{decode, encode};
pub use constraints::validate_constraints;
pub use verify::{verify as verify_envelope, verify_batch, verify_with_key, BatchEntryResult, BatchResult};
pub use vk_store::{StaticVerifyingKeyStore, VerifyingKeyStore};

use zkid_types::{ProofEnvelope, ZkIdError, ZkIdResult};

/// Compare the proof's in-circuit issuer public-key bits against the
/// registry's expected bits for a signed variant. Only meaningful after `verify_envelope` has already returned
/// `true` — this does not itself call the SNARK primitive.
pub fn check_issuer_bits(envelope: &ProofEnvelope, expected_bits: &[u8]) -> ZkIdResult<()> {
    match envelope.issuer_public_key_bits() {
        Some(bits) if bits == expected_bits => Ok(()),
        Some(_) => Err(ZkIdError::Proof("UNTRUSTED_ISSUER: issuer key bits do not match registry".into())),
        None => Err(ZkIdError::Internal(
            "check_issuer_bits called on a non-signed proof variant".into(),
        )),
    }
}

/// Expand a hex-encoded 32-byte Ed25519 public key into its 256 big-endian
/// bits, the same representation a signed-variant circuit exposes as
/// `issuer_public_key_bits`.
pub fn public_key_bits(public_key_hex: &str) -> ZkIdResult<Vec<u8>> {
    let bytes = hex::decode(public_key_hex)
        .map_err(|e| ZkIdError::Crypto(format!("invalid issuer public key hex: {e}")))?;
    if bytes.len() != 32 {
        return Err(ZkIdError::Crypto("issuer public key must be 32 bytes".into()));
    }
    Ok(bytes
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |i| (byte >> i) & 1))
        .collect())
}

#[cfg(test)]
mod public_key_bits_tests {
    use super::public_key_bits;

    #[test]
    fn expands_to_256_bits() {
        let hex = "aa".repeat(32);
        let bits = public_key_bits(&hex).unwrap();
        assert_eq!(bits.len(), 256);
        assert_eq!(&bits[..8], &[1, 0, 1, 0, 1, 0, 1, 0]);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(public_key_bits("aabb").is_err());
    }
}
