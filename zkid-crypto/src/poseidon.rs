//! Canonical Poseidon hash over the BN254 scalar field.
//!
//! A single, unified configuration is used throughout zk-id: all
//! commitments, nullifiers, and Merkle tree operations MUST go through
//! these functions so that every component agrees on the same hash.
//!
//! ## Parameters
//! - Field: BN254 Fr (scalar field)
//! - Width: 3 (rate=2, capacity=1)
//! - Full rounds: 8, partial rounds: 57, S-box: x^5
//! - Round constants: Grain LFSR (arkworks standard)

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    poseidon::{find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge},
    CryptographicSponge,
};
use ark_ff::PrimeField;
use std::str::FromStr;
use std::sync::OnceLock;

use zkid_types::{FieldElement, ZkIdError, ZkIdResult};

static CANONICAL_CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();

/// The canonical Poseidon configuration, lazily built once per process.
pub fn canonical_config() -> &'static PoseidonConfig<Fr> {
    CANONICAL_CONFIG.get_or_init(|| {
        let rate = 2;
        let alpha = 5u64;
        let full_rounds = 8;
        let partial_rounds = 57;
        let field_bits = 254;

        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(field_bits, rate, full_rounds, partial_rounds, 0);

        PoseidonConfig {
            full_rounds,
            partial_rounds,
            alpha,
            ark,
            mds,
            rate,
            capacity: 1,
        }
    })
}

/// Hash an arbitrary number of field elements, returning the first
/// squeezed sponge output (the arkworks `PoseidonSponge` convention).
pub fn poseidon_hash_fields(inputs: &[Fr]) -> Fr {
    let config = canonical_config();
    let mut sponge = PoseidonSponge::new(config);
    for input in inputs {
        sponge.absorb(input);
    }
    sponge.squeeze_field_elements(1)[0]
}

pub fn poseidon_hash2_fields(left: Fr, right: Fr) -> Fr {
    poseidon_hash_fields(&[left, right])
}

pub fn poseidon_hash3_fields(a: Fr, b: Fr, c: Fr) -> Fr {
    poseidon_hash_fields(&[a, b, c])
}

/// Convert a field element to its canonical decimal-string wire form.
pub fn fr_to_field(fr: &Fr) -> FieldElement {
    // ark-ff's `Fp` implements `Display` as the decimal representation of
    // the underlying `BigInt`.
    FieldElement::from_decimal(fr.to_string()).expect("ark-ff Display always yields decimal digits")
}

/// Parse a decimal-string field element into `Fr`, reducing mod the field
/// order if the value is within range (it always is, by construction of
/// `FieldElement::from_decimal`, but out-of-range decimal strings from an
/// external source still parse — `Fr::from_str` reduces mod p).
pub fn field_to_fr(field: &FieldElement) -> ZkIdResult<Fr> {
    Fr::from_str(field.as_decimal())
        .map_err(|_| ZkIdError::Validation(format!("not a valid field element: {}", field)))
}

/// Convert 32 little-endian bytes to a field element (reduced mod order).
pub fn bytes_to_fr(bytes: &[u8; 32]) -> Fr {
    Fr::from_le_bytes_mod_order(bytes)
}

/// Convert a field element to 32 little-endian bytes.
pub fn fr_to_bytes(fr: &Fr) -> [u8; 32] {
    use ark_serialize::CanonicalSerialize;
    let mut bytes = [0u8; 32];
    fr.serialize_compressed(&mut bytes[..])
        .expect("Fr serialization into a 32-byte buffer cannot fail");
    bytes
}

/// Hash two 32-byte values (Merkle tree internal-node hashing).
pub fn poseidon_hash2_bytes(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    fr_to_bytes(&poseidon_hash2_fields(bytes_to_fr(left), bytes_to_fr(right)))
}

/// Hash a single 32-byte value (leaf hashing).
pub fn poseidon_hash1_bytes(data: &[u8; 32]) -> [u8; 32] {
    fr_to_bytes(&poseidon_hash_fields(&[bytes_to_fr(data)]))
}

/// Fold an opaque byte string (a session nonce, not itself a field element)
/// into `Fr` via Blake3 then reduction mod the field order.
pub fn string_to_fr(s: &str) -> Fr {
    let digest = *blake3::hash(s.as_bytes()).as_bytes();
    bytes_to_fr(&digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_and_order_sensitive() {
        let a = Fr::from(123u64);
        let b = Fr::from(456u64);

        let h1 = poseidon_hash2_fields(a, b);
        let h2 = poseidon_hash2_fields(a, b);
        assert_eq!(h1, h2, "hash must be deterministic");

        let h3 = poseidon_hash2_fields(b, a);
        assert_ne!(h1, h3, "hash must be order-sensitive");
    }

    #[test]
    fn field_element_round_trip() {
        let fr = Fr::from(0xdeadbeefu64);
        let field = fr_to_field(&fr);
        let restored = field_to_fr(&field).unwrap();
        assert_eq!(fr, restored);
    }

    #[test]
    fn bytes_round_trip() {
        let fr = Fr::from(12345u64);
        let bytes = fr_to_bytes(&fr);
        let restored = bytes_to_fr(&bytes);
        assert_eq!(fr, restored);
    }
}
