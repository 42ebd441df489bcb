//! Cryptographic primitives for zk-id: Poseidon hashing, commitment
//! computation, Ed25519 issuer signatures, and the Groth16/BN254 proof
//! adapter. Every function here operates on `ark_bn254::Fr`/`Fq` or raw
//! bytes; conversions to and from the wire-level `FieldElement` live at
//! the edges of each module so the rest of the workspace never has to
//! import `ark-*` directly.

pub mod commitment;
pub mod ed25519;
pub mod groth16;
pub mod poseidon;

pub use commitment::{compute_commitment, random_salt, salt_to_fr};
pub use ed25519::{canonical_payload, generate_keypair, sign, verify as verify_signature};
pub use groth16::{
    encode_proof, load_verifying_key, parse_proof, prepare_verifying_key, snark_verify, RawProof, VerifyingKey,
};
pub use poseidon::{
    bytes_to_fr, canonical_config, field_to_fr, fr_to_bytes, fr_to_field, poseidon_hash1_bytes, poseidon_hash2_bytes,
    poseidon_hash2_fields, poseidon_hash3_fields, poseidon_hash_fields, string_to_fr,
};

pub use ark_bn254::{Bn254, Fr};
