//! Adapter over `ark-groth16`'s Groth16 verifier for BN254. This is the
//! `snark_verify` primitive: everything above this module only ever calls
//! `snark_verify` with an assembled public-signal vector, never touches
//! curve arithmetic directly.

use std::str::FromStr;

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof};
use ark_serialize::CanonicalDeserialize;
use ark_snark::SNARK;

use zkid_types::{FieldElement, ZkIdError, ZkIdResult};

pub use ark_groth16::VerifyingKey;

fn fq_from_decimal(s: &str) -> ZkIdResult<Fq> {
    Fq::from_str(s).map_err(|_| ZkIdError::Crypto(format!("not a valid base-field element: {s}")))
}

fn fq_to_decimal(fq: &Fq) -> String {
    fq.to_string()
}

/// Deserialize a compressed, `ark-serialize`-encoded verifying key.
pub fn load_verifying_key(bytes: &[u8]) -> ZkIdResult<VerifyingKey<Bn254>> {
    VerifyingKey::<Bn254>::deserialize_compressed(bytes)
        .map_err(|e| ZkIdError::Crypto(format!("failed to deserialize verifying key: {e}")))
}

/// Prepare a verifying key for repeated verification calls. Preparation is
/// the expensive part; callers should cache the result.
pub fn prepare_verifying_key(vk: &VerifyingKey<Bn254>) -> ZkIdResult<PreparedVerifyingKey<Bn254>> {
    Groth16::<Bn254>::process_vk(vk).map_err(|e| ZkIdError::Crypto(format!("failed to prepare verifying key: {e}")))
}

/// Public wire representation of a Groth16 proof (matches
/// `zkid_types::Groth16ProofData`, duplicated here to avoid a circular
/// dependency — `zkid-types` stays `ark`-free).
#[derive(Clone, Debug)]
pub struct RawProof {
    pub pi_a: [String; 2],
    pub pi_b: [[String; 2]; 2],
    pub pi_c: [String; 2],
}

/// Parse the decimal-string proof coordinates into an `ark-groth16` proof,
/// rejecting points that don't lie on the curve.
pub fn parse_proof(raw: &RawProof) -> ZkIdResult<Proof<Bn254>> {
    let ax = fq_from_decimal(&raw.pi_a[0])?;
    let ay = fq_from_decimal(&raw.pi_a[1])?;
    let a = G1Affine::new_unchecked(ax, ay);
    if !a.is_on_curve() {
        return Err(ZkIdError::Crypto("pi_a is not a point on BN254 G1".into()));
    }

    let bx0 = fq_from_decimal(&raw.pi_b[0][0])?;
    let bx1 = fq_from_decimal(&raw.pi_b[0][1])?;
    let by0 = fq_from_decimal(&raw.pi_b[1][0])?;
    let by1 = fq_from_decimal(&raw.pi_b[1][1])?;
    let b = G2Affine::new_unchecked(Fq2::new(bx0, bx1), Fq2::new(by0, by1));
    if !b.is_on_curve() {
        return Err(ZkIdError::Crypto("pi_b is not a point on BN254 G2".into()));
    }

    let cx = fq_from_decimal(&raw.pi_c[0])?;
    let cy = fq_from_decimal(&raw.pi_c[1])?;
    let c = G1Affine::new_unchecked(cx, cy);
    if !c.is_on_curve() {
        return Err(ZkIdError::Crypto("pi_c is not a point on BN254 G1".into()));
    }

    Ok(Proof { a, b, c })
}

/// Encode an `ark-groth16` proof back into decimal-string wire form.
pub fn encode_proof(proof: &Proof<Bn254>) -> RawProof {
    let (ax, ay) = proof.a.xy().expect("proof.a is never the point at infinity");
    let (bxy0, bxy1) = proof.b.xy().expect("proof.b is never the point at infinity");
    let (cx, cy) = proof.c.xy().expect("proof.c is never the point at infinity");

    RawProof {
        pi_a: [fq_to_decimal(ax), fq_to_decimal(ay)],
        pi_b: [
            [fq_to_decimal(&bxy0.c0), fq_to_decimal(&bxy0.c1)],
            [fq_to_decimal(&bxy1.c0), fq_to_decimal(&bxy1.c1)],
        ],
        pi_c: [fq_to_decimal(cx), fq_to_decimal(cy)],
    }
}

/// The `snark_verify` primitive: verify `proof` against `public_inputs`
/// (in the variant's defined wire order,) under `prepared_vk`.
pub fn snark_verify(
    prepared_vk: &PreparedVerifyingKey<Bn254>,
    public_inputs: &[FieldElement],
    proof: &Proof<Bn254>,
) -> ZkIdResult<bool> {
    let inputs: Vec<Fr> = public_inputs
        .iter()
        .map(|f| crate::poseidon::field_to_fr(f))
        .collect::<ZkIdResult<_>>()?;

    Groth16::<Bn254>::verify_with_processed_vk(prepared_vk, &inputs, proof)
        .map_err(|e| ZkIdError::Crypto(format!("proof verification error: {e}")))
}

