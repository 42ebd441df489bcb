//! Multi-claim and scenario layer: expand a `MultiClaimRequest`
//! into independent per-claim checks sharing one nonce/timestamp, and
//! aggregate their individual results back into a bundle verdict.

use zkid_types::{ClaimResult, ClaimSpec, ClaimType, MultiClaimRequest, ProofEnvelope, ZkIdError, ZkIdResult};

/// One claim's worth of work, still carrying the bundle's shared nonce and
/// timestamp.
#[derive(Clone, Debug)]
pub struct ClaimCheck {
    pub label: String,
    pub claim_type: ClaimType,
    pub min_age: Option<u8>,
    pub target_nationality: Option<u16>,
    pub nonce: String,
    pub request_timestamp_ms: i64,
}

/// Expand a bundle request into one check per claim.
pub fn expand(request: &MultiClaimRequest) -> Vec<ClaimCheck> {
    request
        .claims
        .iter()
        .map(|claim: &ClaimSpec| ClaimCheck {
            label: claim.label.clone(),
            claim_type: claim.claim_type,
            min_age: claim.min_age,
            target_nationality: claim.target_nationality,
            nonce: request.nonce.clone(),
            request_timestamp_ms: request.request_timestamp_ms,
        })
        .collect()
}

/// Verify that every proof in a bundle shares the same outer nonce,
/// timestamp, and credential — `BUNDLE_INCONSISTENT` otherwise.
pub fn check_bundle_consistency(proofs: &[&ProofEnvelope]) -> ZkIdResult<()> {
    let Some((first, rest)) = proofs.split_first() else {
        return Ok(());
    };

    let nonce = first.nonce();
    let timestamp = first.request_timestamp_ms();
    let credential_hash = first.credential_hash();

    for proof in rest {
        if proof.nonce() != nonce || proof.request_timestamp_ms() != timestamp || proof.credential_hash() != credential_hash {
            return Err(ZkIdError::Proof("BUNDLE_INCONSISTENT".to_string()));
        }
    }
    Ok(())
}

/// Fold per-claim results into the bundle verdict.
pub fn aggregate(results: Vec<ClaimResult>) -> zkid_types::AggregatedResult {
    zkid_types::AggregatedResult::from_results(results)
}
