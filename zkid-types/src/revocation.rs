use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::field::FieldElement;

/// Default / maximum sparse Merkle tree depth.
pub const DEFAULT_SMT_DEPTH: usize = 20;
pub const MAX_SMT_DEPTH: usize = 254;

/// Maximum depth for the dense, Postgres-backed indexed tree.
pub const MAX_INDEXED_DEPTH: usize = 20;

/// A Merkle inclusion/non-inclusion witness: the sibling hashes and
/// direction bits from leaf to root.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RevocationWitness {
    pub root: FieldElement,
    /// `true` if, at that level, the current node is the right child.
    pub path_indices: Vec<bool>,
    pub siblings: Vec<FieldElement>,
}

/// The current accumulator root plus a monotonic version counter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RevocationRootInfo {
    pub root: FieldElement,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}
