//! Revocation accumulators: an in-memory sparse Merkle
//! tree and a Postgres-backed dense indexed tree, sharing the same
//! zero-hash precomputation and witness shape.

pub mod indexed;
pub mod sparse;

pub use indexed::IndexedTree;
pub use sparse::SparseMerkleTree;

use async_trait::async_trait;
use parking_lot::RwLock;

use zkid_crypto::{bytes_to_fr, fr_to_bytes, poseidon_hash2_bytes};
use zkid_types::{FieldElement, RevocationRootInfo, RevocationWitness, ZkIdResult};

/// Gate (10) of the verifier state machine needs one interface over either
/// revocation backend. `SparseMerkleTree`'s own API is synchronous
/// (in-process, no I/O); this wraps it behind the same `async` shape
/// `IndexedTree` already has, so the verifier can hold either behind a
/// single trait object. `get_root_info`/`get_witness` additionally serve
/// the `GET /revocation/root` and `GET /revocation/witness` HTTP routes
/// without the caller needing to know which concrete tree is
/// behind the trait object.
#[async_trait]
pub trait RevocationBackend: Send + Sync {
    async fn contains(&self, commitment: &FieldElement) -> ZkIdResult<bool>;
    async fn get_root(&self) -> ZkIdResult<FieldElement>;
    async fn get_root_info(&self) -> ZkIdResult<RevocationRootInfo>;
    async fn get_witness(&self, commitment: &FieldElement) -> ZkIdResult<Option<RevocationWitness>>;
    /// Admin-path mutation (`zkid-server`'s `revoke` subcommand), never
    /// called from the verify path itself. Writer-exclusive.
    async fn add(&self, commitment: &FieldElement) -> ZkIdResult<()>;
    async fn remove(&self, commitment: &FieldElement) -> ZkIdResult<()>;
}

/// `RevocationBackend` over an in-memory sparse tree guarded by a lock,
/// since `add`/`remove` take `&mut self`.
pub struct SparseRevocationBackend(pub RwLock<SparseMerkleTree>);

impl SparseRevocationBackend {
    pub fn new(tree: SparseMerkleTree) -> Self {
        Self(RwLock::new(tree))
    }
}

#[async_trait]
impl RevocationBackend for SparseRevocationBackend {
    async fn contains(&self, commitment: &FieldElement) -> ZkIdResult<bool> {
        self.0.read().contains(commitment)
    }

    async fn get_root(&self) -> ZkIdResult<FieldElement> {
        Ok(self.0.read().get_root())
    }

    async fn get_root_info(&self) -> ZkIdResult<RevocationRootInfo> {
        Ok(self.0.read().get_root_info())
    }

    async fn get_witness(&self, commitment: &FieldElement) -> ZkIdResult<Option<RevocationWitness>> {
        self.0.read().get_witness(commitment)
    }

    async fn add(&self, commitment: &FieldElement) -> ZkIdResult<()> {
        self.0.write().add(commitment)
    }

    async fn remove(&self, commitment: &FieldElement) -> ZkIdResult<()> {
        self.0.write().remove(commitment)
    }
}

#[async_trait]
impl RevocationBackend for IndexedTree {
    async fn contains(&self, commitment: &FieldElement) -> ZkIdResult<bool> {
        IndexedTree::contains(self, commitment).await
    }

    async fn get_root(&self) -> ZkIdResult<FieldElement> {
        IndexedTree::get_root(self).await
    }

    async fn get_root_info(&self) -> ZkIdResult<RevocationRootInfo> {
        IndexedTree::get_root_info(self).await
    }

    async fn get_witness(&self, commitment: &FieldElement) -> ZkIdResult<Option<RevocationWitness>> {
        IndexedTree::get_witness(self, commitment).await
    }

    async fn add(&self, commitment: &FieldElement) -> ZkIdResult<()> {
        IndexedTree::add(self, commitment).await
    }

    async fn remove(&self, commitment: &FieldElement) -> ZkIdResult<()> {
        IndexedTree::remove(self, commitment).await
    }
}

/// `zero_hashes[0] = 0`, `zero_hashes[i+1] = poseidon_hash(zero_hashes[i],
/// zero_hashes[i])`, shared by both tree implementations.
pub(crate) fn compute_zero_hashes(depth: usize) -> Vec<[u8; 32]> {
    let mut hashes = Vec::with_capacity(depth + 1);
    hashes.push(fr_to_bytes(&bytes_to_fr(&[0u8; 32])));
    for _ in 0..depth {
        let prev = *hashes.last().unwrap();
        hashes.push(poseidon_hash2_bytes(&prev, &prev));
    }
    hashes
}

/// Table/column identifiers for the indexed tree must match
/// `^[A-Za-z_][A-Za-z0-9_]*$`.
pub(crate) fn is_valid_sql_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_validation() {
        assert!(is_valid_sql_identifier("revocation_tree"));
        assert!(is_valid_sql_identifier("_leading_underscore"));
        assert!(!is_valid_sql_identifier("1starts_with_digit"));
        assert!(!is_valid_sql_identifier("has space"));
        assert!(!is_valid_sql_identifier("has-dash"));
        assert!(!is_valid_sql_identifier(""));
    }
}
