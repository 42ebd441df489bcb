//! Sparse Merkle revocation tree: a precomputed zero-hash vector built
//! once per tree, depth-first path folding with `poseidon_hash(left,
//! right)`, and sparse hash-addressed `(level, index)` storage so that
//! membership *and* non-membership witnesses, plus `LEAF_COLLISION`
//! detection, are expressible without materializing empty subtrees.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use zkid_crypto::{bytes_to_fr, fr_to_bytes, poseidon_hash2_bytes, poseidon_hash1_bytes};
use zkid_types::{FieldElement, RevocationRootInfo, RevocationWitness, ZkIdError, ZkIdResult, MAX_SMT_DEPTH};

/// A node's storage key: its level (0 = leaf row, `depth` = root) and the
/// suffix of the leaf path from that level up to the root. Every leaf
/// sharing that suffix converges on the same ancestor, giving sparse
/// `(level, index)` addressing proportional to occupied leaves.
type NodeKey = (usize, Vec<bool>);

pub struct SparseMerkleTree {
    depth: usize,
    zero_hashes: Vec<[u8; 32]>,
    nodes: HashMap<NodeKey, [u8; 32]>,
    /// path -> the commitment currently occupying that leaf slot.
    occupants: HashMap<Vec<bool>, FieldElement>,
    root_version: u64,
    updated_at: DateTime<Utc>,
}

use super::compute_zero_hashes;

/// The leaf path bits for `commitment`: the low `depth` bits (LSB-first)
/// of `poseidon_hash([commitment])`, i.e. `leaf_index(commitment) mod 2^depth`.
fn leaf_path(commitment: &FieldElement, depth: usize) -> ZkIdResult<Vec<bool>> {
    let fr = zkid_crypto::field_to_fr(commitment)?;
    let hashed = poseidon_hash1_bytes(&fr_to_bytes(&fr));
    Ok((0..depth).map(|i| (hashed[i / 8] >> (i % 8)) & 1 == 1).collect())
}

fn sibling_suffix(suffix: &[bool]) -> Vec<bool> {
    let mut s = suffix.to_vec();
    s[0] = !s[0];
    s
}

impl SparseMerkleTree {
    /// Construct a tree of `depth`.
    pub fn new(depth: usize) -> ZkIdResult<Self> {
        if depth < 1 || depth > MAX_SMT_DEPTH {
            return Err(ZkIdError::Config(format!(
                "revocation tree depth {depth} out of range [1, {MAX_SMT_DEPTH}]"
            )));
        }
        Ok(Self {
            zero_hashes: compute_zero_hashes(depth),
            depth,
            nodes: HashMap::new(),
            occupants: HashMap::new(),
            root_version: 0,
            updated_at: Utc::now(),
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn node_value(&self, level: usize, suffix: &[bool]) -> [u8; 32] {
        self.nodes
            .get(&(level, suffix.to_vec()))
            .copied()
            .unwrap_or(self.zero_hashes[level])
    }

    fn set_node(&mut self, level: usize, suffix: Vec<bool>, value: [u8; 32]) {
        if value == self.zero_hashes[level] {
            self.nodes.remove(&(level, suffix));
        } else {
            self.nodes.insert((level, suffix), value);
        }
    }

    /// Recompute the path from `leaf_value` at `path` up to the root,
    /// returning the new root and the `(siblings, path_indices)` walked.
    fn recompute_path(&mut self, path: &[bool], leaf_value: [u8; 32]) -> ([u8; 32], Vec<[u8; 32]>) {
        let mut suffix = path.to_vec();
        let mut current = leaf_value;
        let mut siblings = Vec::with_capacity(self.depth);

        self.set_node(0, suffix.clone(), current);

        for level in 0..self.depth {
            let sib_suffix = sibling_suffix(&suffix);
            let sibling = self.node_value(level, &sib_suffix);
            siblings.push(sibling);

            let (left, right) = if path[level] { (sibling, current) } else { (current, sibling) };
            current = poseidon_hash2_bytes(&left, &right);

            suffix = suffix[1..].to_vec();
            self.set_node(level + 1, suffix.clone(), current);
        }

        (current, siblings)
    }

    /// Idempotent add. Fails `LEAF_COLLISION`
    /// if a *different* commitment already occupies the computed slot.
    pub fn add(&mut self, commitment: &FieldElement) -> ZkIdResult<()> {
        let path = leaf_path(commitment, self.depth)?;

        if let Some(existing) = self.occupants.get(&path) {
            if existing == commitment {
                return Ok(());
            }
            return Err(ZkIdError::Crypto(
                "LEAF_COLLISION: slot already occupied by a different commitment".to_string(),
            ));
        }

        let fr = zkid_crypto::field_to_fr(commitment)?;
        let leaf_value = fr_to_bytes(&fr);
        let root_before = self.get_root_bytes();
        let (root_after, _) = self.recompute_path(&path, leaf_value);

        self.occupants.insert(path, commitment.clone());
        if root_after != root_before {
            self.root_version += 1;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Idempotent remove.
    pub fn remove(&mut self, commitment: &FieldElement) -> ZkIdResult<()> {
        let path = leaf_path(commitment, self.depth)?;

        match self.occupants.get(&path) {
            Some(existing) if existing == commitment => {}
            _ => return Ok(()),
        }

        let root_before = self.get_root_bytes();
        let (root_after, _) = self.recompute_path(&path, self.zero_hashes[0]);

        self.occupants.remove(&path);
        if root_after != root_before {
            self.root_version += 1;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn contains(&self, commitment: &FieldElement) -> ZkIdResult<bool> {
        let path = leaf_path(commitment, self.depth)?;
        Ok(self.occupants.get(&path).is_some_and(|c| c == commitment))
    }

    fn get_root_bytes(&self) -> [u8; 32] {
        self.node_value(self.depth, &[])
    }

    pub fn get_root(&self) -> FieldElement {
        zkid_crypto::fr_to_field(&bytes_to_fr(&self.get_root_bytes()))
    }

    pub fn get_root_info(&self) -> RevocationRootInfo {
        RevocationRootInfo {
            root: self.get_root(),
            version: self.root_version,
            updated_at: self.updated_at,
        }
    }

    fn witness_at(&self, path: &[bool]) -> RevocationWitness {
        let mut suffix = path.to_vec();
        let mut siblings = Vec::with_capacity(self.depth);
        for level in 0..self.depth {
            let sib_suffix = sibling_suffix(&suffix);
            siblings.push(zkid_crypto::fr_to_field(&bytes_to_fr(&self.node_value(level, &sib_suffix))));
            suffix = suffix[1..].to_vec();
        }
        RevocationWitness {
            root: self.get_root(),
            path_indices: path.to_vec(),
            siblings,
        }
    }

    /// Membership witness, or `None` if `commitment` is not tracked.
    pub fn get_witness(&self, commitment: &FieldElement) -> ZkIdResult<Option<RevocationWitness>> {
        let path = leaf_path(commitment, self.depth)?;
        if !self.occupants.get(&path).is_some_and(|c| c == commitment) {
            return Ok(None);
        }
        Ok(Some(self.witness_at(&path)))
    }

    /// Non-membership witness at `commitment`'s computed slot: only valid
    /// when that slot is empty and the commitment itself isn't tracked
    /// elsewhere (it can't be, since the slot is a pure function of the
    /// commitment — this just guards the degenerate zero-commitment case).
    pub fn get_non_membership_witness(&self, commitment: &FieldElement) -> ZkIdResult<Option<RevocationWitness>> {
        let path = leaf_path(commitment, self.depth)?;
        if self.occupants.contains_key(&path) {
            return Ok(None);
        }
        Ok(Some(self.witness_at(&path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn commitment(n: u64) -> FieldElement {
        FieldElement::from_decimal(n.to_string()).unwrap()
    }

    #[test]
    fn empty_tree_root_is_deterministic() {
        let t1 = SparseMerkleTree::new(4).unwrap();
        let t2 = SparseMerkleTree::new(4).unwrap();
        assert_eq!(t1.get_root(), t2.get_root());
    }

    #[test]
    fn add_then_witness_folds_to_root() {
        let mut tree = SparseMerkleTree::new(8).unwrap();
        let c = commitment(12345);
        tree.add(&c).unwrap();

        let witness = tree.get_witness(&c).unwrap().unwrap();
        assert_eq!(witness.root, tree.get_root());

        let mut current = fr_to_bytes(&zkid_crypto::field_to_fr(&c).unwrap());
        for (sibling, is_right) in witness.siblings.iter().zip(witness.path_indices.iter()) {
            let sib_bytes = fr_to_bytes(&zkid_crypto::field_to_fr(sibling).unwrap());
            current = if *is_right {
                poseidon_hash2_bytes(&sib_bytes, &current)
            } else {
                poseidon_hash2_bytes(&current, &sib_bytes)
            };
        }
        let folded_root = zkid_crypto::fr_to_field(&bytes_to_fr(&current));
        assert_eq!(folded_root, tree.get_root());
    }

    #[test]
    fn add_is_idempotent() {
        let mut tree = SparseMerkleTree::new(6).unwrap();
        let c = commitment(7);
        tree.add(&c).unwrap();
        let root_after_first = tree.get_root();
        let version_after_first = tree.root_version;

        tree.add(&c).unwrap();
        assert_eq!(tree.get_root(), root_after_first);
        assert_eq!(tree.root_version, version_after_first);
    }

    #[test]
    fn remove_is_idempotent_and_restores_empty_root() {
        let mut empty = SparseMerkleTree::new(6).unwrap();
        let empty_root = empty.get_root();

        let mut tree = SparseMerkleTree::new(6).unwrap();
        let c = commitment(99);
        tree.add(&c).unwrap();
        tree.remove(&c).unwrap();
        assert_eq!(tree.get_root(), empty_root);

        let version_after_remove = tree.root_version;
        tree.remove(&c).unwrap();
        assert_eq!(tree.root_version, version_after_remove);
        let _ = &mut empty;
    }

    #[test]
    fn non_membership_witness_has_zero_leaf_and_folds_to_root() {
        let mut tree = SparseMerkleTree::new(4).unwrap();
        let a = commitment(1);
        tree.add(&a).unwrap();

        // Find a commitment landing on a different slot than `a`.
        let mut b = commitment(2);
        while leaf_path(&b, 4).unwrap() == leaf_path(&a, 4).unwrap() {
            b = commitment(b.as_decimal().parse::<u64>().unwrap() + 1);
        }

        let witness = tree.get_non_membership_witness(&b).unwrap().unwrap();
        assert_eq!(witness.root, tree.get_root());

        let mut current = fr_to_bytes(&bytes_to_fr(&[0u8; 32]));
        for (sibling, is_right) in witness.siblings.iter().zip(witness.path_indices.iter()) {
            let sib_bytes = fr_to_bytes(&zkid_crypto::field_to_fr(sibling).unwrap());
            current = if *is_right {
                poseidon_hash2_bytes(&sib_bytes, &current)
            } else {
                poseidon_hash2_bytes(&current, &sib_bytes)
            };
        }
        assert_eq!(zkid_crypto::fr_to_field(&bytes_to_fr(&current)), tree.get_root());
    }

    #[test]
    fn collision_is_a_hard_failure() {
        let mut tree = SparseMerkleTree::new(1).unwrap();
        // depth 1 has only two slots; two distinct commitments are near-certain to collide.
        let a = commitment(10);
        let mut b = commitment(11);
        tree.add(&a).unwrap();
        while leaf_path(&b, 1).unwrap() != leaf_path(&a, 1).unwrap() {
            b = commitment(b.as_decimal().parse::<u64>().unwrap() + 1);
        }
        assert!(tree.add(&b).is_err());
    }

    proptest::proptest! {
        #[test]
        fn add_is_idempotent_for_any_commitment(n in 0u64..1_000_000) {
            let c = commitment(n);
            let mut tree = SparseMerkleTree::new(16).unwrap();
            tree.add(&c).unwrap();
            let root_after_first = tree.get_root();
            let version_after_first = tree.get_root_info().version;
            tree.add(&c).unwrap();
            prop_assert_eq!(tree.get_root(), root_after_first);
            prop_assert_eq!(tree.get_root_info().version, version_after_first);
        }

        #[test]
        fn version_never_decreases_across_a_random_add_remove_sequence(ns in proptest::collection::vec(0u64..64, 0..20)) {
            let mut tree = SparseMerkleTree::new(16).unwrap();
            let mut last_version = tree.get_root_info().version;
            for (i, n) in ns.iter().enumerate() {
                let c = commitment(*n);
                if i % 2 == 0 {
                    tree.add(&c).unwrap();
                } else {
                    tree.remove(&c).unwrap();
                }
                let version = tree.get_root_info().version;
                prop_assert!(version >= last_version);
                last_version = version;
            }
        }
    }
}
