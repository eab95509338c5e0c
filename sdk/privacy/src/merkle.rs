//! Merkle Tree for Note Commitments
//!
//! Fixed-depth, append-only Poseidon tree over commitments, in the
//! convention of the on-chain tree the circuit checks against.
//!
//! ```text
//!                    Root
//!                   /    \
//!                 H01    H23
//!                /  \   /   \
//!               C0  C1 C2   Z0      Z0 = ZERO_VALUE
//!                                   Z[i+1] = H(Z[i], Z[i])
//! ```

use std::collections::HashMap;

use ark_ff::{MontFp, Zero};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commitment::Commitment;
use crate::error::PrivacyError;
use crate::field::{self, Field, poseidon2};

/// Depth of the deployed commitment tree.
pub const DEFAULT_DEPTH: usize = 28;

/// Deepest tree this implementation will index.
pub const MAX_DEPTH: usize = 32;

/// Value of an empty leaf.
pub const ZERO_VALUE: Field =
    MontFp!("21663839004416932945382355908790599225266501822907911457504978515578255421292");

/// A Merkle path proving inclusion of a leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    /// Sibling hashes from leaf to root
    #[serde(with = "crate::field::serde_decimal::vec")]
    pub siblings: Vec<Field>,
    /// Position bits (false = left, true = right)
    pub path_bits: Vec<bool>,
    /// The leaf position
    pub index: u64,
}

impl MerklePath {
    /// Verify that this path proves inclusion of `leaf` in `root`
    pub fn verify(&self, leaf: &Commitment, root: Field) -> bool {
        self.compute_root(leaf.to_field()) == root
    }

    /// Fold the leaf up through the siblings.
    pub fn compute_root(&self, leaf: Field) -> Field {
        self.siblings
            .iter()
            .zip(self.path_bits.iter())
            .fold(leaf, |current, (sibling, is_right)| {
                if *is_right {
                    poseidon2(*sibling, current)
                } else {
                    poseidon2(current, *sibling)
                }
            })
    }
}

/// Sparse Merkle Tree for note commitments
///
/// Only non-empty nodes are stored; empty subtrees resolve to the
/// precomputed zero chain.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    depth: usize,
    /// Non-empty nodes: (level, index) -> hash
    nodes: HashMap<(usize, u64), Field>,
    /// First position of each leaf value
    positions: HashMap<Field, u64>,
    /// Next available leaf position
    next_index: u64,
    zeros: Vec<Field>,
}

impl MerkleTree {
    /// Create a new empty tree of `1..=MAX_DEPTH` levels.
    pub fn new(depth: usize) -> Result<Self, PrivacyError> {
        if !(1..=MAX_DEPTH).contains(&depth) {
            return Err(PrivacyError::InvalidDepth { depth, max: MAX_DEPTH });
        }
        Ok(Self::with_depth(depth))
    }

    fn with_depth(depth: usize) -> Self {
        let mut zeros = Vec::with_capacity(depth + 1);
        zeros.push(ZERO_VALUE);
        for level in 0..depth {
            zeros.push(poseidon2(zeros[level], zeros[level]));
        }

        Self {
            depth,
            nodes: HashMap::new(),
            positions: HashMap::new(),
            next_index: 0,
            zeros,
        }
    }

    /// Build a tree from commitments in index order.
    pub fn from_leaves<I>(depth: usize, leaves: I) -> Result<Self, PrivacyError>
    where
        I: IntoIterator<Item = Commitment>,
    {
        let mut tree = Self::new(depth)?;
        tree.bulk_insert(leaves)?;
        Ok(tree)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of leaves the tree can hold.
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    pub fn len(&self) -> u64 {
        self.next_index
    }

    pub fn is_empty(&self) -> bool {
        self.next_index == 0
    }

    /// Empty-subtree root at `level`.
    pub fn zero_at(&self, level: usize) -> Field {
        self.zeros[level.min(self.depth)]
    }

    /// Get current root
    pub fn root(&self) -> Field {
        self.node(self.depth, 0)
    }

    /// Append a commitment and return its position
    pub fn insert(&mut self, leaf: Commitment) -> Result<u64, PrivacyError> {
        let index = self.next_index;
        self.bulk_insert(std::iter::once(leaf))?;
        Ok(index)
    }

    /// Append many commitments, rehashing each touched parent once.
    pub fn bulk_insert<I>(&mut self, leaves: I) -> Result<(), PrivacyError>
    where
        I: IntoIterator<Item = Commitment>,
    {
        let start = self.next_index;
        let mut overflow = false;
        for leaf in leaves {
            if self.next_index >= self.capacity() {
                overflow = true;
                break;
            }
            let value = leaf.to_field();
            self.nodes.insert((0, self.next_index), value);
            self.positions.entry(value).or_insert(self.next_index);
            self.next_index += 1;
        }
        if self.next_index > start {
            self.rehash(start);
        }
        if overflow {
            return Err(PrivacyError::TreeFull { depth: self.depth });
        }
        Ok(())
    }

    /// Recompute every ancestor of leaves `start..len`.
    fn rehash(&mut self, start: u64) {
        let (mut lo, mut hi) = (start, self.next_index - 1);
        for level in 0..self.depth {
            lo >>= 1;
            hi >>= 1;
            for parent in lo..=hi {
                let left = self.node(level, parent * 2);
                let right = self.node(level, parent * 2 + 1);
                self.nodes.insert((level + 1, parent), poseidon2(left, right));
            }
        }

        debug!(
            inserted = self.next_index - start,
            len = self.next_index,
            root = %field::to_hex(&self.root()),
            "commitment tree updated"
        );
    }

    /// Position of a commitment in the tree.
    pub fn index_of(&self, leaf: &Commitment) -> Result<u64, PrivacyError> {
        self.positions
            .get(&leaf.to_field())
            .copied()
            .ok_or_else(|| PrivacyError::CommitmentNotFound(leaf.to_hex()))
    }

    pub fn contains(&self, leaf: &Commitment) -> bool {
        self.positions.contains_key(&leaf.to_field())
    }

    /// Get commitment at position
    pub fn leaf(&self, index: u64) -> Option<Commitment> {
        self.nodes.get(&(0, index)).copied().map(Commitment::from_field)
    }

    /// Get Merkle path for a position
    pub fn path(&self, index: u64) -> Result<MerklePath, PrivacyError> {
        if index >= self.next_index {
            return Err(PrivacyError::LeafIndexOutOfRange {
                index,
                len: self.next_index,
            });
        }

        let mut siblings = Vec::with_capacity(self.depth);
        let mut path_bits = Vec::with_capacity(self.depth);
        let mut current = index;

        for level in 0..self.depth {
            let is_right = current & 1 == 1;
            path_bits.push(is_right);
            siblings.push(self.node(level, current ^ 1));
            current >>= 1;
        }

        Ok(MerklePath {
            siblings,
            path_bits,
            index,
        })
    }

    /// All-zero path at index 0, used for padding inputs that claim no membership.
    pub fn zero_path(&self) -> MerklePath {
        MerklePath {
            siblings: vec![Field::zero(); self.depth],
            path_bits: vec![false; self.depth],
            index: 0,
        }
    }

    fn node(&self, level: usize, index: u64) -> Field {
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or(self.zeros[level])
    }
}

impl Default for MerkleTree {
    fn default() -> Self {
        Self::with_depth(DEFAULT_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(n: u64) -> Commitment {
        Commitment::from_field(Field::from(n))
    }

    #[test]
    fn test_empty_tree() {
        let tree = MerkleTree::default();
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.depth(), DEFAULT_DEPTH);
        assert_eq!(tree.root(), tree.zero_at(DEFAULT_DEPTH));
        assert_eq!(tree.zero_at(1), poseidon2(ZERO_VALUE, ZERO_VALUE));
    }

    #[test]
    fn test_insert_and_path() {
        let mut tree = MerkleTree::new(10).unwrap();

        assert_eq!(tree.insert(c(1)).unwrap(), 0);
        assert_eq!(tree.insert(c(2)).unwrap(), 1);

        let path = tree.path(0).unwrap();
        assert_eq!(path.siblings.len(), 10);
        assert!(path.verify(&c(1), tree.root()));

        let path = tree.path(1).unwrap();
        assert!(path.path_bits[0]);
        assert_eq!(path.siblings[0], Field::from(1u64));
        assert!(path.verify(&c(2), tree.root()));
    }

    #[test]
    fn test_small_tree_root_by_hand() {
        let tree = MerkleTree::from_leaves(2, [c(1), c(2), c(3)]).unwrap();
        let left = poseidon2(Field::from(1u64), Field::from(2u64));
        let right = poseidon2(Field::from(3u64), ZERO_VALUE);
        assert_eq!(tree.root(), poseidon2(left, right));
    }

    #[test]
    fn test_bulk_matches_sequential() {
        let leaves: Vec<_> = (1..=9).map(c).collect();
        let bulk = MerkleTree::from_leaves(6, leaves.clone()).unwrap();

        let mut sequential = MerkleTree::new(6).unwrap();
        for leaf in leaves {
            sequential.insert(leaf).unwrap();
        }
        assert_eq!(bulk.root(), sequential.root());

        let mut split = MerkleTree::from_leaves(6, (1..=4).map(c)).unwrap();
        split.bulk_insert((5..=9).map(c)).unwrap();
        assert_eq!(bulk.root(), split.root());

        for i in 0..9 {
            assert!(bulk.path(i).unwrap().verify(&c(i + 1), bulk.root()));
        }
    }

    #[test]
    fn test_path_invalid_commitment() {
        let tree = MerkleTree::from_leaves(8, [c(1)]).unwrap();
        let path = tree.path(0).unwrap();
        assert!(!path.verify(&c(99), tree.root()));
    }

    #[test]
    fn test_root_changes() {
        let mut tree = MerkleTree::new(8).unwrap();
        let root0 = tree.root();
        tree.insert(c(1)).unwrap();
        let root1 = tree.root();
        tree.insert(c(2)).unwrap();
        assert_ne!(root0, root1, "root should change after insert");
        assert_ne!(root1, tree.root(), "root should change after each insert");
    }

    #[test]
    fn test_index_of_and_errors() {
        let tree = MerkleTree::from_leaves(4, [c(10), c(20), c(10)]).unwrap();
        assert_eq!(tree.index_of(&c(20)).unwrap(), 1);
        // duplicates resolve to the first occurrence
        assert_eq!(tree.index_of(&c(10)).unwrap(), 0);
        assert!(matches!(
            tree.index_of(&c(30)),
            Err(PrivacyError::CommitmentNotFound(_))
        ));
        assert_eq!(
            tree.path(3),
            Err(PrivacyError::LeafIndexOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(tree.leaf(2), Some(c(10)));
    }

    #[test]
    fn test_tree_full() {
        let mut tree = MerkleTree::from_leaves(1, [c(1), c(2)]).unwrap();
        assert_eq!(tree.insert(c(3)), Err(PrivacyError::TreeFull { depth: 1 }));
    }

    #[test]
    fn test_rejects_depth_out_of_range() {
        assert_eq!(
            MerkleTree::new(0).unwrap_err(),
            PrivacyError::InvalidDepth { depth: 0, max: MAX_DEPTH }
        );
        assert_eq!(
            MerkleTree::new(MAX_DEPTH + 1).unwrap_err(),
            PrivacyError::InvalidDepth { depth: 33, max: MAX_DEPTH }
        );
        assert!(MerkleTree::from_leaves(40, [c(1)]).is_err());
        assert_eq!(MerkleTree::new(MAX_DEPTH).unwrap().depth(), MAX_DEPTH);
    }

    #[test]
    fn test_zero_path() {
        let tree = MerkleTree::default();
        let path = tree.zero_path();
        assert_eq!(path.index, 0);
        assert_eq!(path.siblings.len(), DEFAULT_DEPTH);
        assert!(path.siblings.iter().all(|s| s.is_zero()));
    }
}
