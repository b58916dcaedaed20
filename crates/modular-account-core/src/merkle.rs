//! Commutative binary Merkle tree over field elements
//!
//! Leaves are ordered by value (largest first) before the tree is built and
//! every node is `compress(min(a, b), max(a, b))`, so two trees built from
//! the same multiset of leaves always share a root no matter how the caller
//! enumerated them. Odd levels are padded with a single `0x0` node.
//!
//! ```text
//!            root
//!          /      \
//!       h(a,b)   h(c,0)      <- branches
//!       /   \     /
//!      l0   l1   l2          <- leaves (sorted)
//! ```

use crate::hash::compress;
use crate::types::felt_to_hex;
use crate::{Error, Result};
use starknet_types_core::felt::Felt;
use std::cmp::Ordering;

/// Numeric ordering of two field elements
fn felt_cmp(a: &Felt, b: &Felt) -> Ordering {
    a.to_bytes_be().cmp(&b.to_bytes_be())
}

/// Merkle tree with a commutative pairing rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    leaves: Vec<Felt>,
    branches: Vec<Vec<Felt>>,
    root: Felt,
}

impl MerkleTree {
    /// Build a tree over the given leaves
    ///
    /// An empty leaf set yields the `0x0` root (no restriction).
    pub fn new(leaves: impl IntoIterator<Item = Felt>) -> Self {
        let mut leaves: Vec<Felt> = leaves.into_iter().collect();
        leaves.sort_by(|a, b| felt_cmp(b, a));

        let mut branches = Vec::new();
        let root = if leaves.is_empty() {
            Felt::ZERO
        } else {
            let mut level = Self::next_level(&leaves);
            while level.len() > 1 {
                let next = Self::next_level(&level);
                branches.push(level);
                level = next;
            }
            level[0]
        };

        Self {
            leaves,
            branches,
            root,
        }
    }

    /// Hash two sibling nodes, smallest first
    pub fn hash_pair(a: &Felt, b: &Felt) -> Felt {
        match felt_cmp(a, b) {
            Ordering::Greater => compress(b, a),
            _ => compress(a, b),
        }
    }

    fn next_level(level: &[Felt]) -> Vec<Felt> {
        level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => Self::hash_pair(left, right),
                [single] => Self::hash_pair(single, &Felt::ZERO),
                _ => unreachable!("chunks(2) yields one or two elements"),
            })
            .collect()
    }

    /// Root commitment
    pub fn root(&self) -> Felt {
        self.root
    }

    /// Leaves in tree order
    pub fn leaves(&self) -> &[Felt] {
        &self.leaves
    }

    /// Intermediate levels between the leaves and the root
    pub fn branches(&self) -> &[Vec<Felt>] {
        &self.branches
    }

    /// Whether the tree contains the given leaf
    pub fn contains(&self, leaf: &Felt) -> bool {
        self.leaves.contains(leaf)
    }

    /// Sibling path from `leaf` up to the root
    pub fn proof(&self, leaf: &Felt) -> Result<Vec<Felt>> {
        let mut index = self
            .leaves
            .iter()
            .position(|l| l == leaf)
            .ok_or_else(|| Error::NotFound(format!("leaf {} not in tree", felt_to_hex(leaf))))?;

        let levels = std::iter::once(&self.leaves).chain(self.branches.iter());
        let mut path = Vec::with_capacity(self.branches.len() + 1);
        for level in levels {
            let sibling = level.get(index ^ 1).copied().unwrap_or(Felt::ZERO);
            path.push(sibling);
            index /= 2;
        }

        Ok(path)
    }

    /// Recompute the root from a leaf and its proof
    pub fn compute_root(leaf: &Felt, proof: &[Felt]) -> Felt {
        proof
            .iter()
            .fold(*leaf, |acc, sibling| Self::hash_pair(&acc, sibling))
    }

    /// Check a proof against a root
    pub fn verify(root: &Felt, leaf: &Felt, proof: &[Felt]) -> bool {
        Self::compute_root(leaf, proof) == *root
    }
}
