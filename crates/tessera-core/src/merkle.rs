//! Binary Keccak Merkle tree over pre-hashed leaves.
//!
//! Leaves are padded with [`EMPTY_LEAF`] up to the next power of two and internal
//! nodes are `keccak256(left || right)`. The same tree backs both action bundles and
//! auth bundles, so the on-chain verifiers can share one proof routine.

use std::sync::LazyLock;

use alloy_primitives::{B256, keccak256};

/// Padding leaf: `keccak256` of 32 zero bytes.
pub static EMPTY_LEAF: LazyLock<B256> = LazyLock::new(|| keccak256(B256::ZERO));

/// Number of leaves in a tree built from `n` real leaves.
pub fn padded_size(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

fn hash_pair(left: &B256, right: &B256) -> B256 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left.as_slice());
    buf[32..].copy_from_slice(right.as_slice());
    keccak256(buf)
}

/// A fully materialized tree; `layers[0]` is the padded leaf level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    layers: Vec<Vec<B256>>,
    num_leaves: usize,
}

impl MerkleTree {
    /// Build a tree from leaf hashes in order.
    pub fn from_leaves(leaves: &[B256]) -> Self {
        let size = padded_size(leaves.len());
        let mut level: Vec<B256> = Vec::with_capacity(size);
        level.extend_from_slice(leaves);
        level.resize(size, *EMPTY_LEAF);

        let mut layers = vec![level];
        while layers[layers.len() - 1].len() > 1 {
            let next = layers[layers.len() - 1]
                .chunks_exact(2)
                .map(|pair| hash_pair(&pair[0], &pair[1]))
                .collect();
            layers.push(next);
        }

        Self {
            layers,
            num_leaves: leaves.len(),
        }
    }

    pub fn root(&self) -> B256 {
        self.layers[self.layers.len() - 1][0]
    }

    /// Real (non-padding) leaf count.
    pub fn num_leaves(&self) -> usize {
        self.num_leaves
    }

    /// Padded leaf level, padding included.
    pub fn leaves(&self) -> &[B256] {
        &self.layers[0]
    }

    /// Sibling path from leaf to root for a real leaf.
    ///
    /// Returns `None` for padding positions and out-of-range indexes.
    pub fn proof(&self, index: usize) -> Option<Vec<B256>> {
        if index >= self.num_leaves {
            return None;
        }
        let mut siblings = Vec::with_capacity(self.layers.len() - 1);
        let mut position = index;
        for layer in &self.layers[..self.layers.len() - 1] {
            siblings.push(layer[position ^ 1]);
            position /= 2;
        }
        Some(siblings)
    }
}

/// Recompute the root from a leaf and its sibling path and compare.
pub fn verify_proof(root: B256, leaf: B256, index: usize, siblings: &[B256]) -> bool {
    if siblings.len() >= usize::BITS as usize || index >> siblings.len() != 0 {
        return false;
    }
    let mut node = leaf;
    let mut position = index;
    for sibling in siblings {
        node = if position % 2 == 0 {
            hash_pair(&node, sibling)
        } else {
            hash_pair(sibling, &node)
        };
        position /= 2;
    }
    node == root
}
