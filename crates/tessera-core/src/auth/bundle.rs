//! Merkle tree over the auth leaves of every chain in a proposal.

use std::collections::BTreeMap;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use super::leaf::AuthLeaf;
use crate::merkle::{MerkleTree, verify_proof};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundledAuthLeaf {
    pub leaf: AuthLeaf,
    /// Position in the tree.
    pub position: usize,
    pub siblings: Vec<B256>,
}

impl BundledAuthLeaf {
    pub fn verify(&self, root: B256) -> bool {
        verify_proof(root, self.leaf.hash(), self.position, &self.siblings)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthBundle {
    pub root: B256,
    pub leaves: Vec<BundledAuthLeaf>,
}

impl AuthBundle {
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Chain id -> number of leaves, ascending by chain id.
    pub fn leaf_counts(&self) -> BTreeMap<u64, usize> {
        let mut counts = BTreeMap::new();
        for bundled in &self.leaves {
            *counts.entry(bundled.leaf.chain_id).or_insert(0) += 1;
        }
        counts
    }

    pub fn verify(&self) -> bool {
        self.leaves.iter().all(|bundled| bundled.verify(self.root))
    }
}

/// Commit to `leaves` in the given order. Auth leaves are never reordered.
pub fn make_auth_bundle(leaves: Vec<AuthLeaf>) -> AuthBundle {
    let hashes: Vec<B256> = leaves.iter().map(AuthLeaf::hash).collect();
    let tree = MerkleTree::from_leaves(&hashes);
    let leaves = leaves
        .into_iter()
        .enumerate()
        .map(|(position, leaf)| BundledAuthLeaf {
            leaf,
            position,
            siblings: tree.proof(position).unwrap_or_default(),
        })
        .collect();
    AuthBundle {
        root: tree.root(),
        leaves,
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;

    use super::*;
    use crate::auth::leaf::LeafPayload;

    fn leaf(chain_id: u64, index: u64) -> AuthLeaf {
        AuthLeaf::new(chain_id, index, Address::ZERO, &LeafPayload::Propose { num_leafs: 1 })
    }

    #[test]
    fn keeps_input_order_and_verifies() {
        let bundle = make_auth_bundle(vec![leaf(10, 0), leaf(1, 0), leaf(10, 1)]);
        assert!(bundle.verify());
        assert_eq!(bundle.leaves[0].leaf.chain_id, 10);
        assert_eq!(bundle.leaves[1].leaf.chain_id, 1);
        assert_eq!(bundle.leaves[2].position, 2);
    }

    #[test]
    fn counts_leaves_per_chain() {
        let bundle = make_auth_bundle(vec![leaf(10, 0), leaf(1, 0), leaf(10, 1)]);
        let counts: Vec<_> = bundle.leaf_counts().into_iter().collect();
        assert_eq!(counts, vec![(1, 1), (10, 2)]);
    }
}
