//! Which auth leaves a chain needs for a proposal.

use alloy_primitives::Address;

use super::leaf::{AuthLeaf, LeafPayload};
use crate::chain::Approval;
use crate::config::ProjectOptions;

/// Inputs for one chain.
#[derive(Debug, Clone, Copy)]
pub struct LeafDerivation<'a> {
    pub chain_id: u64,
    /// First index to assign; the authority's current nonce.
    pub auth_nonce: u64,
    pub auth: Address,
    pub manager: Address,
    /// Whether a proposal already went through on this chain.
    pub has_history: bool,
    /// Configuration in force on chain. Ignored without history.
    pub previous: &'a ProjectOptions,
    pub new: &'a ProjectOptions,
    pub deployment: Option<&'a Approval>,
}

/// Leaves for one chain, indexed from `auth_nonce`.
///
/// Without history: `Setup, Propose, ApproveDeployment?`. With history: `Propose` followed
/// by owner additions, a threshold change, owner removals, proposer additions, proposer
/// removals and `ApproveDeployment?`; no leaves at all when nothing changed.
pub fn derive_auth_leaves(input: &LeafDerivation<'_>) -> Vec<AuthLeaf> {
    let mut changes: Vec<LeafPayload> = Vec::new();

    if input.has_history {
        let previous = input.previous;
        let new = input.new;
        changes.extend(added(&previous.owners, &new.owners).map(|owner| LeafPayload::SetOwner {
            owner,
            add: true,
        }));
        if previous.threshold != new.threshold {
            changes.push(LeafPayload::SetThreshold {
                threshold: new.threshold,
            });
        }
        changes.extend(added(&new.owners, &previous.owners).map(|owner| LeafPayload::SetOwner {
            owner,
            add: false,
        }));
        changes.extend(
            added(&previous.proposers, &new.proposers)
                .map(|proposer| LeafPayload::SetProposer { proposer, add: true }),
        );
        changes.extend(
            added(&new.proposers, &previous.proposers)
                .map(|proposer| LeafPayload::SetProposer { proposer, add: false }),
        );
    }

    if let Some(approval) = input.deployment {
        changes.push(LeafPayload::ApproveDeployment(approval.clone()));
    }

    let mut payloads = Vec::with_capacity(changes.len() + 2);
    if !input.has_history {
        payloads.push(LeafPayload::Setup {
            proposers: input.new.proposers.clone(),
        });
        payloads.push(LeafPayload::Propose {
            num_leafs: changes.len() as u64 + 2,
        });
    } else if !changes.is_empty() {
        payloads.push(LeafPayload::Propose {
            num_leafs: changes.len() as u64 + 1,
        });
    }
    payloads.extend(changes);

    payloads
        .iter()
        .zip(input.auth_nonce..)
        .map(|(payload, index)| {
            let to = match payload {
                LeafPayload::ApproveDeployment(_) => input.manager,
                _ => input.auth,
            };
            AuthLeaf::new(input.chain_id, index, to, payload)
        })
        .collect()
}

/// Entries of `to` missing from `from`, in `to`'s order.
fn added<'a>(from: &'a [Address], to: &'a [Address]) -> impl Iterator<Item = Address> + 'a {
    to.iter().filter(move |address| !from.contains(address)).copied()
}
