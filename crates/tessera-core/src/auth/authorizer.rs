//! Role and threshold resolution for auth leaves.
//!
//! Every resolution is made against an [`AuthorityContext`]: on a chain that has
//! never seen a proposal the new project options are authoritative, afterwards the
//! previous canonical options are, since that is what the authority contract holds.

use std::str::FromStr;

use alloy_primitives::{Address, Bytes};

use super::bundle::BundledAuthLeaf;
use super::leaf::AuthLeafType;
use crate::config::{CanonicalConfig, ProjectOptions};
use crate::error::{AuthorizationError, ConfigError, ConfigSource};
use crate::propose::{ProposalRequestLeaf, Signer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleType {
    Owner,
    Proposer,
}

impl FromStr for RoleType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "owner" => Ok(RoleType::Owner),
            "proposer" => Ok(RoleType::Proposer),
            _ => Err(ConfigError::InvalidRole(s.to_string())),
        }
    }
}

impl std::fmt::Display for RoleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleType::Owner => f.write_str("owner"),
            RoleType::Proposer => f.write_str("proposer"),
        }
    }
}

/// Who must sign a leaf, and how many of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignerInfo {
    pub role: RoleType,
    pub threshold: u64,
}

/// Propose needs one proposer; everything else needs the owner threshold.
pub fn signer_info(leaf_type: AuthLeafType, owner_threshold: u64) -> SignerInfo {
    match leaf_type {
        AuthLeafType::Propose => SignerInfo {
            role: RoleType::Proposer,
            threshold: 1,
        },
        AuthLeafType::Setup
        | AuthLeafType::SetOwner
        | AuthLeafType::SetThreshold
        | AuthLeafType::SetProposer
        | AuthLeafType::ApproveDeployment => SignerInfo {
            role: RoleType::Owner,
            threshold: owner_threshold,
        },
    }
}

/// The organization a project belongs to is fixed by its first proposal.
pub fn check_org_id(previous: &CanonicalConfig, new: &ProjectOptions) -> Result<(), ConfigError> {
    if previous.options.org_id != new.org_id {
        return Err(ConfigError::OrgIdChanged {
            previous: previous.options.org_id.clone(),
            new: new.org_id.clone(),
        });
    }
    Ok(())
}

/// Previous and new configuration of one proposal.
#[derive(Debug, Clone, Copy)]
pub struct AuthorityContext<'a> {
    previous: &'a CanonicalConfig,
    new: &'a ProjectOptions,
}

impl<'a> AuthorityContext<'a> {
    pub fn new(previous: &'a CanonicalConfig, new: &'a ProjectOptions) -> Self {
        Self { previous, new }
    }

    pub fn previous(&self) -> &'a CanonicalConfig {
        self.previous
    }

    pub fn new_options(&self) -> &'a ProjectOptions {
        self.new
    }

    pub fn has_history(&self, chain_id: u64) -> bool {
        self.previous.first_proposal_occurred(chain_id)
    }

    /// Options the authority contract on `chain_id` enforces for this proposal.
    pub fn authoritative(&self, chain_id: u64) -> &'a ProjectOptions {
        if self.has_history(chain_id) {
            &self.previous.options
        } else {
            self.new
        }
    }

    /// Fails unless `signer` may open a proposal on `chain_id`.
    pub fn check_proposer(&self, chain_id: u64, signer: Address) -> Result<(), AuthorizationError> {
        let (options, config) = if self.has_history(chain_id) {
            (&self.previous.options, ConfigSource::Previous)
        } else {
            (self.new, ConfigSource::New)
        };
        if options.proposers.contains(&signer) {
            return Ok(());
        }
        Err(AuthorizationError::NotProposer {
            chain_id,
            signer,
            config,
            eligible: options.proposers.clone(),
        })
    }

    pub fn signer_info(&self, chain_id: u64, leaf_type: AuthLeafType) -> SignerInfo {
        signer_info(leaf_type, self.authoritative(chain_id).threshold)
    }

    pub fn signers(&self, chain_id: u64, role: RoleType) -> &'a [Address] {
        let options = self.authoritative(chain_id);
        match role {
            RoleType::Owner => &options.owners,
            RoleType::Proposer => &options.proposers,
        }
    }

    /// Attach threshold and signer list to a bundled leaf.
    ///
    /// Only `caller`'s entry carries a signature; the relay collects the rest.
    pub fn request_leaf(
        &self,
        bundled: &BundledAuthLeaf,
        caller: Address,
        signature: Option<&Bytes>,
    ) -> ProposalRequestLeaf {
        let leaf = &bundled.leaf;
        let info = self.signer_info(leaf.chain_id, leaf.leaf_type);
        let signers = self
            .signers(leaf.chain_id, info.role)
            .iter()
            .map(|address| Signer {
                address: *address,
                signature: if *address == caller {
                    signature.cloned()
                } else {
                    None
                },
            })
            .collect();

        ProposalRequestLeaf {
            chain_id: leaf.chain_id,
            index: leaf.index,
            to: leaf.to,
            leaf_type: leaf.leaf_type,
            data: leaf.data.clone(),
            siblings: bundled.siblings.clone(),
            threshold: info.threshold,
            signers,
        }
    }
}
