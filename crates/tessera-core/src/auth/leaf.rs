//! Auth leaves: single configuration changes the authority contract executes.

use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

use crate::chain::Approval;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown auth leaf type {0}")]
pub struct UnknownLeafType(pub u8);

/// Discriminant the authority contract switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum AuthLeafType {
    Setup = 0,
    Propose = 1,
    SetOwner = 2,
    SetThreshold = 3,
    SetProposer = 4,
    ApproveDeployment = 5,
}

impl TryFrom<u8> for AuthLeafType {
    type Error = UnknownLeafType;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Setup),
            1 => Ok(Self::Propose),
            2 => Ok(Self::SetOwner),
            3 => Ok(Self::SetThreshold),
            4 => Ok(Self::SetProposer),
            5 => Ok(Self::ApproveDeployment),
            other => Err(UnknownLeafType(other)),
        }
    }
}

impl From<AuthLeafType> for u8 {
    fn from(value: AuthLeafType) -> Self {
        value as u8
    }
}

impl std::fmt::Display for AuthLeafType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AuthLeafType::Setup => "setup",
            AuthLeafType::Propose => "propose",
            AuthLeafType::SetOwner => "setOwner",
            AuthLeafType::SetThreshold => "setThreshold",
            AuthLeafType::SetProposer => "setProposer",
            AuthLeafType::ApproveDeployment => "approveDeployment",
        };
        f.write_str(name)
    }
}

/// Typed leaf payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafPayload {
    /// Initial proposer set; owners and threshold are baked into the authority address.
    Setup { proposers: Vec<Address> },
    /// Opens a proposal of `num_leafs` leaves on this chain, this one included.
    Propose { num_leafs: u64 },
    SetOwner { owner: Address, add: bool },
    SetThreshold { threshold: u64 },
    SetProposer { proposer: Address, add: bool },
    ApproveDeployment(Approval),
}

impl LeafPayload {
    pub fn leaf_type(&self) -> AuthLeafType {
        match self {
            LeafPayload::Setup { .. } => AuthLeafType::Setup,
            LeafPayload::Propose { .. } => AuthLeafType::Propose,
            LeafPayload::SetOwner { .. } => AuthLeafType::SetOwner,
            LeafPayload::SetThreshold { .. } => AuthLeafType::SetThreshold,
            LeafPayload::SetProposer { .. } => AuthLeafType::SetProposer,
            LeafPayload::ApproveDeployment(_) => AuthLeafType::ApproveDeployment,
        }
    }

    /// ABI encoding the authority contract decodes for this leaf type.
    pub fn encode(&self) -> Bytes {
        let encoded = match self {
            LeafPayload::Setup { proposers } => (proposers.clone(),).abi_encode_params(),
            LeafPayload::Propose { num_leafs } => U256::from(*num_leafs).abi_encode(),
            LeafPayload::SetOwner { owner, add } => (*owner, *add).abi_encode_params(),
            LeafPayload::SetThreshold { threshold } => U256::from(*threshold).abi_encode(),
            LeafPayload::SetProposer { proposer, add } => (*proposer, *add).abi_encode_params(),
            LeafPayload::ApproveDeployment(approval) => (
                approval.action_root,
                U256::from(approval.num_actions),
                U256::from(approval.num_deploy_actions),
                approval.config_uri.clone(),
            )
                .abi_encode_params(),
        };
        Bytes::from(encoded)
    }
}

/// One leaf of the auth tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthLeaf {
    pub chain_id: u64,
    /// Chain-scoped, gap-free sequence number.
    pub index: u64,
    pub to: Address,
    pub leaf_type: AuthLeafType,
    pub data: Bytes,
}

impl AuthLeaf {
    pub fn new(chain_id: u64, index: u64, to: Address, payload: &LeafPayload) -> Self {
        Self {
            chain_id,
            index,
            to,
            leaf_type: payload.leaf_type(),
            data: payload.encode(),
        }
    }

    /// `keccak256(abi.encode(chainId, index, to, leafType, data))`. The leaf type is a
    /// `uint8` on chain, which encodes to the same word as a `uint256`.
    pub fn hash(&self) -> B256 {
        let encoded = (
            U256::from(self.chain_id),
            U256::from(self.index),
            self.to,
            U256::from(u8::from(self.leaf_type)),
            self.data.clone(),
        )
            .abi_encode_params();
        keccak256(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_reports_its_leaf_type() {
        let payload = LeafPayload::SetOwner {
            owner: Address::repeat_byte(1),
            add: true,
        };
        assert_eq!(payload.leaf_type(), AuthLeafType::SetOwner);
        let leaf = AuthLeaf::new(1, 0, Address::ZERO, &payload);
        assert_eq!(leaf.leaf_type, AuthLeafType::SetOwner);
    }

    #[test]
    fn scalar_payloads_are_one_word() {
        assert_eq!(LeafPayload::Propose { num_leafs: 3 }.encode().len(), 32);
        assert_eq!(LeafPayload::SetThreshold { threshold: 2 }.encode().len(), 32);
        let pair = LeafPayload::SetProposer {
            proposer: Address::repeat_byte(7),
            add: false,
        };
        assert_eq!(pair.encode().len(), 64);
    }

    #[test]
    fn setup_payload_decodes_to_proposers() {
        let proposers = vec![Address::repeat_byte(1), Address::repeat_byte(2)];
        let encoded = LeafPayload::Setup {
            proposers: proposers.clone(),
        }
        .encode();
        let (decoded,) = <(Vec<Address>,)>::abi_decode_params(&encoded).unwrap();
        assert_eq!(decoded, proposers);
    }

    #[test]
    fn hash_binds_chain_and_index() {
        let payload = LeafPayload::Propose { num_leafs: 2 };
        let base = AuthLeaf::new(1, 0, Address::ZERO, &payload);
        assert_ne!(base.hash(), AuthLeaf::new(2, 0, Address::ZERO, &payload).hash());
        assert_ne!(base.hash(), AuthLeaf::new(1, 1, Address::ZERO, &payload).hash());
        assert_eq!(base.hash(), base.clone().hash());
    }

    #[test]
    fn leaf_type_serializes_as_number() {
        let leaf = AuthLeaf::new(1, 0, Address::ZERO, &LeafPayload::Propose { num_leafs: 1 });
        let json = serde_json::to_value(&leaf).unwrap();
        assert_eq!(json["leafType"], 1);
        assert_eq!(json["chainId"], 1);
    }

    #[test]
    fn unknown_leaf_type_is_rejected() {
        assert_eq!(AuthLeafType::try_from(42), Err(UnknownLeafType(42)));
    }
}
