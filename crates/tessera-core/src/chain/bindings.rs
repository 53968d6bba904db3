//! Solidity interfaces of the manager and authority contracts.

#![allow(missing_docs)]

use alloy::sol;

sol! {
    /// Executor-side action struct; mirrors [`crate::actions::RawAction`].
    #[derive(Debug)]
    struct RawAction {
        uint8 actionType;
        string target;
        bytes data;
    }

    #[sol(rpc)]
    #[derive(Debug)]
    contract DeploymentManager {
        function deploymentStatus(bytes32 deploymentId) external view returns (uint8);

        function actionsExecuted(bytes32 deploymentId) external view returns (uint256);

        function activeDeploymentId() external view returns (bytes32);

        function owner() external view returns (address);

        /// Commits to a bundle. Reverts while another deployment is active.
        function approve(
            bytes32 actionRoot,
            uint256 numActions,
            uint256 numDeployActions,
            string configUri
        ) external;

        /// Executes a contiguous run of bundled actions with their Merkle proofs.
        function executeActions(
            RawAction[] actions,
            uint256[] actionIndexes,
            bytes32[][] proofs
        ) external;

        function cancelActiveDeployment() external;

        /// Hands administration of a proxy the manager owns to `newOwner`.
        function exportProxy(address proxy, bytes32 contractKindHash, address newOwner) external;
    }

    #[sol(rpc)]
    #[derive(Debug)]
    contract AdminProxy {
        function changeAdmin(address newAdmin) external;
    }

    #[sol(rpc)]
    #[derive(Debug)]
    contract Authority {
        function authNonce() external view returns (uint256);
    }
}

impl From<&crate::actions::RawAction> for RawAction {
    fn from(action: &crate::actions::RawAction) -> Self {
        RawAction {
            actionType: action.action_type.into(),
            target: action.target.clone(),
            data: action.data.clone(),
        }
    }
}
