//! Tessera Core Library
//!
//! Commits multi-chain contract deployments to Merkle roots, authorizes them through a
//! threshold of owners and proposers, and drives each chain's execution to completion.

pub mod actions;
pub mod auth;
pub mod chain;
pub mod commands;
pub mod config;
pub mod content;
pub mod context;
pub mod deploy;
pub mod error;
pub mod merkle;
pub mod propose;
pub mod relay;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{
        CanonicalConfig, ConfigStore, ContractConfig, ContractKind, DeployerSecrets,
        NetworkConfig, ProjectConfig, ProjectOptions, ProposerSecrets,
    };
    pub use crate::context::AppContext;
    pub use crate::error::{AuthorizationError, ConfigError};

    // Bundles
    pub use crate::actions::{Action, ActionBundle, make_action_bundle};
    pub use crate::auth::{AuthBundle, AuthLeaf, AuthLeafType, RoleType};

    // Chains
    pub use crate::chain::{ChainClient, ChainConnector, DeploymentStatus};

    // Proposal and execution
    pub use crate::deploy::{BatchedExecutor, DeployError, DeploymentDriver, ExecutionEngine};
    pub use crate::propose::{ChainPlan, ProposalOrchestrator, ProposalRequest, ProposeOutcome};
    pub use crate::relay::{CanonicalConfigSource, RelayClient};
}
