//! Proposal orchestration.

pub mod gas;
pub mod orchestrator;
pub mod request;

pub use orchestrator::{
    ChainPlan, ProposalOrchestrator, ProposalReport, ProposeError, ProposeOptions, ProposeOutcome,
};
pub use request::{
    ChainStatus, GasEstimate, ProjectDeployment, ProposalRequest, ProposalRequestLeaf,
    ProposalTree, Signer,
};
