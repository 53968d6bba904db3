//! High-level commands for tessera operations.
//!
//! Each command owns an [`AppContext`](crate::context::AppContext) and exposes `run`
//! for the CLI plus `run_with` for callers that inject their own chain and relay
//! clients.

pub mod cancel;
pub mod deploy;
pub mod inspect;
pub mod propose;
pub mod proxy;

pub use cancel::{CancelCommand, CancelOptions, CancelReport};
pub use deploy::{DeployCommand, DeployOptions, DeployReport, DeployStatus};
pub use inspect::{
    ContractSummary, InspectCommand, InspectReport, NetworkSummary, RoleSigners, role_signers,
};
pub use propose::{ProposeCommand, ProposeCommandOptions, ProposeServices};
pub use proxy::{ProxyCommand, ProxyReport};
