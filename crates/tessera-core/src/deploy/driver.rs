//! Per-chain deployment state machine.
//!
//! The driver re-reads the manager's view of a deployment before every decision, so a
//! run interrupted at any point can simply be started again.

use alloy_primitives::B256;
use tracing::{debug, info, warn};

use super::DeployError;
use super::executor::{ExecutionEngine, ExecutionReport, ExecutionTarget};
use super::records::{DeploymentRecord, DeploymentRecords};
use crate::chain::{ChainClient, ChainError, DeploymentStatus};
use crate::propose::ChainPlan;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveOutcome {
    /// This run moved the deployment to COMPLETED.
    Completed {
        approved: bool,
        execution: ExecutionReport,
    },
    /// Nothing to do; no transaction was sent.
    AlreadyCompleted,
}

impl DriveOutcome {
    pub fn is_noop(&self) -> bool {
        matches!(self, DriveOutcome::AlreadyCompleted)
    }
}

pub struct DeploymentDriver<'a> {
    client: &'a dyn ChainClient,
    engine: &'a dyn ExecutionEngine,
}

impl<'a> DeploymentDriver<'a> {
    pub fn new(client: &'a dyn ChainClient, engine: &'a dyn ExecutionEngine) -> Self {
        Self { client, engine }
    }

    pub async fn drive(&self, plan: &ChainPlan) -> Result<DriveOutcome, DeployError> {
        let chain_id = plan.chain_id;
        let deployment_id = plan.deployment_id();
        if !plan.bundle.verify() {
            return Err(DeployError::InvalidBundle { chain_id });
        }

        let status = self
            .client
            .deployment_status(plan.manager, deployment_id)
            .await?;
        debug!(chain_id, %deployment_id, %status, "deployment status");

        let approved = match status {
            DeploymentStatus::Cancelled => {
                return Err(DeployError::Cancelled {
                    chain_id,
                    deployment_id,
                });
            }
            DeploymentStatus::Completed => {
                info!(chain_id, %deployment_id, "deployment already completed");
                return Ok(DriveOutcome::AlreadyCompleted);
            }
            DeploymentStatus::Empty => {
                self.approve(plan, deployment_id).await?;
                true
            }
            DeploymentStatus::Approved | DeploymentStatus::ProxiesInitiated => false,
        };

        let block_gas_limit = self.client.block_gas_limit().await?;
        let execution = self
            .engine
            .execute(
                self.client,
                ExecutionTarget {
                    chain_id,
                    manager: plan.manager,
                    deployment_id,
                    bundle: &plan.bundle,
                    block_gas_limit,
                },
            )
            .await?;

        let status = self
            .client
            .deployment_status(plan.manager, deployment_id)
            .await?;
        if status != DeploymentStatus::Completed {
            return Err(DeployError::NotCompleted { chain_id, status });
        }

        info!(
            chain_id,
            %deployment_id,
            executed = execution.executed,
            transactions = execution.receipts.len(),
            "deployment completed"
        );
        Ok(DriveOutcome::Completed {
            approved,
            execution,
        })
    }

    async fn approve(&self, plan: &ChainPlan, deployment_id: B256) -> Result<(), DeployError> {
        let chain_id = plan.chain_id;
        let active = self.client.active_deployment_id(plan.manager).await?;
        if active != B256::ZERO && active != deployment_id {
            return Err(DeployError::ActiveDeploymentInFlight {
                chain_id,
                manager: plan.manager,
                active,
            });
        }

        let receipt = self.client.approve(plan.manager, &plan.approval()).await?;
        if !receipt.success {
            return Err(DeployError::Reverted {
                chain_id,
                call: "approve",
                tx_hash: receipt.tx_hash,
            });
        }
        info!(
            chain_id,
            %deployment_id,
            tx = %receipt.tx_hash,
            actions = plan.bundle.len(),
            "deployment approved"
        );
        Ok(())
    }
}

/// Bookkeeping after a chain reaches COMPLETED.
///
/// Records the deployment and, on local networks, snapshots the node so it can be
/// reverted to this point. Returns the snapshot id when one was taken.
pub async fn post_deployment(
    client: &dyn ChainClient,
    records: &DeploymentRecords,
    project: &str,
    plan: &ChainPlan,
    local: bool,
) -> Result<Option<String>, DeployError> {
    records
        .record(DeploymentRecord::from_plan(project, plan))
        .map_err(|err| DeployError::Records(format!("{err:#}")))?;

    if !local {
        return Ok(None);
    }
    match client.snapshot().await {
        Ok(id) => {
            debug!(chain_id = plan.chain_id, snapshot = %id, "took snapshot");
            Ok(Some(id))
        }
        Err(ChainError::UnsupportedMethod(method)) => {
            warn!(chain_id = plan.chain_id, %method, "node does not support snapshots");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}
