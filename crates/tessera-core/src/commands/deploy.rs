//! Deploy command implementation.
//!
//! Executes the plan stored by the last proposal on one network, then records it.

use anyhow::Context;
use tracing::info;

use crate::chain::{ChainClient, ChainError, RpcChainClient};
use crate::config::{DeployerSecrets, ProjectConfig};
use crate::context::AppContext;
use crate::deploy::{
    BatchedExecutor, DeploymentDriver, DeploymentRecord, DriveOutcome, ExecutionEngine,
    post_deployment,
};
use crate::propose::ChainPlan;

#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Network name from `[networks]`.
    pub network: String,
}

impl DeployOptions {
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployStatus {
    Executed {
        plan: Box<ChainPlan>,
        outcome: DriveOutcome,
        snapshot: Option<String>,
    },
    /// No proposal is waiting for this network.
    NothingPending { last: Option<Box<DeploymentRecord>> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub network: String,
    pub chain_id: u64,
    pub status: DeployStatus,
}

#[derive(Debug)]
pub struct DeployCommand {
    ctx: AppContext,
}

impl DeployCommand {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub async fn run(
        &self,
        options: &DeployOptions,
        secrets: &DeployerSecrets,
    ) -> anyhow::Result<DeployReport> {
        let config = self.ctx.load_config()?;
        let network = config.network(&options.network)?;
        let client = RpcChainClient::with_signer(network.rpc_url.clone(), secrets.signer.clone());
        let engine = BatchedExecutor::default();
        self.run_with(&config, options, &client, &engine).await
    }

    pub async fn run_with(
        &self,
        config: &ProjectConfig,
        options: &DeployOptions,
        client: &dyn ChainClient,
        engine: &dyn ExecutionEngine,
    ) -> anyhow::Result<DeployReport> {
        let network = config.network(&options.network)?;
        let chain_id = network.chain_id;

        let records = self.ctx.deployment_records();
        let log = records.load()?;
        let Some(plan) = log.plan_for_network(&options.network).cloned() else {
            info!(network = %options.network, "no pending deployment");
            return Ok(DeployReport {
                network: options.network.clone(),
                chain_id,
                status: DeployStatus::NothingPending {
                    last: log.latest(chain_id).cloned().map(Box::new),
                },
            });
        };
        if plan.chain_id != chain_id {
            anyhow::bail!(
                "Pending plan for '{}' targets chain {}, but the network is chain {}; propose again",
                options.network,
                plan.chain_id,
                chain_id
            );
        }

        let actual = client.chain_id().await?;
        if actual != chain_id {
            return Err(ChainError::ChainIdMismatch {
                expected: chain_id,
                actual,
            }
            .into());
        }

        info!(
            network = %options.network,
            chain_id,
            deployment_id = %plan.deployment_id(),
            actions = plan.bundle.len(),
            "deploying"
        );
        let outcome = DeploymentDriver::new(client, engine)
            .drive(&plan)
            .await
            .with_context(|| format!("Deployment on '{}' failed", options.network))?;
        let snapshot = post_deployment(client, &records, &config.project, &plan, network.local)
            .await
            .context("Post-deployment bookkeeping failed")?;

        Ok(DeployReport {
            network: options.network.clone(),
            chain_id,
            status: DeployStatus::Executed {
                plan: Box::new(plan),
                outcome,
                snapshot,
            },
        })
    }
}
