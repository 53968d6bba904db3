//! Execution of an approved bundle.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use tracing::{debug, info};

use super::DeployError;
use crate::actions::{ActionBundle, ActionType, BundledAction};
use crate::chain::{ChainClient, TxReceipt};
use crate::propose::gas::{TX_BASE_GAS, estimate_action_gas};

/// One deployment's execution target.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionTarget<'a> {
    pub chain_id: u64,
    pub manager: Address,
    pub deployment_id: B256,
    pub bundle: &'a ActionBundle,
    pub block_gas_limit: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Actions the manager had already executed before this run.
    pub skipped: usize,
    pub executed: usize,
    pub receipts: Vec<TxReceipt>,
}

/// Drives an approved deployment's actions on chain.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    async fn execute(
        &self,
        client: &dyn ChainClient,
        target: ExecutionTarget<'_>,
    ) -> Result<ExecutionReport, DeployError>;
}

/// Sends non-SetImplementation actions in gas-bounded batches, then every
/// SetImplementation in one final transaction.
#[derive(Debug, Clone, Copy)]
pub struct BatchedExecutor {
    /// Share of the block gas limit one transaction may use: `limit / divisor`.
    pub block_gas_divisor: u64,
}

impl Default for BatchedExecutor {
    fn default() -> Self {
        Self {
            block_gas_divisor: 2,
        }
    }
}

impl BatchedExecutor {
    fn max_tx_gas(&self, block_gas_limit: u64) -> u64 {
        block_gas_limit / self.block_gas_divisor.max(1)
    }

    /// Split `actions` into consecutive runs whose estimated gas fits `max_tx_gas`.
    pub fn batches<'b>(
        &self,
        chain_id: u64,
        actions: &'b [BundledAction],
        max_tx_gas: u64,
    ) -> Result<Vec<&'b [BundledAction]>, DeployError> {
        let budget = max_tx_gas.saturating_sub(TX_BASE_GAS);
        let mut batches = Vec::new();
        let mut start = 0;
        let mut used = 0u64;

        for (offset, bundled) in actions.iter().enumerate() {
            let cost = estimate_action_gas(&bundled.action, bundled.proof.siblings.len());
            if cost > budget {
                return Err(DeployError::ExecutionFailed {
                    chain_id,
                    reason: format!(
                        "action {} ({}) needs ~{} gas, over the {} allowed per transaction",
                        bundled.proof.action_index, bundled.action.target, cost, budget
                    ),
                });
            }
            if used + cost > budget {
                batches.push(&actions[start..offset]);
                start = offset;
                used = 0;
            }
            used += cost;
        }
        if start < actions.len() {
            batches.push(&actions[start..]);
        }
        Ok(batches)
    }

    async fn send(
        &self,
        client: &dyn ChainClient,
        target: &ExecutionTarget<'_>,
        batch: &[BundledAction],
        gas_limit: u64,
    ) -> Result<TxReceipt, DeployError> {
        let receipt = client
            .execute_actions(target.manager, batch, gas_limit)
            .await?;
        if !receipt.success {
            let first = batch.first().map(|a| a.proof.action_index).unwrap_or_default();
            return Err(DeployError::ExecutionFailed {
                chain_id: target.chain_id,
                reason: format!(
                    "executeActions for actions {}..{} reverted in {}",
                    first,
                    first + batch.len(),
                    receipt.tx_hash
                ),
            });
        }
        Ok(receipt)
    }
}

#[async_trait]
impl ExecutionEngine for BatchedExecutor {
    async fn execute(
        &self,
        client: &dyn ChainClient,
        target: ExecutionTarget<'_>,
    ) -> Result<ExecutionReport, DeployError> {
        let already = client
            .actions_executed(target.manager, target.deployment_id)
            .await? as usize;
        let remaining = target.bundle.actions.get(already..).unwrap_or_default();
        let split = remaining
            .iter()
            .position(|bundled| bundled.action.action_type == ActionType::SetImplementation)
            .unwrap_or(remaining.len());
        let (regular, set_implementations) = remaining.split_at(split);

        let max_tx_gas = self.max_tx_gas(target.block_gas_limit);
        let mut report = ExecutionReport {
            skipped: already.min(target.bundle.len()),
            ..ExecutionReport::default()
        };

        for (index, batch) in self
            .batches(target.chain_id, regular, max_tx_gas)?
            .into_iter()
            .enumerate()
        {
            let receipt = self.send(client, &target, batch, max_tx_gas).await?;
            info!(
                chain_id = target.chain_id,
                batch = index,
                actions = batch.len(),
                tx = %receipt.tx_hash,
                gas_used = receipt.gas_used,
                "executed batch"
            );
            report.executed += batch.len();
            report.receipts.push(receipt);
        }

        if !set_implementations.is_empty() {
            let receipt = self
                .send(client, &target, set_implementations, max_tx_gas)
                .await?;
            info!(
                chain_id = target.chain_id,
                actions = set_implementations.len(),
                tx = %receipt.tx_hash,
                "set implementations"
            );
            report.executed += set_implementations.len();
            report.receipts.push(receipt);
        }

        debug!(
            chain_id = target.chain_id,
            skipped = report.skipped,
            executed = report.executed,
            "execution finished"
        );
        Ok(report)
    }
}
