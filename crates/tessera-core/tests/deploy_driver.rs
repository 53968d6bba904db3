mod support;

use alloy_primitives::{Address, B256, Bytes};

use tessera_core::actions::{Action, make_action_bundle};
use tessera_core::chain::DeploymentStatus;
use tessera_core::content::ContentId;
use tessera_core::deploy::{
    BatchedExecutor, CancelOutcome, DeployError, DeploymentDriver, DeploymentRecords,
    DriveOutcome, cancel_active_deployment, export_proxy, import_proxy, post_deployment,
    proxy_admin,
};
use tessera_core::config::ContractKind;
use tessera_core::propose::ChainPlan;

use support::{CHAIN_ID, FakeChain};

fn manager() -> Address {
    Address::repeat_byte(0x0d)
}

fn plan_with(actions: Vec<Action>) -> ChainPlan {
    ChainPlan {
        chain_id: CHAIN_ID,
        network: "anvil".to_string(),
        auth: Address::repeat_byte(0x0a),
        manager: manager(),
        config_uri: ContentId::of(b"committed config"),
        bundle: make_action_bundle(actions),
    }
}

/// Two proxies: deploy, one storage write and set implementation each.
fn two_proxy_plan() -> ChainPlan {
    let mut actions = Vec::new();
    for (index, name) in ["Token", "Vault"].into_iter().enumerate() {
        actions.push(Action::DeployImplementation {
            target: name.to_string(),
            code: Bytes::from(vec![0x60; 64]),
        });
        actions.push(Action::SetStorage {
            target: name.to_string(),
            key: B256::with_last_byte(index as u8),
            value: B256::with_last_byte(0xff),
        });
        actions.push(Action::SetImplementation {
            target: name.to_string(),
        });
    }
    plan_with(actions)
}

#[tokio::test]
async fn cancelled_deployment_fails_without_transactions() {
    let chain = FakeChain::new(CHAIN_ID);
    let plan = two_proxy_plan();
    chain.set_status(plan.deployment_id(), DeploymentStatus::Cancelled);
    let engine = BatchedExecutor::default();

    let err = DeploymentDriver::new(&chain, &engine)
        .drive(&plan)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DeployError::Cancelled {
            chain_id: CHAIN_ID,
            deployment_id: plan.deployment_id(),
        }
    );
    assert_eq!(chain.transactions(), 0);
}

#[tokio::test]
async fn completed_deployment_is_a_noop() {
    let chain = FakeChain::new(CHAIN_ID);
    let plan = two_proxy_plan();
    chain.set_status(plan.deployment_id(), DeploymentStatus::Completed);
    let engine = BatchedExecutor::default();

    let outcome = DeploymentDriver::new(&chain, &engine)
        .drive(&plan)
        .await
        .unwrap();

    assert!(outcome.is_noop());
    assert_eq!(chain.transactions(), 0);
}

#[tokio::test]
async fn empty_deployment_is_approved_and_executed() {
    let chain = FakeChain::new(CHAIN_ID);
    let plan = two_proxy_plan();
    let engine = BatchedExecutor::default();
    let driver = DeploymentDriver::new(&chain, &engine);

    let outcome = driver.drive(&plan).await.unwrap();
    match outcome {
        DriveOutcome::Completed {
            approved,
            execution,
        } => {
            assert!(approved);
            assert_eq!(execution.skipped, 0);
            assert_eq!(execution.executed, 6);
        }
        DriveOutcome::AlreadyCompleted => panic!("expected execution"),
    }
    // Regular actions fit one batch; set implementations go last in their own.
    assert_eq!(chain.batches(), vec![4, 2]);
    assert_eq!(chain.transactions(), 3);
    assert_eq!(chain.status(plan.deployment_id()), DeploymentStatus::Completed);

    // Driving again sends nothing.
    assert!(driver.drive(&plan).await.unwrap().is_noop());
    assert_eq!(chain.transactions(), 3);
}

#[tokio::test]
async fn another_active_deployment_blocks_approval() {
    let chain = FakeChain::new(CHAIN_ID);
    let plan = two_proxy_plan();
    chain.set_active(B256::repeat_byte(0x99));
    let engine = BatchedExecutor::default();

    let err = DeploymentDriver::new(&chain, &engine)
        .drive(&plan)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeployError::ActiveDeploymentInFlight { chain_id: CHAIN_ID, .. }
    ));
    assert_eq!(chain.transactions(), 0);
}

#[tokio::test]
async fn small_gas_limit_splits_batches_and_resumes_after_failure() {
    // Room for one deploy or two storage writes per transaction.
    let chain = FakeChain::new(CHAIN_ID).with_block_gas_limit(2 * (21_000 + 120_000));
    let plan = two_proxy_plan();
    let engine = BatchedExecutor::default();
    let driver = DeploymentDriver::new(&chain, &engine);

    chain.fail_on_batch(Some(1));
    let err = driver.drive(&plan).await.unwrap_err();
    assert!(matches!(err, DeployError::ExecutionFailed { chain_id: CHAIN_ID, .. }));
    let executed = chain.executed(plan.deployment_id());
    assert!(executed > 0);
    assert_eq!(
        chain.status(plan.deployment_id()),
        DeploymentStatus::ProxiesInitiated
    );

    chain.fail_on_batch(None);
    let outcome = driver.drive(&plan).await.unwrap();
    match outcome {
        DriveOutcome::Completed {
            approved,
            execution,
        } => {
            assert!(!approved);
            assert_eq!(execution.skipped as u64, executed);
            assert_eq!(execution.skipped + execution.executed, 6);
        }
        DriveOutcome::AlreadyCompleted => panic!("expected execution"),
    }
    assert_eq!(chain.batches().iter().sum::<usize>(), 6);
    assert_eq!(chain.batches().last(), Some(&2));
}

#[tokio::test]
async fn tampered_plan_is_rejected_before_any_call() {
    let chain = FakeChain::new(CHAIN_ID);
    let mut plan = two_proxy_plan();
    plan.bundle.actions.swap(0, 1);
    let engine = BatchedExecutor::default();

    let err = DeploymentDriver::new(&chain, &engine)
        .drive(&plan)
        .await
        .unwrap_err();
    assert_eq!(err, DeployError::InvalidBundle { chain_id: CHAIN_ID });
    assert_eq!(chain.transactions(), 0);
}

#[tokio::test]
async fn post_deployment_records_and_tolerates_missing_snapshots() {
    let state = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let records = DeploymentRecords::new(state.path(), project.path());
    let plan = two_proxy_plan();

    let chain = FakeChain::new(CHAIN_ID);
    let snapshot = post_deployment(&chain, &records, "Example", &plan, true)
        .await
        .unwrap();
    assert_eq!(snapshot.as_deref(), Some("0x1"));

    let chain = FakeChain::new(CHAIN_ID);
    chain.disable_snapshots();
    let snapshot = post_deployment(&chain, &records, "Example", &plan, true)
        .await
        .unwrap();
    assert_eq!(snapshot, None);

    let log = records.load().unwrap();
    assert_eq!(log.history.len(), 1);
    assert_eq!(log.history[0].deployment_id, plan.deployment_id());
}

#[tokio::test]
async fn cancel_requires_the_owner() {
    let chain = FakeChain::new(CHAIN_ID);
    let owner = Address::repeat_byte(0x01);
    chain.set_owner(owner);
    chain.set_active(B256::repeat_byte(0x99));

    let err = cancel_active_deployment(&chain, CHAIN_ID, manager(), Address::repeat_byte(0x02))
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::NotOwner { .. }));
    assert_eq!(chain.transactions(), 0);

    let outcome = cancel_active_deployment(&chain, CHAIN_ID, manager(), owner)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        CancelOutcome::Cancelled { deployment_id, .. } if deployment_id == B256::repeat_byte(0x99)
    ));
    assert_eq!(
        chain.status(B256::repeat_byte(0x99)),
        DeploymentStatus::Cancelled
    );

    let again = cancel_active_deployment(&chain, CHAIN_ID, manager(), owner)
        .await
        .unwrap();
    assert_eq!(again, CancelOutcome::NothingToCancel);
}

#[tokio::test]
async fn export_proxy_hands_the_proxy_to_the_owner() {
    let chain = FakeChain::new(CHAIN_ID);
    let owner = Address::repeat_byte(0x01);
    let proxy = Address::repeat_byte(0x50);
    chain.set_owner(owner);
    chain.set_proxy_admin(proxy, manager());

    let err = export_proxy(
        &chain,
        CHAIN_ID,
        manager(),
        proxy,
        ContractKind::Proxy,
        Address::repeat_byte(0x02),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DeployError::NotOwner { .. }));

    chain.set_active(B256::repeat_byte(0x99));
    let err = export_proxy(&chain, CHAIN_ID, manager(), proxy, ContractKind::Proxy, owner)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::ActiveDeploymentInFlight { .. }));
    assert_eq!(chain.transactions(), 0);
    assert_eq!(chain.proxy_admin(proxy), Some(manager()));

    chain.set_active(B256::ZERO);
    let transfer = export_proxy(&chain, CHAIN_ID, manager(), proxy, ContractKind::Proxy, owner)
        .await
        .unwrap();
    assert_eq!(transfer.new_admin, owner);
    assert_eq!(proxy_admin(&chain, proxy).await.unwrap(), owner);
}

#[tokio::test]
async fn import_proxy_requires_the_current_admin() {
    let chain = FakeChain::new(CHAIN_ID);
    let admin = Address::repeat_byte(0x01);
    let proxy = Address::repeat_byte(0x50);

    let err = import_proxy(&chain, CHAIN_ID, manager(), proxy, admin)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DeployError::ProxyNotDeployed {
            chain_id: CHAIN_ID,
            proxy
        }
    );

    chain.set_proxy_admin(proxy, admin);
    let stranger = Address::repeat_byte(0x02);
    let err = import_proxy(&chain, CHAIN_ID, manager(), proxy, stranger)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DeployError::NotProxyAdmin {
            chain_id: CHAIN_ID,
            proxy,
            admin,
            caller: stranger,
        }
    );

    let transfer = import_proxy(&chain, CHAIN_ID, manager(), proxy, admin)
        .await
        .unwrap();
    assert_eq!(transfer.new_admin, manager());
    assert_eq!(chain.proxy_admin(proxy), Some(manager()));

    let err = import_proxy(&chain, CHAIN_ID, manager(), proxy, admin)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::ProxyAlreadyManaged { .. }));
    assert_eq!(chain.transactions(), 1);
}
