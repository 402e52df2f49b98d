//! Call-order contracts of the provisioning saga.
//!
//! These tests run the saga against the traced in-memory cloud and check the
//! sequence of collaborator calls, not just the final state.

use std::sync::Arc;
use std::time::Duration;

use emrctl_core::bundle::{BundleStatus, ResourceClass};
use emrctl_core::confirm::ScriptedConfirm;
use emrctl_core::error::{Error, Service};
use emrctl_core::provider::NetworkProvisioner;
use emrctl_core::registry::{BundleRegistry, FileRegistry, MemoryRegistry};
use emrctl_core::saga::{BundleSource, ClassOutcome, ProvisioningSaga};
use emrctl_test_utils::{
    CloudOp, TemplateFactory, TestContext, access_denied_error, assert_create_order,
    assert_everything_kept, assert_no_side_effects, assert_terminated_first,
    init_test_logging, propagation_delay_error, submission_attempts,
};
use tokio::time::Instant;

/// Contract: create calls bucket, roles, groups, job flow in order, all
/// named from one run prefix.
#[tokio::test(start_paused = true)]
async fn contract_create_order_and_naming() {
    init_test_logging();
    let ctx = TestContext::new();

    let outcome = ctx
        .saga()
        .create(&TemplateFactory::standard(), "etl")
        .await
        .expect("create");

    let ops = ctx.cloud.operations();
    assert_create_order(&ops);

    let prefix = outcome.bundle.prefix.as_str().to_string();
    assert!(prefix.starts_with("etl-"));
    assert_eq!(
        ops,
        vec![
            CloudOp::CreateBucket {
                bucket: prefix.clone(),
                folders: ctx.config.folders.clone(),
            },
            CloudOp::CreateRoles {
                job_flow_role: format!("{prefix}-ec2-role"),
                service_role: format!("{prefix}-service-role"),
            },
            CloudOp::CreateSecurityGroups {
                prefix: prefix.clone(),
            },
            CloudOp::RunJobFlow {
                name: format!("cluster-{prefix}"),
            },
        ]
    );
}

/// Contract: a prefix containing the reserved marker causes no calls at all.
#[tokio::test(start_paused = true)]
async fn contract_reserved_prefix_has_no_side_effects() {
    let ctx = TestContext::new();

    let err = ctx
        .saga()
        .create(&TemplateFactory::standard(), "cluster-x")
        .await
        .expect_err("reserved");

    assert!(matches!(err, Error::InvalidPrefix { .. }));
    assert!(ctx.cloud.operations().is_empty());
    assert!(ctx.registry.list().await.expect("list").is_empty());
}

/// Contract: transient submission failures are retried after the retry
/// delay; the propagation wait is paid once.
#[tokio::test(start_paused = true)]
async fn contract_transient_failures_are_retried() {
    let ctx = TestContext::new();
    ctx.cloud
        .inner()
        .fail_next_job_flows((0..3).map(|_| propagation_delay_error()));

    let started = Instant::now();
    let outcome = ctx
        .saga()
        .create(&TemplateFactory::single_node_spark(), "etl")
        .await
        .expect("create");

    assert_eq!(outcome.attempts, 4);
    assert_eq!(submission_attempts(&ctx.cloud.operations()), 4);
    assert_create_order(&ctx.cloud.operations());
    assert_eq!(started.elapsed(), Duration::from_secs(10 + 3 * 10));
}

/// Contract: a non-transient submission error stops immediately and leaves
/// the run recorded as failed with everything it created.
#[tokio::test(start_paused = true)]
async fn contract_fatal_submission_keeps_record() {
    let ctx = TestContext::new();
    ctx.cloud
        .inner()
        .fail_next_job_flows([access_denied_error(Service::Cluster, "RunJobFlow")]);

    let err = ctx
        .saga()
        .create(&TemplateFactory::standard(), "etl")
        .await
        .expect_err("denied");

    assert_eq!(
        err.as_provider().and_then(|e| e.code.as_deref()),
        Some("AccessDenied")
    );
    assert_eq!(submission_attempts(&ctx.cloud.operations()), 1);

    let records = ctx.registry.list().await.expect("list");
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.status, BundleStatus::SubmissionFailed);
    assert!(record.cluster_id.is_none());
    for class in ResourceClass::ALL {
        assert!(record.holds(class), "{} should be recorded", class.as_label());
    }
}

/// Contract: teardown terminates first, then deletes roles, groups, bucket.
#[tokio::test(start_paused = true)]
async fn contract_teardown_order() {
    let ctx = TestContext::new();
    let outcome = ctx
        .saga()
        .create(&TemplateFactory::standard(), "etl")
        .await
        .expect("create");
    ctx.cloud.clear_operations();

    let report = ctx
        .saga_answering([true, true, true])
        .terminate(&outcome.cluster_id, false)
        .await
        .expect("terminate");

    let ops = ctx.cloud.operations();
    assert_terminated_first(&ops);
    let deletions: Vec<_> = ops.iter().filter(|op| op.is_deletion()).collect();
    assert!(matches!(deletions[0], CloudOp::DeleteRoles { .. }));
    assert!(matches!(deletions[1], CloudOp::DeleteSecurityGroups { .. }));
    assert!(matches!(deletions[2], CloudOp::DeleteBucket { .. }));

    assert_eq!(report.source, BundleSource::Registry);
    assert!(report.cost_reminders.is_empty());
    assert!(!ctx.cloud.inner().has_bucket(&outcome.bundle.prefix.bucket()));
    assert!(ctx.registry.list().await.expect("list").is_empty());
}

/// Contract: declining every question deletes nothing and reminds once per
/// class.
#[tokio::test(start_paused = true)]
async fn contract_declined_teardown_keeps_everything() {
    let ctx = TestContext::new();
    let outcome = ctx
        .saga()
        .create(&TemplateFactory::standard(), "etl")
        .await
        .expect("create");
    ctx.cloud.clear_operations();

    let confirm = Arc::new(ScriptedConfirm::new([false, false, false]));
    let saga = ProvisioningSaga::new(
        ctx.cloud.collaborators(),
        ctx.registry.clone(),
        confirm.clone(),
        ctx.config.clone(),
    );
    let report = saga
        .terminate(&outcome.cluster_id, false)
        .await
        .expect("terminate");

    assert_eq!(confirm.asked().len(), 3);
    assert_everything_kept(&report);
    assert_eq!(
        ctx.cloud.operations(),
        vec![CloudOp::TerminateCluster {
            cluster_id: outcome.cluster_id.clone(),
        }]
    );

    let record = ctx
        .registry
        .find_by_cluster(&outcome.cluster_id)
        .await
        .expect("find")
        .expect("record kept");
    assert_eq!(record.status, BundleStatus::Terminated);
}

/// Contract: one failed deletion does not stop the others.
#[tokio::test(start_paused = true)]
async fn contract_failed_deletion_is_isolated() {
    let ctx = TestContext::new();
    let outcome = ctx
        .saga()
        .create(&TemplateFactory::standard(), "etl")
        .await
        .expect("create");
    ctx.cloud.inner().fail_operation(
        "DeleteRole",
        access_denied_error(Service::Identity, "DeleteRole"),
    );

    let report = ctx
        .saga_answering([true])
        .terminate(&outcome.cluster_id, true)
        .await
        .expect("terminate");

    assert!(report.has_failures());
    assert!(matches!(
        report.outcome(ResourceClass::Roles),
        Some(ClassOutcome::Failed(_))
    ));
    assert_eq!(
        report.outcome(ResourceClass::SecurityGroups),
        Some(&ClassOutcome::Deleted)
    );
    assert_eq!(report.outcome(ResourceClass::Bucket), Some(&ClassOutcome::Deleted));

    let record = ctx
        .registry
        .find_by_cluster(&outcome.cluster_id)
        .await
        .expect("find")
        .expect("roles still recorded");
    assert!(record.holds(ResourceClass::Roles));
    assert!(!record.holds(ResourceClass::Bucket));
}

/// Contract: without a registry record the bundle is recovered from the
/// cluster name and a group lookup, before termination.
#[tokio::test(start_paused = true)]
async fn contract_recovery_without_record() {
    let ctx = TestContext::new();
    let outcome = ctx
        .saga()
        .create(&TemplateFactory::standard(), "etl")
        .await
        .expect("create");
    ctx.cloud.clear_operations();

    let saga = ProvisioningSaga::new(
        ctx.cloud.collaborators(),
        Arc::new(MemoryRegistry::new()),
        Arc::new(ScriptedConfirm::new([true])),
        ctx.config.clone(),
    );
    let report = saga
        .terminate(&outcome.cluster_id, true)
        .await
        .expect("terminate");

    let ops = ctx.cloud.operations();
    assert!(matches!(ops[0], CloudOp::DescribeCluster { .. }));
    assert!(matches!(ops[1], CloudOp::FindSecurityGroups { .. }));
    assert!(matches!(ops[2], CloudOp::TerminateCluster { .. }));
    assert_eq!(report.source, BundleSource::Recovered);
    assert_eq!(report.prefix, outcome.bundle.prefix);
    assert!(!report.has_failures());

    let prefix = &outcome.bundle.prefix;
    assert!(!ctx.cloud.inner().has_role(&prefix.job_flow_role()));
    assert!(!ctx.cloud.inner().has_security_group(&prefix.worker_group()));
}

/// Contract: when only one of the run's groups is left, recovery still
/// deletes it.
#[tokio::test(start_paused = true)]
async fn contract_recovery_deletes_surviving_group() {
    let ctx = TestContext::new();
    let outcome = ctx
        .saga()
        .create(&TemplateFactory::standard(), "etl")
        .await
        .expect("create");
    let prefix = outcome.bundle.prefix.clone();
    let worker = outcome
        .bundle
        .security_groups
        .iter()
        .find(|group| group.name == prefix.worker_group())
        .cloned()
        .expect("worker group recorded");
    ctx.cloud
        .inner()
        .delete_security_groups(&[worker], prefix.as_str())
        .await
        .expect("remove worker group");
    ctx.cloud.clear_operations();

    let saga = ProvisioningSaga::new(
        ctx.cloud.collaborators(),
        Arc::new(MemoryRegistry::new()),
        Arc::new(ScriptedConfirm::new([true])),
        ctx.config.clone(),
    );
    let report = saga
        .terminate(&outcome.cluster_id, true)
        .await
        .expect("terminate");

    assert_eq!(
        report.outcome(ResourceClass::SecurityGroups),
        Some(&ClassOutcome::Deleted)
    );
    assert!(ctx.cloud.operations().contains(&CloudOp::DeleteSecurityGroups {
        prefix: prefix.as_str().to_string(),
        names: vec![prefix.manager_group()],
    }));
    assert!(!ctx.cloud.inner().has_security_group(&prefix.manager_group()));
}

/// Contract: a cluster this tool did not create is rejected before it is
/// terminated.
#[tokio::test(start_paused = true)]
async fn contract_foreign_cluster_is_not_terminated() {
    let ctx = TestContext::new();
    ctx.cloud.inner().insert_cluster("j-FOREIGN", "analytics-prod");

    let err = ctx
        .saga_answering([true])
        .terminate("j-FOREIGN", true)
        .await
        .expect_err("foreign");

    assert!(matches!(err, Error::UnrecognizedClusterName { .. }));
    assert_no_side_effects(&ctx.cloud.operations());
    assert_eq!(ctx.cloud.inner().cluster_state("j-FOREIGN").as_deref(), Some("WAITING"));
}

/// Contract: the file registry carries a run from one invocation to the next.
#[tokio::test(start_paused = true)]
async fn contract_file_registry_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("registry.json");
    let ctx = TestContext::new();

    let create_saga = ProvisioningSaga::new(
        ctx.cloud.collaborators(),
        Arc::new(FileRegistry::new(&path)),
        Arc::new(ScriptedConfirm::new([])),
        ctx.config.clone(),
    );
    let outcome = create_saga
        .create(&TemplateFactory::standard(), "etl")
        .await
        .expect("create");
    drop(create_saga);
    ctx.cloud.clear_operations();

    let teardown_saga = ProvisioningSaga::new(
        ctx.cloud.collaborators(),
        Arc::new(FileRegistry::new(&path)),
        Arc::new(ScriptedConfirm::new([true])),
        ctx.config.clone(),
    );
    let report = teardown_saga
        .terminate(&outcome.cluster_id, true)
        .await
        .expect("terminate");

    assert_eq!(report.source, BundleSource::Registry);
    assert!(
        !ctx.cloud
            .operations()
            .iter()
            .any(|op| matches!(op, CloudOp::DescribeCluster { .. }))
    );
    let reopened = FileRegistry::new(&path);
    assert!(reopened.list().await.expect("list").is_empty());
}
