//! Custom assertion helpers for saga tests.

use emrctl_core::bundle::ResourceClass;
use emrctl_core::saga::{ClassOutcome, TeardownReport};

use crate::cloud::CloudOp;

/// Asserts that a create ran bucket, roles, groups and job flow in that
/// order, with nothing in between except submission retries.
///
/// # Panics
///
/// Panics if the sequence differs.
pub fn assert_create_order(ops: &[CloudOp]) {
    let mut stages = ops.iter().map(|op| match op {
        CloudOp::CreateBucket { .. } => "bucket",
        CloudOp::CreateRoles { .. } => "roles",
        CloudOp::CreateSecurityGroups { .. } => "groups",
        CloudOp::RunJobFlow { .. } => "job_flow",
        other => panic!("unexpected call during create: {other:?}"),
    });
    let expected = ["bucket", "roles", "groups", "job_flow"];
    for stage in expected {
        assert_eq!(stages.next(), Some(stage), "create order in {ops:?}");
    }
    assert!(
        stages.all(|stage| stage == "job_flow"),
        "only job-flow retries may follow, got {ops:?}"
    );
}

/// Asserts that no collaborator call changed anything.
///
/// # Panics
///
/// Panics if any mutating call was recorded.
pub fn assert_no_side_effects(ops: &[CloudOp]) {
    let mutations: Vec<_> = ops.iter().filter(|op| op.is_mutation()).collect();
    assert!(mutations.is_empty(), "expected no side effects, got {mutations:?}");
}

/// Asserts that the cluster was terminated before any resource was deleted.
///
/// # Panics
///
/// Panics if a deletion precedes termination or termination is missing.
pub fn assert_terminated_first(ops: &[CloudOp]) {
    let terminated = ops
        .iter()
        .position(|op| matches!(op, CloudOp::TerminateCluster { .. }))
        .unwrap_or_else(|| panic!("cluster was never terminated: {ops:?}"));
    if let Some(first_delete) = ops.iter().position(CloudOp::is_deletion) {
        assert!(
            terminated < first_delete,
            "deletion ran before termination: {ops:?}"
        );
    }
}

/// Returns the number of job-flow submission attempts.
#[must_use]
pub fn submission_attempts(ops: &[CloudOp]) -> usize {
    ops.iter()
        .filter(|op| matches!(op, CloudOp::RunJobFlow { .. }))
        .count()
}

/// Asserts that every class was kept and one reminder was given per class.
///
/// # Panics
///
/// Panics if any class was deleted or a reminder is missing.
pub fn assert_everything_kept(report: &TeardownReport) {
    for class in ResourceClass::ALL {
        assert_eq!(
            report.outcome(class),
            Some(&ClassOutcome::Kept),
            "{} should be kept",
            class.as_label()
        );
    }
    assert_eq!(
        report.cost_reminders.len(),
        ResourceClass::ALL.len(),
        "one cost reminder per declined class"
    );
}
