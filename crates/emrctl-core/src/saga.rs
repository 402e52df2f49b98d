//! The provisioning saga.
//!
//! Creation runs a fixed sequence against the collaborators and records
//! progress in the bundle registry after each step:
//!
//! ```text
//! validate prefix ─► bucket ─► roles ─► security groups ─► wait ─► job flow
//!        │              │         │            │                     │
//!   reject (no     save bundle  save       save              retry on propagation
//!   side effects)                                            delay, then save
//! ```
//!
//! Nothing is rolled back when a later step fails; the bundle record keeps
//! what was created so it can be torn down later.
//!
//! Teardown terminates the cluster, then asks before deleting each class of
//! resources. A failed deletion is reported and does not stop the others.

use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;

use crate::bundle::{
    BundleStatus, REMOVE_ALL_COST_REMINDER, REMOVE_ALL_QUESTION, ResourceBundle, ResourceClass,
    RoleNames,
};
use crate::config::{ClusterTemplate, SagaConfig};
use crate::confirm::Confirm;
use crate::error::Result;
use crate::naming::RunPrefix;
use crate::observability::provisioning_span;
use crate::provider::{
    ClusterManager, ClusterSummary, IdentityProvisioner, JobFlowRequest, NetworkProvisioner,
    RolePair, SecurityGroups, StorageProvisioner,
};
use crate::registry::BundleRegistry;
use crate::submission::submit_job_flow;

/// The four services a run talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Bucket provisioning.
    pub storage: Arc<dyn StorageProvisioner>,
    /// Role provisioning.
    pub identity: Arc<dyn IdentityProvisioner>,
    /// Security group provisioning.
    pub network: Arc<dyn NetworkProvisioner>,
    /// Cluster lifecycle.
    pub clusters: Arc<dyn ClusterManager>,
}

impl Collaborators {
    /// Uses one value for all four roles.
    #[must_use]
    pub fn shared<T>(cloud: Arc<T>) -> Self
    where
        T: StorageProvisioner + IdentityProvisioner + NetworkProvisioner + ClusterManager + 'static,
    {
        Self {
            storage: cloud.clone(),
            identity: cloud.clone(),
            network: cloud.clone(),
            clusters: cloud,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOutcome {
    /// New cluster id.
    pub cluster_id: String,
    /// Everything the run created.
    pub bundle: ResourceBundle,
    /// Submission attempts used.
    pub attempts: u32,
}

/// Where teardown found the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleSource {
    /// Read from the registry.
    Registry,
    /// Rebuilt from the cluster name and a security group lookup.
    Recovered,
}

/// What happened to one resource class during teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result", content = "detail")]
pub enum ClassOutcome {
    /// Deleted.
    Deleted,
    /// The user declined; the resources remain.
    Kept,
    /// Deletion was confirmed but the run holds nothing of this class.
    Missing,
    /// Deletion was confirmed and failed.
    Failed(String),
}

/// Outcome for one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassReport {
    /// Resource class.
    pub class: ResourceClass,
    /// What happened.
    pub outcome: ClassOutcome,
}

/// Result of a teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeardownReport {
    /// Terminated cluster.
    pub cluster_id: String,
    /// Run prefix of the cluster.
    pub prefix: RunPrefix,
    /// Where the bundle came from.
    pub source: BundleSource,
    /// One entry per resource class, in teardown order.
    pub classes: Vec<ClassReport>,
    /// Cost notices for declined deletions.
    pub cost_reminders: Vec<String>,
    /// Non-fatal problems, e.g. a registry write that failed.
    pub warnings: Vec<String>,
}

impl TeardownReport {
    fn new(cluster_id: &str, prefix: RunPrefix, source: BundleSource) -> Self {
        Self {
            cluster_id: cluster_id.to_string(),
            prefix,
            source,
            classes: Vec::with_capacity(ResourceClass::ALL.len()),
            cost_reminders: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn record(&mut self, class: ResourceClass, outcome: ClassOutcome) {
        self.classes.push(ClassReport { class, outcome });
    }

    /// Returns the outcome recorded for `class`.
    #[must_use]
    pub fn outcome(&self, class: ResourceClass) -> Option<&ClassOutcome> {
        self.classes
            .iter()
            .find(|r| r.class == class)
            .map(|r| &r.outcome)
    }

    /// Returns true if any confirmed deletion failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.classes
            .iter()
            .any(|r| matches!(r.outcome, ClassOutcome::Failed(_)))
    }
}

/// Coordinates the collaborators to create, list and tear down clusters.
pub struct ProvisioningSaga {
    collaborators: Collaborators,
    registry: Arc<dyn BundleRegistry>,
    confirm: Arc<dyn Confirm>,
    config: SagaConfig,
}

impl std::fmt::Debug for ProvisioningSaga {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningSaga")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ProvisioningSaga {
    /// Creates a saga.
    #[must_use]
    pub fn new(
        collaborators: Collaborators,
        registry: Arc<dyn BundleRegistry>,
        confirm: Arc<dyn Confirm>,
        config: SagaConfig,
    ) -> Self {
        Self {
            collaborators,
            registry,
            confirm,
            config,
        }
    }

    /// Provisions a bucket, roles and security groups, then starts a cluster.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPrefix`] before any provider call if
    /// `name_prefix` is unusable. Any provider error aborts the run and leaves
    /// already created resources in place (recorded in the registry).
    pub async fn create(&self, template: &ClusterTemplate, name_prefix: &str) -> Result<CreateOutcome> {
        let prefix = RunPrefix::derive(name_prefix)?;
        let span = provisioning_span("create", prefix.as_str());
        self.create_inner(template, prefix).instrument(span).await
    }

    async fn create_inner(&self, template: &ClusterTemplate, prefix: RunPrefix) -> Result<CreateOutcome> {
        let mut bundle = ResourceBundle::new(prefix.clone());
        tracing::info!(run_id = %bundle.run_id, "starting provisioning run");

        let bucket = self
            .collaborators
            .storage
            .create_bucket(&prefix.bucket(), &self.config.folders)
            .await?;
        tracing::info!(%bucket, "created bucket");
        bundle.bucket = Some(bucket);
        self.registry.save(&bundle).await?;

        let roles: RolePair = self
            .collaborators
            .identity
            .create_roles(&prefix.job_flow_role(), &prefix.service_role())
            .await?;
        tracing::info!(
            job_flow_role = %roles.job_flow_role.name,
            service_role = %roles.service_role.name,
            "created roles"
        );
        bundle.roles = Some(RoleNames {
            job_flow_role: roles.job_flow_role.name.clone(),
            service_role: roles.service_role.name.clone(),
        });
        self.registry.save(&bundle).await?;

        let groups: SecurityGroups = self
            .collaborators
            .network
            .create_security_groups(prefix.as_str())
            .await?;
        tracing::info!(
            manager = %groups.manager.id,
            worker = %groups.worker.id,
            "created security groups"
        );
        bundle.security_groups = groups.to_vec();
        self.registry.save(&bundle).await?;

        tracing::info!(
            wait_secs = self.config.propagation_wait.as_secs(),
            "Wait for roles and profiles to propagate..."
        );
        tokio::time::sleep(self.config.propagation_wait).await;

        let request = JobFlowRequest {
            name: prefix.cluster_name(),
            log_uri: prefix.log_uri(),
            enable_debugging: template.enable_debugging,
            applications: template.applications.clone(),
            job_flow_role: roles.job_flow_role,
            service_role: roles.service_role,
            security_groups: groups,
            release_label: template.release_label.clone(),
            instance_type: template.instance_type.clone(),
            instance_count: template.instance_count,
            keep_alive: template.keep_alive,
            ec2_key_name: template.ec2_key_name.clone(),
        };

        match submit_job_flow(
            self.collaborators.clusters.as_ref(),
            &request,
            &self.config.submission,
        )
        .await
        {
            Ok(submission) => {
                bundle.cluster_id = Some(submission.cluster_id.clone());
                bundle.set_status(BundleStatus::Submitted);
                self.registry.save(&bundle).await?;
                tracing::info!(
                    cluster_id = %submission.cluster_id,
                    attempts = submission.attempts,
                    "Running job flow for cluster"
                );
                Ok(CreateOutcome {
                    cluster_id: submission.cluster_id,
                    bundle,
                    attempts: submission.attempts,
                })
            }
            Err(err) => {
                bundle.set_status(BundleStatus::SubmissionFailed);
                if let Err(save_err) = self.registry.save(&bundle).await {
                    tracing::warn!(error = %save_err, "failed to record failed submission");
                }
                Err(err.into())
            }
        }
    }

    /// Lists clusters exactly as the cluster service reports them.
    ///
    /// # Errors
    ///
    /// Returns the provider error if listing fails.
    pub async fn list(&self) -> Result<Vec<ClusterSummary>> {
        let clusters = self.collaborators.clusters.list_clusters().await?;
        Ok(clusters)
    }

    /// Terminates a cluster and, after confirmation, deletes what its run created.
    ///
    /// With `remove_all` one combined question covers every class; otherwise
    /// each class gets its own question.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle cannot be resolved or the termination
    /// call fails. Failed deletions are reported in the returned report.
    pub async fn terminate(&self, cluster_id: &str, remove_all: bool) -> Result<TeardownReport> {
        let (bundle, source) = self.resolve_bundle(cluster_id).await?;
        let span = provisioning_span("terminate", bundle.prefix.as_str());
        self.terminate_inner(cluster_id, bundle, source, remove_all)
            .instrument(span)
            .await
    }

    async fn terminate_inner(
        &self,
        cluster_id: &str,
        mut bundle: ResourceBundle,
        source: BundleSource,
        remove_all: bool,
    ) -> Result<TeardownReport> {
        self.collaborators
            .clusters
            .terminate_cluster(cluster_id)
            .await?;
        tracing::info!(cluster_id, "terminated cluster");
        bundle.set_status(BundleStatus::Terminated);

        let mut report = TeardownReport::new(cluster_id, bundle.prefix.clone(), source);

        if remove_all {
            if self.confirm.confirm(REMOVE_ALL_QUESTION) {
                for class in ResourceClass::ALL {
                    let outcome = self.delete_class(&mut bundle, class).await;
                    report.record(class, outcome);
                }
            } else {
                for class in ResourceClass::ALL {
                    report.record(class, ClassOutcome::Kept);
                }
                tracing::warn!("{REMOVE_ALL_COST_REMINDER}");
                report.cost_reminders.push(REMOVE_ALL_COST_REMINDER.to_string());
            }
        } else {
            for class in ResourceClass::ALL {
                if self.confirm.confirm(class.question()) {
                    let outcome = self.delete_class(&mut bundle, class).await;
                    report.record(class, outcome);
                } else {
                    report.record(class, ClassOutcome::Kept);
                    tracing::warn!(class = class.as_label(), "{}", class.cost_reminder());
                    report.cost_reminders.push(class.cost_reminder().to_string());
                }
            }
        }

        let persisted = if bundle.is_drained() {
            self.registry.remove(bundle.run_id).await
        } else {
            self.registry.save(&bundle).await
        };
        if let Err(err) = persisted {
            tracing::warn!(error = %err, "failed to update registry after teardown");
            report.warnings.push(format!("registry not updated: {err}"));
        }

        Ok(report)
    }

    async fn resolve_bundle(&self, cluster_id: &str) -> Result<(ResourceBundle, BundleSource)> {
        if let Some(bundle) = self.registry.find_by_cluster(cluster_id).await? {
            tracing::debug!(cluster_id, run_id = %bundle.run_id, "bundle found in registry");
            return Ok((bundle, BundleSource::Registry));
        }

        let description = self
            .collaborators
            .clusters
            .describe_cluster(cluster_id)
            .await?;
        let prefix = RunPrefix::from_cluster_name(&description.name)?;
        let groups = self
            .collaborators
            .network
            .find_security_groups(prefix.as_str())
            .await?;
        if groups.len() < 2 {
            tracing::warn!(prefix = %prefix, found = groups.len(), "security groups for run not found");
        }
        tracing::info!(cluster_id, prefix = %prefix, "recovered bundle from cluster name");
        Ok((
            ResourceBundle::recovered(prefix, cluster_id, groups),
            BundleSource::Recovered,
        ))
    }

    async fn delete_class(&self, bundle: &mut ResourceBundle, class: ResourceClass) -> ClassOutcome {
        let result = match class {
            ResourceClass::Roles => match &bundle.roles {
                Some(roles) => self.collaborators.identity.delete_roles(&roles.to_vec()).await,
                None => return ClassOutcome::Missing,
            },
            ResourceClass::SecurityGroups if bundle.security_groups.is_empty() => {
                return ClassOutcome::Missing;
            }
            ResourceClass::SecurityGroups => {
                self.collaborators
                    .network
                    .delete_security_groups(&bundle.security_groups, bundle.prefix.as_str())
                    .await
            }
            ResourceClass::Bucket => match &bundle.bucket {
                Some(bucket) => self.collaborators.storage.delete_bucket(bucket).await,
                None => return ClassOutcome::Missing,
            },
        };

        match result {
            Ok(()) => {
                tracing::info!(class = class.as_label(), "deleted resources");
                bundle.release(class);
                ClassOutcome::Deleted
            }
            Err(err) => {
                tracing::warn!(class = class.as_label(), error = %err, "failed to delete resources");
                ClassOutcome::Failed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::confirm::ScriptedConfirm;
    use crate::error::{Error, PROPAGATION_DELAY_CODE, ProviderError, Service};
    use crate::memory::MemoryCloud;
    use crate::registry::MemoryRegistry;

    struct Harness {
        cloud: MemoryCloud,
        registry: MemoryRegistry,
        confirm: Arc<ScriptedConfirm>,
        saga: ProvisioningSaga,
    }

    fn harness(answers: &[bool]) -> Harness {
        let cloud = MemoryCloud::new();
        let registry = MemoryRegistry::new();
        let confirm = Arc::new(ScriptedConfirm::new(answers.iter().copied()));
        let saga = ProvisioningSaga::new(
            Collaborators::shared(Arc::new(cloud.clone())),
            Arc::new(registry.clone()),
            confirm.clone(),
            SagaConfig::default(),
        );
        Harness {
            cloud,
            registry,
            confirm,
            saga,
        }
    }

    fn transient() -> ProviderError {
        ProviderError::new(Service::Cluster, "RunJobFlow", "instance profile not ready")
            .with_code(PROPAGATION_DELAY_CODE)
    }

    #[tokio::test(start_paused = true)]
    async fn create_provisions_everything_in_order() {
        let h = harness(&[]);
        let outcome = h
            .saga
            .create(&ClusterTemplate::default(), "myjob")
            .await
            .expect("create");

        let prefix = outcome.bundle.prefix.clone();
        assert!(prefix.as_str().starts_with("myjob-"));
        assert_eq!(outcome.attempts, 1);
        assert!(h.cloud.has_bucket(&prefix.bucket()));
        assert_eq!(
            h.cloud.bucket_folders(&prefix.bucket()),
            Some(SagaConfig::default().folders)
        );
        assert!(h.cloud.has_role(&format!("{prefix}-ec2-role")));
        assert!(h.cloud.has_role(&format!("{prefix}-service-role")));
        assert!(h.cloud.has_security_group(&prefix.manager_group()));
        assert_eq!(
            h.cloud.cluster_state(&outcome.cluster_id).as_deref(),
            Some("STARTING")
        );

        let submitted = h.cloud.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].name, format!("cluster-{prefix}"));
        assert_eq!(submitted[0].log_uri, format!("s3://{prefix}/logs"));
        assert_eq!(submitted[0].applications, vec!["Hadoop", "Hive", "Spark"]);
        assert!(submitted[0].enable_debugging);

        let record = h
            .registry
            .find_by_cluster(&outcome.cluster_id)
            .await
            .expect("find")
            .expect("recorded");
        assert_eq!(record.status, BundleStatus::Submitted);
        assert_eq!(record, outcome.bundle);
    }

    #[tokio::test(start_paused = true)]
    async fn create_rejects_reserved_prefix_without_side_effects() {
        let h = harness(&[]);
        let err = h
            .saga
            .create(&ClusterTemplate::default(), "cluster-x")
            .await
            .expect_err("rejected");
        assert!(matches!(err, Error::InvalidPrefix { .. }));
        assert!(h.cloud.is_empty());
        assert!(h.cloud.submitted().is_empty());
        assert!(h.registry.list().await.expect("list").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn create_retries_propagation_delay_then_succeeds() {
        let h = harness(&[]);
        h.cloud.fail_next_job_flows([transient(), transient(), transient()]);

        let start = tokio::time::Instant::now();
        let outcome = h
            .saga
            .create(&ClusterTemplate::default(), "myjob")
            .await
            .expect("create");
        let elapsed = start.elapsed();

        assert_eq!(outcome.attempts, 4);
        assert_eq!(h.cloud.submitted().len(), 4);
        // 10s propagation wait + 3 retry waits of 10s.
        assert_eq!(elapsed, Duration::from_secs(40));
    }

    #[tokio::test(start_paused = true)]
    async fn create_aborts_on_other_errors_and_keeps_resources() {
        let h = harness(&[]);
        h.cloud.fail_next_job_flows([
            transient(),
            ProviderError::new(Service::Cluster, "RunJobFlow", "quota").with_code("LimitExceeded"),
        ]);

        let start = tokio::time::Instant::now();
        let err = h
            .saga
            .create(&ClusterTemplate::default(), "myjob")
            .await
            .expect_err("aborted");
        assert_eq!(start.elapsed(), Duration::from_secs(20));
        assert_eq!(
            err.as_provider().and_then(|e| e.code.as_deref()),
            Some("LimitExceeded")
        );
        assert_eq!(h.cloud.submitted().len(), 2);

        let records = h.registry.list().await.expect("list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, BundleStatus::SubmissionFailed);
        assert!(records[0].bucket.is_some());
        assert!(h.cloud.has_bucket(&records[0].prefix.bucket()));
    }

    #[tokio::test(start_paused = true)]
    async fn create_gives_up_after_five_attempts() {
        let h = harness(&[]);
        h.cloud.fail_next_job_flows(std::iter::repeat_with(transient).take(6));

        let err = h
            .saga
            .create(&ClusterTemplate::default(), "myjob")
            .await
            .expect_err("exhausted");
        assert!(err.as_provider().is_some_and(ProviderError::is_propagation_delay));
        assert_eq!(h.cloud.submitted().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn create_stops_at_first_failed_step() {
        let h = harness(&[]);
        h.cloud.fail_operation(
            "CreateRole",
            ProviderError::new(Service::Identity, "CreateRole", "denied").with_code("AccessDenied"),
        );
        let err = h
            .saga
            .create(&ClusterTemplate::default(), "myjob")
            .await
            .expect_err("aborted");
        assert!(matches!(err, Error::Provider(_)));
        assert!(h.cloud.submitted().is_empty());
        let records = h.registry.list().await.expect("list");
        assert_eq!(records.len(), 1);
        assert!(records[0].roles.is_none());
        assert_eq!(records[0].status, BundleStatus::Provisioning);
    }

    #[tokio::test(start_paused = true)]
    async fn list_returns_provider_listing() {
        let h = harness(&[]);
        let created = h
            .saga
            .create(&ClusterTemplate::default(), "myjob")
            .await
            .expect("create");
        let listed = h.saga.list().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.cluster_id);
    }

    #[tokio::test(start_paused = true)]
    async fn terminate_declining_everything_keeps_resources() {
        let h = harness(&[false, false, false]);
        let created = h
            .saga
            .create(&ClusterTemplate::default(), "myjob")
            .await
            .expect("create");

        let report = h
            .saga
            .terminate(&created.cluster_id, false)
            .await
            .expect("terminate");

        assert_eq!(
            h.cloud.cluster_state(&created.cluster_id).as_deref(),
            Some("TERMINATED")
        );
        let prefix = &created.bundle.prefix;
        assert!(h.cloud.has_bucket(&prefix.bucket()));
        assert!(h.cloud.has_role(&prefix.job_flow_role()));
        assert!(h.cloud.has_security_group(&prefix.worker_group()));
        assert_eq!(report.cost_reminders.len(), 3);
        assert_eq!(h.confirm.asked().len(), 3);
        for class in ResourceClass::ALL {
            assert_eq!(report.outcome(class), Some(&ClassOutcome::Kept));
        }

        let record = h.registry.get(created.bundle.run_id).await.expect("get").expect("kept");
        assert_eq!(record.status, BundleStatus::Terminated);
    }

    #[tokio::test(start_paused = true)]
    async fn terminate_per_class_answers_are_independent() {
        let h = harness(&[true, false, true]);
        let created = h
            .saga
            .create(&ClusterTemplate::default(), "myjob")
            .await
            .expect("create");

        let report = h
            .saga
            .terminate(&created.cluster_id, false)
            .await
            .expect("terminate");

        let prefix = &created.bundle.prefix;
        assert!(!h.cloud.has_role(&prefix.job_flow_role()));
        assert!(h.cloud.has_security_group(&prefix.manager_group()));
        assert!(!h.cloud.has_bucket(&prefix.bucket()));
        assert_eq!(report.cost_reminders.len(), 1);
        assert_eq!(
            report.outcome(ResourceClass::SecurityGroups),
            Some(&ClassOutcome::Kept)
        );

        let record = h.registry.get(created.bundle.run_id).await.expect("get").expect("kept");
        assert!(record.roles.is_none());
        assert!(record.bucket.is_none());
        assert_eq!(record.security_groups.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn terminate_remove_all_yes_deletes_everything() {
        let h = harness(&[true]);
        let created = h
            .saga
            .create(&ClusterTemplate::default(), "myjob")
            .await
            .expect("create");

        let report = h
            .saga
            .terminate(&created.cluster_id, true)
            .await
            .expect("terminate");

        assert_eq!(h.confirm.asked(), vec![REMOVE_ALL_QUESTION.to_string()]);
        assert!(report.cost_reminders.is_empty());
        for class in ResourceClass::ALL {
            assert_eq!(report.outcome(class), Some(&ClassOutcome::Deleted));
        }
        let prefix = &created.bundle.prefix;
        assert!(!h.cloud.has_bucket(&prefix.bucket()));
        assert!(!h.cloud.has_security_group(&prefix.manager_group()));
        assert!(h.registry.list().await.expect("list").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn terminate_remove_all_no_emits_single_reminder() {
        let h = harness(&[false]);
        let created = h
            .saga
            .create(&ClusterTemplate::default(), "myjob")
            .await
            .expect("create");

        let report = h
            .saga
            .terminate(&created.cluster_id, true)
            .await
            .expect("terminate");

        assert_eq!(report.cost_reminders, vec![REMOVE_ALL_COST_REMINDER.to_string()]);
        assert!(h.cloud.has_bucket(&created.bundle.prefix.bucket()));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_deletion_does_not_stop_other_classes() {
        let h = harness(&[true, true, true]);
        let created = h
            .saga
            .create(&ClusterTemplate::default(), "myjob")
            .await
            .expect("create");
        h.cloud.fail_operation(
            "DeleteSecurityGroup",
            ProviderError::new(Service::Network, "DeleteSecurityGroup", "in use")
                .with_code("DependencyViolation"),
        );

        let report = h
            .saga
            .terminate(&created.cluster_id, false)
            .await
            .expect("terminate");

        assert!(report.has_failures());
        assert_eq!(report.outcome(ResourceClass::Roles), Some(&ClassOutcome::Deleted));
        assert!(matches!(
            report.outcome(ResourceClass::SecurityGroups),
            Some(ClassOutcome::Failed(_))
        ));
        assert_eq!(report.outcome(ResourceClass::Bucket), Some(&ClassOutcome::Deleted));
        let record = h.registry.get(created.bundle.run_id).await.expect("get").expect("kept");
        assert_eq!(record.security_groups.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn terminate_without_record_recovers_from_cluster_name() {
        let h = harness(&[true, true, true]);
        let created = h
            .saga
            .create(&ClusterTemplate::default(), "myjob")
            .await
            .expect("create");
        h.registry.remove(created.bundle.run_id).await.expect("forget");

        let report = h
            .saga
            .terminate(&created.cluster_id, false)
            .await
            .expect("terminate");

        assert_eq!(report.source, BundleSource::Recovered);
        assert_eq!(report.prefix, created.bundle.prefix);
        for class in ResourceClass::ALL {
            assert_eq!(report.outcome(class), Some(&ClassOutcome::Deleted));
        }
        assert!(!h.cloud.has_role(&created.bundle.prefix.service_role()));
    }

    #[tokio::test(start_paused = true)]
    async fn terminate_rejects_foreign_cluster_before_terminating() {
        let h = harness(&[true]);
        h.cloud.insert_cluster("j-FOREIGN", "analytics-prod");

        let err = h
            .saga
            .terminate("j-FOREIGN", false)
            .await
            .expect_err("foreign");
        assert!(matches!(err, Error::UnrecognizedClusterName { .. }));
        assert_eq!(h.cloud.cluster_state("j-FOREIGN").as_deref(), Some("WAITING"));
        assert!(h.confirm.asked().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn terminate_failure_skips_prompts() {
        let h = harness(&[true, true, true]);
        let created = h
            .saga
            .create(&ClusterTemplate::default(), "myjob")
            .await
            .expect("create");
        h.cloud.fail_operation(
            "TerminateJobFlows",
            ProviderError::new(Service::Cluster, "TerminateJobFlows", "throttled")
                .with_code("ThrottlingException"),
        );

        assert!(h.saga.terminate(&created.cluster_id, false).await.is_err());
        assert!(h.confirm.asked().is_empty());
        assert!(h.cloud.has_bucket(&created.bundle.prefix.bucket()));
    }
}
