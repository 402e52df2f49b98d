//! In-memory cloud for testing.
//!
//! [`MemoryCloud`] implements all four collaborator traits over plain maps so
//! the saga can run without AWS. Failures can be injected per operation, and
//! job-flow submission can be scripted to fail a given number of times.
//! Not suitable for production.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{ProviderError, Service};
use crate::naming::{manager_group_name, worker_group_name};
use crate::provider::{
    ClusterDescription, ClusterManager, ClusterSummary, IdentityProvisioner, JobFlowRequest,
    NetworkProvisioner, ProviderResult, Role, RolePair, SecurityGroup, SecurityGroups,
    StorageProvisioner,
};

const ACTIVE_STATES: [&str; 4] = ["STARTING", "BOOTSTRAPPING", "RUNNING", "WAITING"];

#[derive(Debug, Default)]
struct CloudState {
    buckets: HashMap<String, Vec<String>>,
    roles: HashSet<String>,
    groups: HashMap<String, SecurityGroup>,
    clusters: BTreeMap<String, ClusterDescription>,
    submitted: Vec<JobFlowRequest>,
    job_flow_failures: VecDeque<ProviderError>,
    operation_failures: HashMap<String, ProviderError>,
    next_id: u64,
}

impl CloudState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn injected(&self, operation: &str) -> ProviderResult<()> {
        match self.operation_failures.get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// In-memory implementation of every collaborator.
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryCloud {
    state: Arc<Mutex<CloudState>>,
}

impl MemoryCloud {
    /// Creates an empty cloud.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self, service: Service, operation: &str) -> ProviderResult<MutexGuard<'_, CloudState>> {
        self.state
            .lock()
            .map_err(|_| ProviderError::new(service, operation, "lock poisoned"))
    }

    fn read(&self) -> Option<MutexGuard<'_, CloudState>> {
        self.state.lock().ok()
    }

    /// Makes the next `errors.len()` job-flow submissions fail, in order.
    pub fn fail_next_job_flows(&self, errors: impl IntoIterator<Item = ProviderError>) {
        if let Some(mut state) = self.read() {
            state.job_flow_failures.extend(errors);
        }
    }

    /// Makes every call to `operation` fail with `error` until cleared.
    ///
    /// Operation names are the provider's, e.g. `CreateBucket`, `DeleteRole`,
    /// `DeleteSecurityGroup`, `TerminateJobFlows`.
    pub fn fail_operation(&self, operation: impl Into<String>, error: ProviderError) {
        if let Some(mut state) = self.read() {
            state.operation_failures.insert(operation.into(), error);
        }
    }

    /// Removes an injected failure.
    pub fn clear_failure(&self, operation: &str) {
        if let Some(mut state) = self.read() {
            state.operation_failures.remove(operation);
        }
    }

    /// Returns true if the bucket exists.
    #[must_use]
    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.read().is_some_and(|s| s.buckets.contains_key(bucket))
    }

    /// Returns the folders created in a bucket.
    #[must_use]
    pub fn bucket_folders(&self, bucket: &str) -> Option<Vec<String>> {
        self.read().and_then(|s| s.buckets.get(bucket).cloned())
    }

    /// Returns true if the role exists.
    #[must_use]
    pub fn has_role(&self, name: &str) -> bool {
        self.read().is_some_and(|s| s.roles.contains(name))
    }

    /// Returns true if a security group with this name exists.
    #[must_use]
    pub fn has_security_group(&self, name: &str) -> bool {
        self.read().is_some_and(|s| s.groups.contains_key(name))
    }

    /// Returns the provider state of a cluster.
    #[must_use]
    pub fn cluster_state(&self, cluster_id: &str) -> Option<String> {
        self.read()
            .and_then(|s| s.clusters.get(cluster_id).map(|c| c.state.clone()))
    }

    /// Returns every job-flow request that was accepted or rejected.
    #[must_use]
    pub fn submitted(&self) -> Vec<JobFlowRequest> {
        self.read().map(|s| s.submitted.clone()).unwrap_or_default()
    }

    /// Returns true if no bucket, role, group or cluster exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_some_and(|s| {
            s.buckets.is_empty() && s.roles.is_empty() && s.groups.is_empty() && s.clusters.is_empty()
        })
    }

    /// Registers a cluster that was not created through this cloud.
    pub fn insert_cluster(&self, id: impl Into<String>, name: impl Into<String>) {
        if let Some(mut state) = self.read() {
            let id = id.into();
            state.clusters.insert(
                id.clone(),
                ClusterDescription {
                    id,
                    name: name.into(),
                    state: "WAITING".into(),
                    log_uri: None,
                },
            );
        }
    }
}

#[async_trait]
impl StorageProvisioner for MemoryCloud {
    async fn create_bucket(&self, bucket: &str, folders: &[String]) -> ProviderResult<String> {
        let mut state = self.lock(Service::Storage, "CreateBucket")?;
        state.injected("CreateBucket")?;
        if state.buckets.contains_key(bucket) {
            return Err(
                ProviderError::new(Service::Storage, "CreateBucket", "bucket already exists")
                    .with_code("BucketAlreadyOwnedByYou"),
            );
        }
        state.buckets.insert(bucket.to_string(), folders.to_vec());
        Ok(bucket.to_string())
    }

    async fn delete_bucket(&self, bucket: &str) -> ProviderResult<()> {
        let mut state = self.lock(Service::Storage, "DeleteBucket")?;
        state.injected("DeleteBucket")?;
        state.buckets.remove(bucket).map(|_| ()).ok_or_else(|| {
            ProviderError::new(Service::Storage, "DeleteBucket", format!("no bucket {bucket}"))
                .with_code("NoSuchBucket")
        })
    }
}

#[async_trait]
impl IdentityProvisioner for MemoryCloud {
    async fn create_roles(
        &self,
        job_flow_role: &str,
        service_role: &str,
    ) -> ProviderResult<RolePair> {
        let mut state = self.lock(Service::Identity, "CreateRole")?;
        state.injected("CreateRole")?;
        for name in [job_flow_role, service_role] {
            if state.roles.contains(name) {
                return Err(ProviderError::new(
                    Service::Identity,
                    "CreateRole",
                    format!("role {name} already exists"),
                )
                .with_code("EntityAlreadyExists"));
            }
        }
        state.roles.insert(job_flow_role.to_string());
        state.roles.insert(service_role.to_string());
        let arn = |name: &str| format!("arn:aws:iam::000000000000:role/{name}");
        Ok(RolePair {
            job_flow_role: Role {
                name: job_flow_role.to_string(),
                arn: arn(job_flow_role),
            },
            service_role: Role {
                name: service_role.to_string(),
                arn: arn(service_role),
            },
        })
    }

    async fn delete_roles(&self, names: &[String]) -> ProviderResult<()> {
        let mut state = self.lock(Service::Identity, "DeleteRole")?;
        state.injected("DeleteRole")?;
        for name in names {
            if !state.roles.remove(name) {
                return Err(ProviderError::new(
                    Service::Identity,
                    "DeleteRole",
                    format!("role {name} not found"),
                )
                .with_code("NoSuchEntity"));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl NetworkProvisioner for MemoryCloud {
    async fn create_security_groups(&self, prefix: &str) -> ProviderResult<SecurityGroups> {
        let mut state = self.lock(Service::Network, "CreateSecurityGroup")?;
        state.injected("CreateSecurityGroup")?;
        let mut make = |name: String| {
            let id = state.next_id();
            let group = SecurityGroup {
                id: format!("sg-{id:017x}"),
                name,
            };
            state.groups.insert(group.name.clone(), group.clone());
            group
        };
        let manager = make(manager_group_name(prefix));
        let worker = make(worker_group_name(prefix));
        Ok(SecurityGroups { manager, worker })
    }

    async fn find_security_groups(&self, prefix: &str) -> ProviderResult<Vec<SecurityGroup>> {
        let state = self.lock(Service::Network, "DescribeSecurityGroups")?;
        state.injected("DescribeSecurityGroups")?;
        Ok([manager_group_name(prefix), worker_group_name(prefix)]
            .iter()
            .filter_map(|name| state.groups.get(name).cloned())
            .collect())
    }

    async fn delete_security_groups(
        &self,
        groups: &[SecurityGroup],
        _prefix: &str,
    ) -> ProviderResult<()> {
        let mut state = self.lock(Service::Network, "DeleteSecurityGroup")?;
        state.injected("DeleteSecurityGroup")?;
        for group in groups {
            if state.groups.remove(&group.name).is_none() {
                return Err(ProviderError::new(
                    Service::Network,
                    "DeleteSecurityGroup",
                    format!("group {} not found", group.id),
                )
                .with_code("InvalidGroup.NotFound"));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterManager for MemoryCloud {
    async fn run_job_flow(&self, request: &JobFlowRequest) -> ProviderResult<String> {
        let mut state = self.lock(Service::Cluster, "RunJobFlow")?;
        state.submitted.push(request.clone());
        state.injected("RunJobFlow")?;
        if let Some(err) = state.job_flow_failures.pop_front() {
            return Err(err);
        }
        let id = format!("j-{:013X}", state.next_id());
        state.clusters.insert(
            id.clone(),
            ClusterDescription {
                id: id.clone(),
                name: request.name.clone(),
                state: "STARTING".into(),
                log_uri: Some(request.log_uri.clone()),
            },
        );
        Ok(id)
    }

    async fn list_clusters(&self) -> ProviderResult<Vec<ClusterSummary>> {
        let state = self.lock(Service::Cluster, "ListClusters")?;
        state.injected("ListClusters")?;
        Ok(state
            .clusters
            .values()
            .filter(|c| ACTIVE_STATES.contains(&c.state.as_str()))
            .map(|c| ClusterSummary {
                id: c.id.clone(),
                name: c.name.clone(),
                state: c.state.clone(),
            })
            .collect())
    }

    async fn describe_cluster(&self, cluster_id: &str) -> ProviderResult<ClusterDescription> {
        let state = self.lock(Service::Cluster, "DescribeCluster")?;
        state.injected("DescribeCluster")?;
        state.clusters.get(cluster_id).cloned().ok_or_else(|| {
            ProviderError::new(
                Service::Cluster,
                "DescribeCluster",
                format!("cluster id '{cluster_id}' is not valid"),
            )
            .with_code("InvalidRequestException")
        })
    }

    async fn terminate_cluster(&self, cluster_id: &str) -> ProviderResult<()> {
        let mut state = self.lock(Service::Cluster, "TerminateJobFlows")?;
        state.injected("TerminateJobFlows")?;
        let cluster = state.clusters.get_mut(cluster_id).ok_or_else(|| {
            ProviderError::new(
                Service::Cluster,
                "TerminateJobFlows",
                format!("cluster id '{cluster_id}' is not valid"),
            )
            .with_code("InvalidRequestException")
        })?;
        cluster.state = "TERMINATED".into();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bucket_lifecycle() {
        let cloud = MemoryCloud::new();
        cloud
            .create_bucket("b", &["logs".to_string()])
            .await
            .expect("create");
        assert_eq!(cloud.bucket_folders("b"), Some(vec!["logs".to_string()]));
        assert!(cloud.create_bucket("b", &[]).await.is_err());
        cloud.delete_bucket("b").await.expect("delete");
        assert!(!cloud.has_bucket("b"));
        assert!(cloud.delete_bucket("b").await.is_err());
    }

    #[tokio::test]
    async fn groups_can_be_found_by_prefix() {
        let cloud = MemoryCloud::new();
        let created = cloud.create_security_groups("run-1").await.expect("create");
        let found = cloud.find_security_groups("run-1").await.expect("find");
        assert_eq!(found, created.to_vec());
        assert!(cloud.find_security_groups("run-2").await.expect("find").is_empty());
        cloud
            .delete_security_groups(&found, "run-1")
            .await
            .expect("delete");
        assert!(cloud.is_empty());
    }

    #[tokio::test]
    async fn lookup_returns_surviving_group() {
        let cloud = MemoryCloud::new();
        let created = cloud.create_security_groups("run-1").await.expect("create");
        cloud
            .delete_security_groups(std::slice::from_ref(&created.worker), "run-1")
            .await
            .expect("delete worker");
        let found = cloud.find_security_groups("run-1").await.expect("find");
        assert_eq!(found, vec![created.manager]);
    }

    #[tokio::test]
    async fn unknown_cluster_errors_are_not_transient() {
        let cloud = MemoryCloud::new();
        let err = cloud.terminate_cluster("j-missing").await.expect_err("unknown");
        assert_eq!(err.code.as_deref(), Some("InvalidRequestException"));
        assert!(!err.is_propagation_delay());
        let err = cloud.describe_cluster("j-missing").await.expect_err("unknown");
        assert!(!err.is_propagation_delay());
    }

    #[tokio::test]
    async fn injected_failures_apply_until_cleared() {
        let cloud = MemoryCloud::new();
        cloud.fail_operation(
            "CreateBucket",
            ProviderError::new(Service::Storage, "CreateBucket", "boom"),
        );
        assert!(cloud.create_bucket("b", &[]).await.is_err());
        cloud.clear_failure("CreateBucket");
        assert!(cloud.create_bucket("b", &[]).await.is_ok());
    }

    #[tokio::test]
    async fn terminated_clusters_leave_listing() {
        let cloud = MemoryCloud::new();
        cloud.insert_cluster("j-1", "cluster-a-1");
        assert_eq!(cloud.list_clusters().await.expect("list").len(), 1);
        cloud.terminate_cluster("j-1").await.expect("terminate");
        assert!(cloud.list_clusters().await.expect("list").is_empty());
        assert_eq!(cloud.cluster_state("j-1").as_deref(), Some("TERMINATED"));
    }
}
