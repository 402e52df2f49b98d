//! Collaborator contracts for the cloud services a provisioning run touches.
//!
//! The saga only talks to these four traits. `emrctl-aws` implements them on
//! top of the AWS SDK; [`crate::memory::MemoryCloud`] implements them in
//! memory for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Result type returned by collaborator calls.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// An IAM role created for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role name (also the instance profile name for the job-flow role).
    pub name: String,
    /// Provider resource name.
    pub arn: String,
}

/// The two roles a cluster needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePair {
    /// Role assumed by the cluster's instances.
    pub job_flow_role: Role,
    /// Role assumed by the cluster service.
    pub service_role: Role,
}

/// A security group created for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    /// Provider group id (e.g. `sg-0123`).
    pub id: String,
    /// Group name.
    pub name: String,
}

/// Security groups for the primary node and the worker nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroups {
    /// Group attached to the primary node.
    pub manager: SecurityGroup,
    /// Group attached to core and task nodes.
    pub worker: SecurityGroup,
}

impl SecurityGroups {
    /// Returns both groups, manager first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<SecurityGroup> {
        vec![self.manager.clone(), self.worker.clone()]
    }
}

/// Everything the cluster service needs to start a job flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFlowRequest {
    /// Cluster name.
    pub name: String,
    /// Where the cluster writes its logs.
    pub log_uri: String,
    /// Whether to add the debugging step.
    pub enable_debugging: bool,
    /// Applications to install (e.g. `Hadoop`, `Spark`).
    pub applications: Vec<String>,
    /// Instance profile / role assumed by cluster instances.
    pub job_flow_role: Role,
    /// Role assumed by the cluster service.
    pub service_role: Role,
    /// Security groups for the cluster nodes.
    pub security_groups: SecurityGroups,
    /// Release label, e.g. `emr-6.15.0`.
    pub release_label: String,
    /// Instance type for every node.
    pub instance_type: String,
    /// Total number of instances.
    pub instance_count: i32,
    /// Keep the cluster alive once it has no steps left.
    pub keep_alive: bool,
    /// Optional SSH key pair name.
    pub ec2_key_name: Option<String>,
}

/// One entry of a cluster listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    /// Cluster id.
    pub id: String,
    /// Cluster name.
    pub name: String,
    /// Provider-reported state, e.g. `WAITING`.
    pub state: String,
}

/// Result of describing a single cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDescription {
    /// Cluster id.
    pub id: String,
    /// Cluster name as stored by the provider.
    pub name: String,
    /// Provider-reported state.
    pub state: String,
    /// Log location, when configured.
    pub log_uri: Option<String>,
}

/// Bucket creation and deletion.
#[async_trait]
pub trait StorageProvisioner: Send + Sync {
    /// Creates `bucket` and one empty object per folder.
    ///
    /// Returns the bucket name.
    async fn create_bucket(&self, bucket: &str, folders: &[String]) -> ProviderResult<String>;

    /// Deletes every object in `bucket`, then the bucket itself.
    async fn delete_bucket(&self, bucket: &str) -> ProviderResult<()>;
}

/// Role creation and deletion.
#[async_trait]
pub trait IdentityProvisioner: Send + Sync {
    /// Creates the job-flow role (with its instance profile) and the service role.
    async fn create_roles(&self, job_flow_role: &str, service_role: &str)
    -> ProviderResult<RolePair>;

    /// Deletes the named roles, detaching their policies first.
    async fn delete_roles(&self, names: &[String]) -> ProviderResult<()>;
}

/// Security group creation, lookup and deletion.
#[async_trait]
pub trait NetworkProvisioner: Send + Sync {
    /// Creates the manager and worker groups for a run prefix.
    async fn create_security_groups(&self, prefix: &str) -> ProviderResult<SecurityGroups>;

    /// Looks up the groups a run created, by name.
    ///
    /// Returns only the groups that still exist, manager first.
    async fn find_security_groups(&self, prefix: &str) -> ProviderResult<Vec<SecurityGroup>>;

    /// Deletes the given groups, revoking their ingress rules first.
    async fn delete_security_groups(
        &self,
        groups: &[SecurityGroup],
        prefix: &str,
    ) -> ProviderResult<()>;
}

/// Cluster lifecycle calls.
#[async_trait]
pub trait ClusterManager: Send + Sync {
    /// Starts a job flow and returns the new cluster id.
    async fn run_job_flow(&self, request: &JobFlowRequest) -> ProviderResult<String>;

    /// Lists active clusters.
    async fn list_clusters(&self) -> ProviderResult<Vec<ClusterSummary>>;

    /// Describes one cluster.
    async fn describe_cluster(&self, cluster_id: &str) -> ProviderResult<ClusterDescription>;

    /// Terminates one cluster.
    async fn terminate_cluster(&self, cluster_id: &str) -> ProviderResult<()>;
}
