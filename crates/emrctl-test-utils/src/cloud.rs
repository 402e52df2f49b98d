//! Cloud implementation with call tracing.
//!
//! Wraps [`MemoryCloud`] and records every collaborator call, in order, for
//! test assertions.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use emrctl_core::memory::MemoryCloud;
use emrctl_core::provider::{
    ClusterDescription, ClusterManager, ClusterSummary, IdentityProvisioner, JobFlowRequest,
    NetworkProvisioner, ProviderResult, RolePair, SecurityGroup, SecurityGroups, StorageProvisioner,
};
use emrctl_core::saga::Collaborators;

/// Record of a collaborator call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudOp {
    /// Bucket creation.
    CreateBucket {
        /// Bucket name.
        bucket: String,
        /// Folders requested.
        folders: Vec<String>,
    },
    /// Bucket deletion.
    DeleteBucket {
        /// Bucket name.
        bucket: String,
    },
    /// Role creation.
    CreateRoles {
        /// Job-flow role name.
        job_flow_role: String,
        /// Service role name.
        service_role: String,
    },
    /// Role deletion.
    DeleteRoles {
        /// Role names.
        names: Vec<String>,
    },
    /// Security group creation.
    CreateSecurityGroups {
        /// Run prefix.
        prefix: String,
    },
    /// Security group lookup by name.
    FindSecurityGroups {
        /// Run prefix.
        prefix: String,
    },
    /// Security group deletion.
    DeleteSecurityGroups {
        /// Run prefix.
        prefix: String,
        /// Names of the groups passed in.
        names: Vec<String>,
    },
    /// Job-flow submission attempt.
    RunJobFlow {
        /// Cluster name.
        name: String,
    },
    /// Cluster listing.
    ListClusters,
    /// Cluster description.
    DescribeCluster {
        /// Cluster id.
        cluster_id: String,
    },
    /// Cluster termination.
    TerminateCluster {
        /// Cluster id.
        cluster_id: String,
    },
}

impl CloudOp {
    /// Returns true for calls that create, delete or start something.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::FindSecurityGroups { .. } | Self::ListClusters | Self::DescribeCluster { .. }
        )
    }

    /// Returns true for calls that delete a resource class.
    #[must_use]
    pub const fn is_deletion(&self) -> bool {
        matches!(
            self,
            Self::DeleteBucket { .. } | Self::DeleteRoles { .. } | Self::DeleteSecurityGroups { .. }
        )
    }
}

/// In-memory cloud with call tracing.
#[derive(Debug, Clone, Default)]
pub struct TracingCloud {
    inner: MemoryCloud,
    operations: Arc<Mutex<Vec<CloudOp>>>,
}

impl TracingCloud {
    /// Creates a new empty cloud.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the wrapped cloud, for failure injection and state checks.
    #[must_use]
    pub fn inner(&self) -> &MemoryCloud {
        &self.inner
    }

    /// Returns all recorded calls.
    #[must_use]
    pub fn operations(&self) -> Vec<CloudOp> {
        self.operations.lock().expect("lock").clone()
    }

    /// Clears recorded calls.
    pub fn clear_operations(&self) {
        self.operations.lock().expect("lock").clear();
    }

    /// Returns the collaborators for a saga, all backed by this cloud.
    #[must_use]
    pub fn collaborators(&self) -> Collaborators {
        Collaborators::shared(Arc::new(self.clone()))
    }

    async fn record(&self, op: CloudOp) {
        self.operations.lock().expect("lock").push(op);
    }
}

#[async_trait]
impl StorageProvisioner for TracingCloud {
    async fn create_bucket(&self, bucket: &str, folders: &[String]) -> ProviderResult<String> {
        self.record(CloudOp::CreateBucket {
            bucket: bucket.to_string(),
            folders: folders.to_vec(),
        })
        .await;
        self.inner.create_bucket(bucket, folders).await
    }

    async fn delete_bucket(&self, bucket: &str) -> ProviderResult<()> {
        self.record(CloudOp::DeleteBucket {
            bucket: bucket.to_string(),
        })
        .await;
        self.inner.delete_bucket(bucket).await
    }
}

#[async_trait]
impl IdentityProvisioner for TracingCloud {
    async fn create_roles(&self, job_flow_role: &str, service_role: &str) -> ProviderResult<RolePair> {
        self.record(CloudOp::CreateRoles {
            job_flow_role: job_flow_role.to_string(),
            service_role: service_role.to_string(),
        })
        .await;
        self.inner.create_roles(job_flow_role, service_role).await
    }

    async fn delete_roles(&self, names: &[String]) -> ProviderResult<()> {
        self.record(CloudOp::DeleteRoles {
            names: names.to_vec(),
        })
        .await;
        self.inner.delete_roles(names).await
    }
}

#[async_trait]
impl NetworkProvisioner for TracingCloud {
    async fn create_security_groups(&self, prefix: &str) -> ProviderResult<SecurityGroups> {
        self.record(CloudOp::CreateSecurityGroups {
            prefix: prefix.to_string(),
        })
        .await;
        self.inner.create_security_groups(prefix).await
    }

    async fn find_security_groups(&self, prefix: &str) -> ProviderResult<Vec<SecurityGroup>> {
        self.record(CloudOp::FindSecurityGroups {
            prefix: prefix.to_string(),
        })
        .await;
        self.inner.find_security_groups(prefix).await
    }

    async fn delete_security_groups(
        &self,
        groups: &[SecurityGroup],
        prefix: &str,
    ) -> ProviderResult<()> {
        self.record(CloudOp::DeleteSecurityGroups {
            prefix: prefix.to_string(),
            names: groups.iter().map(|group| group.name.clone()).collect(),
        })
        .await;
        self.inner.delete_security_groups(groups, prefix).await
    }
}

#[async_trait]
impl ClusterManager for TracingCloud {
    async fn run_job_flow(&self, request: &JobFlowRequest) -> ProviderResult<String> {
        self.record(CloudOp::RunJobFlow {
            name: request.name.clone(),
        })
        .await;
        self.inner.run_job_flow(request).await
    }

    async fn list_clusters(&self) -> ProviderResult<Vec<ClusterSummary>> {
        self.record(CloudOp::ListClusters).await;
        self.inner.list_clusters().await
    }

    async fn describe_cluster(&self, cluster_id: &str) -> ProviderResult<ClusterDescription> {
        self.record(CloudOp::DescribeCluster {
            cluster_id: cluster_id.to_string(),
        })
        .await;
        self.inner.describe_cluster(cluster_id).await
    }

    async fn terminate_cluster(&self, cluster_id: &str) -> ProviderResult<()> {
        self.record(CloudOp::TerminateCluster {
            cluster_id: cluster_id.to_string(),
        })
        .await;
        self.inner.terminate_cluster(cluster_id).await
    }
}
