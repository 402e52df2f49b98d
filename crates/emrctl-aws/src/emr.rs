//! Cluster lifecycle on EMR.

use async_trait::async_trait;
use aws_sdk_emr::Client;
use aws_sdk_emr::error::BuildError;
use aws_sdk_emr::types::{
    ActionOnFailure, Application, ClusterState, HadoopJarStepConfig, JobFlowInstancesConfig,
    StepConfig,
};
use emrctl_core::provider::{
    ClusterDescription, ClusterManager, ClusterSummary, JobFlowRequest, ProviderResult,
};
use emrctl_core::{ProviderError, Service};

use crate::error::{missing_field, provider_error};

/// Name of the step that enables the debugging console.
pub const DEBUGGING_STEP_NAME: &str = "Enable debugging";

/// Submits, lists, describes and terminates clusters.
#[derive(Debug, Clone)]
pub struct EmrClusterManager {
    client: Client,
}

impl EmrClusterManager {
    /// Wraps an EMR client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

/// States a cluster listing is restricted to.
pub(crate) fn active_states() -> Vec<ClusterState> {
    vec![
        ClusterState::Starting,
        ClusterState::Bootstrapping,
        ClusterState::Running,
        ClusterState::Waiting,
    ]
}

pub(crate) fn instances_config(request: &JobFlowRequest) -> JobFlowInstancesConfig {
    JobFlowInstancesConfig::builder()
        .master_instance_type(&request.instance_type)
        .slave_instance_type(&request.instance_type)
        .instance_count(request.instance_count)
        .keep_job_flow_alive_when_no_steps(request.keep_alive)
        .emr_managed_master_security_group(&request.security_groups.manager.id)
        .emr_managed_slave_security_group(&request.security_groups.worker.id)
        .set_ec2_key_name(request.ec2_key_name.clone())
        .build()
}

pub(crate) fn applications(names: &[String]) -> Vec<Application> {
    names
        .iter()
        .map(|name| Application::builder().name(name).build())
        .collect()
}

pub(crate) fn debugging_step() -> Result<StepConfig, BuildError> {
    let jar = HadoopJarStepConfig::builder()
        .jar("command-runner.jar")
        .args("state-pusher-script")
        .build()?;
    StepConfig::builder()
        .name(DEBUGGING_STEP_NAME)
        .action_on_failure(ActionOnFailure::TerminateCluster)
        .hadoop_jar_step(jar)
        .build()
}

#[async_trait]
impl ClusterManager for EmrClusterManager {
    async fn run_job_flow(&self, request: &JobFlowRequest) -> ProviderResult<String> {
        let mut call = self
            .client
            .run_job_flow()
            .name(&request.name)
            .log_uri(&request.log_uri)
            .release_label(&request.release_label)
            .instances(instances_config(request))
            .set_applications(Some(applications(&request.applications)))
            .job_flow_role(&request.job_flow_role.name)
            .service_role(&request.service_role.name)
            .visible_to_all_users(true);

        if request.enable_debugging {
            let step = debugging_step()
                .map_err(|e| ProviderError::new(Service::Cluster, "RunJobFlow", e.to_string()))?;
            call = call.steps(step);
        }

        let output = call
            .send()
            .await
            .map_err(|e| provider_error(Service::Cluster, "RunJobFlow", &e))?;
        output
            .job_flow_id()
            .map(str::to_string)
            .ok_or_else(|| missing_field(Service::Cluster, "RunJobFlow", "a job flow id"))
    }

    async fn list_clusters(&self) -> ProviderResult<Vec<ClusterSummary>> {
        let mut clusters = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let page = self
                .client
                .list_clusters()
                .set_cluster_states(Some(active_states()))
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| provider_error(Service::Cluster, "ListClusters", &e))?;

            clusters.extend(page.clusters().iter().map(|cluster| ClusterSummary {
                id: cluster.id().unwrap_or_default().to_string(),
                name: cluster.name().unwrap_or_default().to_string(),
                state: cluster
                    .status()
                    .and_then(|status| status.state())
                    .map(|state| state.as_str().to_string())
                    .unwrap_or_default(),
            }));

            match page.marker() {
                Some(next) => marker = Some(next.to_string()),
                None => break,
            }
        }
        Ok(clusters)
    }

    async fn describe_cluster(&self, cluster_id: &str) -> ProviderResult<ClusterDescription> {
        let output = self
            .client
            .describe_cluster()
            .cluster_id(cluster_id)
            .send()
            .await
            .map_err(|e| provider_error(Service::Cluster, "DescribeCluster", &e))?;
        let cluster = output
            .cluster()
            .ok_or_else(|| missing_field(Service::Cluster, "DescribeCluster", "the cluster"))?;

        Ok(ClusterDescription {
            id: cluster.id().unwrap_or(cluster_id).to_string(),
            name: cluster.name().unwrap_or_default().to_string(),
            state: cluster
                .status()
                .and_then(|status| status.state())
                .map(|state| state.as_str().to_string())
                .unwrap_or_default(),
            log_uri: cluster.log_uri().map(str::to_string),
        })
    }

    async fn terminate_cluster(&self, cluster_id: &str) -> ProviderResult<()> {
        self.client
            .terminate_job_flows()
            .job_flow_ids(cluster_id)
            .send()
            .await
            .map_err(|e| provider_error(Service::Cluster, "TerminateJobFlows", &e))?;
        tracing::debug!(cluster_id, "termination requested");
        Ok(())
    }
}
