//! Role provisioning on IAM.
//!
//! Each run gets two roles:
//!
//! - the job-flow role, assumed by cluster instances through an instance
//!   profile of the same name;
//! - the service role, assumed by the cluster service itself.

use async_trait::async_trait;
use aws_sdk_iam::Client;
use emrctl_core::Service;
use emrctl_core::provider::{IdentityProvisioner, ProviderResult, Role, RolePair};
use serde_json::json;

use crate::error::{missing_field, provider_error};

const EC2_PRINCIPAL: &str = "ec2.amazonaws.com";
const EMR_PRINCIPAL: &str = "elasticmapreduce.amazonaws.com";

/// Managed policy attached to the job-flow role.
pub const JOB_FLOW_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AmazonElasticMapReduceforEC2Role";

/// Managed policy attached to the service role.
pub const SERVICE_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AmazonElasticMapReduceRole";

/// Creates and deletes run roles.
#[derive(Debug, Clone)]
pub struct IamProvisioner {
    client: Client,
}

impl IamProvisioner {
    /// Wraps an IAM client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    async fn create_role(&self, name: &str, principal: &str, policy_arn: &str) -> ProviderResult<Role> {
        let output = self
            .client
            .create_role()
            .role_name(name)
            .assume_role_policy_document(assume_role_policy(principal))
            .send()
            .await
            .map_err(|e| provider_error(Service::Identity, "CreateRole", &e))?;
        let arn = output
            .role()
            .map(|role| role.arn().to_string())
            .ok_or_else(|| missing_field(Service::Identity, "CreateRole", "the role"))?;

        self.client
            .attach_role_policy()
            .role_name(name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| provider_error(Service::Identity, "AttachRolePolicy", &e))?;

        Ok(Role {
            name: name.to_string(),
            arn,
        })
    }

    async fn create_instance_profile(&self, name: &str) -> ProviderResult<()> {
        self.client
            .create_instance_profile()
            .instance_profile_name(name)
            .send()
            .await
            .map_err(|e| provider_error(Service::Identity, "CreateInstanceProfile", &e))?;
        self.client
            .add_role_to_instance_profile()
            .instance_profile_name(name)
            .role_name(name)
            .send()
            .await
            .map_err(|e| provider_error(Service::Identity, "AddRoleToInstanceProfile", &e))?;
        Ok(())
    }

    async fn delete_role(&self, name: &str) -> ProviderResult<()> {
        let attached = self
            .client
            .list_attached_role_policies()
            .role_name(name)
            .send()
            .await
            .map_err(|e| provider_error(Service::Identity, "ListAttachedRolePolicies", &e))?;
        for policy_arn in attached
            .attached_policies()
            .iter()
            .filter_map(|policy| policy.policy_arn())
        {
            self.client
                .detach_role_policy()
                .role_name(name)
                .policy_arn(policy_arn)
                .send()
                .await
                .map_err(|e| provider_error(Service::Identity, "DetachRolePolicy", &e))?;
        }

        let profiles = self
            .client
            .list_instance_profiles_for_role()
            .role_name(name)
            .send()
            .await
            .map_err(|e| provider_error(Service::Identity, "ListInstanceProfilesForRole", &e))?;
        for profile in profiles.instance_profiles() {
            let profile_name = profile.instance_profile_name();
            self.client
                .remove_role_from_instance_profile()
                .instance_profile_name(profile_name)
                .role_name(name)
                .send()
                .await
                .map_err(|e| {
                    provider_error(Service::Identity, "RemoveRoleFromInstanceProfile", &e)
                })?;
            self.client
                .delete_instance_profile()
                .instance_profile_name(profile_name)
                .send()
                .await
                .map_err(|e| provider_error(Service::Identity, "DeleteInstanceProfile", &e))?;
        }

        self.client
            .delete_role()
            .role_name(name)
            .send()
            .await
            .map_err(|e| provider_error(Service::Identity, "DeleteRole", &e))?;
        Ok(())
    }
}

/// Trust policy letting `principal` assume a role.
pub(crate) fn assume_role_policy(principal: &str) -> String {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": principal },
            "Action": "sts:AssumeRole",
        }],
    })
    .to_string()
}

#[async_trait]
impl IdentityProvisioner for IamProvisioner {
    async fn create_roles(&self, job_flow_role: &str, service_role: &str) -> ProviderResult<RolePair> {
        let job_flow_role = self
            .create_role(job_flow_role, EC2_PRINCIPAL, JOB_FLOW_POLICY_ARN)
            .await?;
        self.create_instance_profile(&job_flow_role.name).await?;
        let service_role = self
            .create_role(service_role, EMR_PRINCIPAL, SERVICE_POLICY_ARN)
            .await?;

        tracing::debug!(
            job_flow_role = %job_flow_role.name,
            service_role = %service_role.name,
            "roles created"
        );
        Ok(RolePair {
            job_flow_role,
            service_role,
        })
    }

    async fn delete_roles(&self, names: &[String]) -> ProviderResult<()> {
        for name in names {
            self.delete_role(name).await?;
            tracing::debug!(role = %name, "role deleted");
        }
        Ok(())
    }
}
