//! Security group provisioning on EC2.
//!
//! Groups are created empty in the default VPC. Once the cluster starts, the
//! cluster service adds ingress rules in which each group references the
//! other, so both groups are stripped of ingress before either is deleted.

use async_trait::async_trait;
use aws_sdk_ec2::Client;
use aws_sdk_ec2::types::{Filter, SecurityGroup as Ec2SecurityGroup};
use emrctl_core::Service;
use emrctl_core::naming::{manager_group_name, worker_group_name};
use emrctl_core::provider::{NetworkProvisioner, ProviderResult, SecurityGroup, SecurityGroups};

use crate::error::{missing_field, provider_error};

/// Creates, finds and deletes run security groups.
#[derive(Debug, Clone)]
pub struct Ec2Provisioner {
    client: Client,
}

impl Ec2Provisioner {
    /// Wraps an EC2 client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    async fn default_vpc(&self) -> ProviderResult<String> {
        let output = self
            .client
            .describe_vpcs()
            .filters(filter("isDefault", ["true"]))
            .send()
            .await
            .map_err(|e| provider_error(Service::Network, "DescribeVpcs", &e))?;
        output
            .vpcs()
            .iter()
            .find_map(|vpc| vpc.vpc_id())
            .map(str::to_string)
            .ok_or_else(|| missing_field(Service::Network, "DescribeVpcs", "a default VPC"))
    }

    async fn create_group(&self, name: String, role: &str, vpc_id: &str) -> ProviderResult<SecurityGroup> {
        let output = self
            .client
            .create_security_group()
            .group_name(&name)
            .description(group_description(role, &name))
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(|e| provider_error(Service::Network, "CreateSecurityGroup", &e))?;
        let id = output
            .group_id()
            .map(str::to_string)
            .ok_or_else(|| missing_field(Service::Network, "CreateSecurityGroup", "a group id"))?;
        Ok(SecurityGroup { id, name })
    }
}

fn filter<const N: usize>(name: &str, values: [&str; N]) -> Filter {
    values
        .into_iter()
        .fold(Filter::builder().name(name), |builder, value| builder.values(value))
        .build()
}

/// Description stored on a run security group.
pub(crate) fn group_description(role: &str, name: &str) -> String {
    format!("emrctl {role} nodes ({name})")
}

#[async_trait]
impl NetworkProvisioner for Ec2Provisioner {
    async fn create_security_groups(&self, prefix: &str) -> ProviderResult<SecurityGroups> {
        let vpc_id = self.default_vpc().await?;
        let manager = self
            .create_group(manager_group_name(prefix), "primary", &vpc_id)
            .await?;
        let worker = self
            .create_group(worker_group_name(prefix), "core and task", &vpc_id)
            .await?;

        tracing::debug!(
            vpc = %vpc_id,
            manager = %manager.id,
            worker = %worker.id,
            "security groups created"
        );
        Ok(SecurityGroups { manager, worker })
    }

    async fn find_security_groups(&self, prefix: &str) -> ProviderResult<Vec<SecurityGroup>> {
        let manager_name = manager_group_name(prefix);
        let worker_name = worker_group_name(prefix);
        let output = self
            .client
            .describe_security_groups()
            .filters(filter("group-name", [manager_name.as_str(), worker_name.as_str()]))
            .send()
            .await
            .map_err(|e| provider_error(Service::Network, "DescribeSecurityGroups", &e))?;

        Ok(found_groups(output.security_groups(), [manager_name.as_str(), worker_name.as_str()]))
    }

    async fn delete_security_groups(
        &self,
        groups: &[SecurityGroup],
        prefix: &str,
    ) -> ProviderResult<()> {
        let ids: Vec<&str> = groups.iter().map(|group| group.id.as_str()).collect();

        for &id in &ids {
            let output = self
                .client
                .describe_security_groups()
                .group_ids(id)
                .send()
                .await
                .map_err(|e| provider_error(Service::Network, "DescribeSecurityGroups", &e))?;
            for group in output.security_groups() {
                let permissions = group.ip_permissions();
                if permissions.is_empty() {
                    continue;
                }
                self.client
                    .revoke_security_group_ingress()
                    .group_id(id)
                    .set_ip_permissions(Some(permissions.to_vec()))
                    .send()
                    .await
                    .map_err(|e| {
                        provider_error(Service::Network, "RevokeSecurityGroupIngress", &e)
                    })?;
            }
        }

        for id in ids {
            self.client
                .delete_security_group()
                .group_id(id)
                .send()
                .await
                .map_err(|e| provider_error(Service::Network, "DeleteSecurityGroup", &e))?;
        }

        tracing::debug!(prefix, "security groups deleted");
        Ok(())
    }
}

/// Picks the named groups out of a describe response, in the order given.
fn found_groups(described: &[Ec2SecurityGroup], names: [&str; 2]) -> Vec<SecurityGroup> {
    names
        .into_iter()
        .filter_map(|name| {
            described
                .iter()
                .find(|group| group.group_name() == Some(name))
                .and_then(|group| group.group_id())
                .map(|id| SecurityGroup {
                    id: id.to_string(),
                    name: name.to_string(),
                })
        })
        .collect()
}
