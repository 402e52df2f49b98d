//! # emrctl-aws
//!
//! AWS implementations of the provisioning collaborators:
//!
//! | Collaborator | Service | Type |
//! |--------------|---------|------|
//! | `StorageProvisioner` | S3 | [`S3Provisioner`] |
//! | `IdentityProvisioner` | IAM | [`IamProvisioner`] |
//! | `NetworkProvisioner` | EC2 | [`Ec2Provisioner`] |
//! | `ClusterManager` | EMR | [`EmrClusterManager`] |
//!
//! Credentials and region come from the standard AWS configuration chain;
//! an explicit region overrides it.
//!
//! ```rust,ignore
//! let cloud = AwsCloud::load(Some("eu-west-1".into())).await;
//! let saga = ProvisioningSaga::new(cloud.collaborators(), registry, confirm, config);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod error;

pub mod ec2;
pub mod emr;
pub mod iam;
pub mod s3;

use std::sync::Arc;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use emrctl_core::saga::Collaborators;

pub use ec2::Ec2Provisioner;
pub use emr::EmrClusterManager;
pub use iam::IamProvisioner;
pub use s3::S3Provisioner;

/// All four AWS collaborators, built from one SDK configuration.
#[derive(Debug, Clone)]
pub struct AwsCloud {
    region: Option<String>,
    storage: S3Provisioner,
    identity: IamProvisioner,
    network: Ec2Provisioner,
    clusters: EmrClusterManager,
}

impl AwsCloud {
    /// Loads the AWS configuration chain, overriding the region if given.
    pub async fn load(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let config = loader.load().await;
        Self::from_config(&config)
    }

    /// Builds every client from an existing SDK configuration.
    #[must_use]
    pub fn from_config(config: &SdkConfig) -> Self {
        let region = config.region().map(ToString::to_string);
        tracing::debug!(region = region.as_deref().unwrap_or("<unset>"), "aws clients configured");
        Self {
            storage: S3Provisioner::new(aws_sdk_s3::Client::new(config), region.clone()),
            identity: IamProvisioner::new(aws_sdk_iam::Client::new(config)),
            network: Ec2Provisioner::new(aws_sdk_ec2::Client::new(config)),
            clusters: EmrClusterManager::new(aws_sdk_emr::Client::new(config)),
            region,
        }
    }

    /// Region the clients talk to, if one was resolved.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Hands the clients to a saga.
    #[must_use]
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            storage: Arc::new(self.storage.clone()),
            identity: Arc::new(self.identity.clone()),
            network: Arc::new(self.network.clone()),
            clusters: Arc::new(self.clusters.clone()),
        }
    }
}

