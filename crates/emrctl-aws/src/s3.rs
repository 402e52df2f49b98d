//! Bucket provisioning on S3.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use emrctl_core::Service;
use emrctl_core::provider::{ProviderResult, StorageProvisioner};

use crate::error::provider_error;

/// Region whose buckets must be created without a location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// Creates and deletes run buckets.
#[derive(Debug, Clone)]
pub struct S3Provisioner {
    client: Client,
    region: Option<String>,
}

impl S3Provisioner {
    /// Wraps an S3 client configured for `region`.
    #[must_use]
    pub const fn new(client: Client, region: Option<String>) -> Self {
        Self { client, region }
    }
}

/// Location constraint for a bucket created in `region`.
pub(crate) fn bucket_configuration(region: Option<&str>) -> Option<CreateBucketConfiguration> {
    match region {
        None | Some(DEFAULT_REGION) => None,
        Some(region) => Some(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build(),
        ),
    }
}

/// Key of the empty object that stands in for a folder.
pub(crate) fn folder_key(folder: &str) -> String {
    format!("{}/", folder.trim_end_matches('/'))
}

#[async_trait]
impl StorageProvisioner for S3Provisioner {
    async fn create_bucket(&self, bucket: &str, folders: &[String]) -> ProviderResult<String> {
        self.client
            .create_bucket()
            .bucket(bucket)
            .set_create_bucket_configuration(bucket_configuration(self.region.as_deref()))
            .send()
            .await
            .map_err(|e| provider_error(Service::Storage, "CreateBucket", &e))?;

        for folder in folders {
            self.client
                .put_object()
                .bucket(bucket)
                .key(folder_key(folder))
                .body(ByteStream::from_static(b""))
                .send()
                .await
                .map_err(|e| provider_error(Service::Storage, "PutObject", &e))?;
        }

        tracing::debug!(bucket, folders = folders.len(), "bucket created");
        Ok(bucket.to_string())
    }

    async fn delete_bucket(&self, bucket: &str) -> ProviderResult<()> {
        let mut continuation: Option<String> = None;
        let mut removed = 0_usize;
        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| provider_error(Service::Storage, "ListObjectsV2", &e))?;

            for key in page.contents().iter().filter_map(|object| object.key()) {
                self.client
                    .delete_object()
                    .bucket(bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|e| provider_error(Service::Storage, "DeleteObject", &e))?;
                removed += 1;
            }

            match page.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| provider_error(Service::Storage, "DeleteBucket", &e))?;

        tracing::debug!(bucket, removed, "bucket deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn us_east_1_has_no_location_constraint() {
        assert!(bucket_configuration(None).is_none());
        assert!(bucket_configuration(Some("us-east-1")).is_none());
    }

    #[test]
    fn other_regions_set_location_constraint() {
        let config = bucket_configuration(Some("eu-west-1")).expect("constraint");
        assert_eq!(
            config.location_constraint(),
            Some(&BucketLocationConstraint::EuWest1)
        );
    }

    #[test]
    fn folders_are_trailing_slash_keys() {
        assert_eq!(folder_key("logs"), "logs/");
        assert_eq!(folder_key("scripts/"), "scripts/");
    }
}
