//! The resources one provisioning run owns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::RunId;
use crate::naming::RunPrefix;
use crate::provider::SecurityGroup;

/// Lifecycle of a bundle record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleStatus {
    /// Resources are being created; no cluster yet.
    Provisioning,
    /// The job flow was accepted.
    Submitted,
    /// Every submission attempt failed; earlier resources are left in place.
    SubmissionFailed,
    /// The cluster was terminated; some resources may remain.
    Terminated,
}

impl BundleStatus {
    /// Returns a lowercase label suitable for logs.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::Provisioning => "provisioning",
            Self::Submitted => "submitted",
            Self::SubmissionFailed => "submission_failed",
            Self::Terminated => "terminated",
        }
    }
}

/// Names of the two roles a run created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleNames {
    /// Role (and instance profile) assumed by cluster instances.
    pub job_flow_role: String,
    /// Role assumed by the cluster service.
    pub service_role: String,
}

impl RoleNames {
    /// Derives both role names from a run prefix.
    #[must_use]
    pub fn for_prefix(prefix: &RunPrefix) -> Self {
        Self {
            job_flow_role: prefix.job_flow_role(),
            service_role: prefix.service_role(),
        }
    }

    /// Returns both names, job-flow role first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        vec![self.job_flow_role.clone(), self.service_role.clone()]
    }
}

/// A class of resources that teardown deletes as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    /// Both IAM roles.
    Roles,
    /// Both security groups.
    SecurityGroups,
    /// The bucket and everything in it.
    Bucket,
}

impl ResourceClass {
    /// Teardown order.
    pub const ALL: [Self; 3] = [Self::Roles, Self::SecurityGroups, Self::Bucket];

    /// Returns a lowercase label suitable for logs.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::Roles => "roles",
            Self::SecurityGroups => "security_groups",
            Self::Bucket => "bucket",
        }
    }

    /// The yes/no question asked before deleting this class.
    #[must_use]
    pub const fn question(&self) -> &'static str {
        match self {
            Self::Roles => "Do you want to delete the security roles (y/n)? ",
            Self::SecurityGroups => "Do you want to delete the security groups (y/n)? ",
            Self::Bucket => "Do you want to delete the S3 bucket (y/n)? ",
        }
    }

    /// The notice emitted when deletion of this class is declined.
    #[must_use]
    pub const fn cost_reminder(&self) -> &'static str {
        match self {
            Self::Roles | Self::SecurityGroups => {
                "Remember that objects kept in Amazon can incur charges"
            }
            Self::Bucket => "Remember that objects kept in Amazon S3 bucket can incur charges",
        }
    }
}

/// The combined question asked when every class is removed at once.
pub const REMOVE_ALL_QUESTION: &str =
    "Do you want to delete the security roles, groups, and bucket (y/n)? ";

/// The notice emitted when the combined removal is declined.
pub const REMOVE_ALL_COST_REMINDER: &str = "Remember that objects kept in Amazon can incur charges";

/// The set of resources created by one provisioning run.
///
/// A resource field is `Some` while the resource exists and belongs to the
/// run; teardown clears it once the resource is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBundle {
    /// Registry key.
    pub run_id: RunId,
    /// Prefix every resource name derives from.
    pub prefix: RunPrefix,
    /// Bucket name.
    pub bucket: Option<String>,
    /// Role names.
    pub roles: Option<RoleNames>,
    /// Security groups still owned by the run.
    #[serde(default)]
    pub security_groups: Vec<SecurityGroup>,
    /// Cluster id, once the job flow was accepted.
    pub cluster_id: Option<String>,
    /// Record status.
    pub status: BundleStatus,
    /// When the run started.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

impl ResourceBundle {
    /// Creates an empty bundle for a new run.
    #[must_use]
    pub fn new(prefix: RunPrefix) -> Self {
        let now = Utc::now();
        Self {
            run_id: RunId::generate(),
            prefix,
            bucket: None,
            roles: None,
            security_groups: Vec::new(),
            cluster_id: None,
            status: BundleStatus::Provisioning,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a bundle for a cluster that has no registry record.
    ///
    /// Bucket and role names are re-derived from the prefix and assumed to
    /// exist; groups are whatever the lookup found.
    #[must_use]
    pub fn recovered(
        prefix: RunPrefix,
        cluster_id: impl Into<String>,
        security_groups: Vec<SecurityGroup>,
    ) -> Self {
        let mut bundle = Self::new(prefix);
        bundle.bucket = Some(bundle.prefix.bucket());
        bundle.roles = Some(RoleNames::for_prefix(&bundle.prefix));
        bundle.security_groups = security_groups;
        bundle.cluster_id = Some(cluster_id.into());
        bundle.status = BundleStatus::Submitted;
        bundle
    }

    /// Returns true if the bundle still holds resources of `class`.
    #[must_use]
    pub fn holds(&self, class: ResourceClass) -> bool {
        match class {
            ResourceClass::Roles => self.roles.is_some(),
            ResourceClass::SecurityGroups => !self.security_groups.is_empty(),
            ResourceClass::Bucket => self.bucket.is_some(),
        }
    }

    /// Forgets resources of `class` after they were deleted.
    pub fn release(&mut self, class: ResourceClass) {
        match class {
            ResourceClass::Roles => self.roles = None,
            ResourceClass::SecurityGroups => self.security_groups.clear(),
            ResourceClass::Bucket => self.bucket = None,
        }
        self.touch();
    }

    /// Returns true once no bucket, role or group is left.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.bucket.is_none() && self.roles.is_none() && self.security_groups.is_empty()
    }

    /// Moves the record to `status`.
    pub fn set_status(&mut self, status: BundleStatus) {
        self.status = status;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
