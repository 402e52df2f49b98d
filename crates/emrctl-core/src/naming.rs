//! Resource naming for provisioning runs.
//!
//! Every resource a run creates is named from one [`RunPrefix`]:
//!
//! ```text
//! user prefix      myjob
//! run prefix       myjob-1718000000000000000
//! bucket           myjob-1718000000000000000
//! job-flow role    myjob-1718000000000000000-ec2-role
//! service role     myjob-1718000000000000000-service-role
//! security groups  myjob-1718000000000000000-manager-sg / -worker-sg
//! cluster          cluster-myjob-1718000000000000000
//! ```
//!
//! The user prefix may not contain [`RESERVED_MARKER`], so the cluster name
//! can always be mapped back to its run prefix.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Substring a user prefix may never contain.
pub const RESERVED_MARKER: &str = "cluster";

/// Literal the create path puts in front of the run prefix to name the cluster.
pub const CLUSTER_NAME_MARKER: &str = "cluster-";

/// Longest accepted user prefix.
///
/// The run prefix appends `-` and a 19-digit timestamp; the longest derived
/// name (`-service-role`) must stay within IAM's 64 character limit.
pub const MAX_PREFIX_LEN: usize = 30;

const JOB_FLOW_ROLE_SUFFIX: &str = "-ec2-role";
const SERVICE_ROLE_SUFFIX: &str = "-service-role";
const MANAGER_GROUP_SUFFIX: &str = "-manager-sg";
const WORKER_GROUP_SUFFIX: &str = "-worker-sg";

static LAST_TIMESTAMP_NS: AtomicU64 = AtomicU64::new(0);

/// Validates a user-supplied name prefix.
///
/// # Errors
///
/// Returns [`Error::InvalidPrefix`] if the prefix contains the reserved
/// marker, is empty or too long, or contains characters that are not legal in
/// bucket and role names.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.to_ascii_lowercase().contains(RESERVED_MARKER) {
        return Err(Error::invalid_prefix(
            prefix,
            format!("the name cannot contain the word '{RESERVED_MARKER}'"),
        ));
    }
    if prefix.is_empty() {
        return Err(Error::invalid_prefix(prefix, "the name cannot be empty"));
    }
    if prefix.len() > MAX_PREFIX_LEN {
        return Err(Error::invalid_prefix(
            prefix,
            format!("the name must be at most {MAX_PREFIX_LEN} characters"),
        ));
    }
    if let Some(c) = prefix
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(Error::invalid_prefix(
            prefix,
            format!("character '{c}' is not allowed (use a-z, 0-9 and '-')"),
        ));
    }
    if prefix.starts_with('-') || prefix.ends_with('-') {
        return Err(Error::invalid_prefix(
            prefix,
            "the name cannot start or end with '-'",
        ));
    }
    Ok(())
}

/// Returns a nanosecond wall-clock timestamp that is strictly greater than
/// every value previously returned in this process.
#[must_use]
pub fn monotonic_timestamp_ns() -> u64 {
    let now = chrono::Utc::now()
        .timestamp_nanos_opt()
        .and_then(|ns| u64::try_from(ns).ok())
        .unwrap_or(0);

    let mut last = LAST_TIMESTAMP_NS.load(Ordering::Relaxed);
    loop {
        let next = now.max(last.saturating_add(1));
        match LAST_TIMESTAMP_NS.compare_exchange_weak(
            last,
            next,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}

/// Name of the primary-node security group for a run prefix.
#[must_use]
pub fn manager_group_name(prefix: &str) -> String {
    format!("{prefix}{MANAGER_GROUP_SUFFIX}")
}

/// Name of the worker-node security group for a run prefix.
#[must_use]
pub fn worker_group_name(prefix: &str) -> String {
    format!("{prefix}{WORKER_GROUP_SUFFIX}")
}

/// Run-unique prefix every resource name of a provisioning run derives from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunPrefix(String);

impl RunPrefix {
    /// Validates `prefix` and appends a fresh monotonic timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPrefix`] if the prefix fails validation.
    pub fn derive(prefix: &str) -> Result<Self> {
        Self::derive_at(prefix, monotonic_timestamp_ns())
    }

    /// Validates `prefix` and appends the given timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPrefix`] if the prefix fails validation.
    pub fn derive_at(prefix: &str, timestamp_ns: u64) -> Result<Self> {
        validate_prefix(prefix)?;
        Ok(Self(format!("{prefix}-{timestamp_ns}")))
    }

    /// Recovers the run prefix from a cluster name produced by
    /// [`RunPrefix::cluster_name`].
    ///
    /// The marker must appear exactly once, at the start of the name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrecognizedClusterName`] for any other shape.
    pub fn from_cluster_name(name: &str) -> Result<Self> {
        let unrecognized = || Error::UnrecognizedClusterName {
            name: name.to_string(),
        };
        let rest = name.strip_prefix(CLUSTER_NAME_MARKER).ok_or_else(unrecognized)?;
        if rest.is_empty() || rest.contains(RESERVED_MARKER) {
            return Err(unrecognized());
        }
        Ok(Self(rest.to_string()))
    }

    /// Returns the run prefix as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bucket name for this run.
    #[must_use]
    pub fn bucket(&self) -> String {
        self.0.clone()
    }

    /// Name of the role cluster instances assume (and of its instance profile).
    #[must_use]
    pub fn job_flow_role(&self) -> String {
        format!("{}{JOB_FLOW_ROLE_SUFFIX}", self.0)
    }

    /// Name of the role the cluster service assumes.
    #[must_use]
    pub fn service_role(&self) -> String {
        format!("{}{SERVICE_ROLE_SUFFIX}", self.0)
    }

    /// Name of the security group for the primary node.
    #[must_use]
    pub fn manager_group(&self) -> String {
        manager_group_name(&self.0)
    }

    /// Name of the security group for core and task nodes.
    #[must_use]
    pub fn worker_group(&self) -> String {
        worker_group_name(&self.0)
    }

    /// Cluster (job flow) name.
    #[must_use]
    pub fn cluster_name(&self) -> String {
        format!("{CLUSTER_NAME_MARKER}{}", self.0)
    }

    /// Location the cluster writes its logs to.
    #[must_use]
    pub fn log_uri(&self) -> String {
        format!("s3://{}/logs", self.0)
    }
}

impl fmt::Display for RunPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
