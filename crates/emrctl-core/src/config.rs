//! Saga timings and the cluster template file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::submission::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, SubmissionPolicy};

/// Folders created in every run's bucket.
pub const DEFAULT_FOLDERS: [&str; 5] = ["scripts", "logs", "steps", "output", "input"];

/// Default wait for IAM propagation before the first submission.
pub const DEFAULT_PROPAGATION_WAIT: Duration = Duration::from_secs(10);

/// Timings and constants used by the provisioning saga.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaConfig {
    /// Unconditional wait between creating roles and submitting the job flow.
    pub propagation_wait: Duration,
    /// Retry limits for job-flow submission.
    pub submission: SubmissionPolicy,
    /// Folders created in the bucket.
    pub folders: Vec<String>,
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            propagation_wait: DEFAULT_PROPAGATION_WAIT,
            submission: SubmissionPolicy {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                retry_delay: DEFAULT_RETRY_DELAY,
            },
            folders: DEFAULT_FOLDERS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl SagaConfig {
    /// Loads overrides from environment variables.
    ///
    /// - `EMRCTL_PROPAGATION_WAIT_SECS` (default: 10)
    /// - `EMRCTL_SUBMIT_RETRY_DELAY_SECS` (default: 10)
    /// - `EMRCTL_MAX_SUBMIT_ATTEMPTS` (1-20, default: 5)
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`SagaConfig::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(secs) = parse_u64(&lookup, "EMRCTL_PROPAGATION_WAIT_SECS")? {
            config.propagation_wait = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_u64(&lookup, "EMRCTL_SUBMIT_RETRY_DELAY_SECS")? {
            config.submission.retry_delay = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_u64(&lookup, "EMRCTL_MAX_SUBMIT_ATTEMPTS")? {
            if !(1..=20).contains(&attempts) {
                return Err(Error::Configuration(format!(
                    "EMRCTL_MAX_SUBMIT_ATTEMPTS must be between 1 and 20 (got {attempts})"
                )));
            }
            config.submission.max_attempts = u32::try_from(attempts).unwrap_or(DEFAULT_MAX_ATTEMPTS);
        }

        Ok(config)
    }
}

fn lookup_string(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<u64>> {
    let Some(v) = lookup_string(lookup, name) else {
        return Ok(None);
    };
    v.parse::<u64>()
        .map(Some)
        .map_err(|e| Error::Configuration(format!("{name} must be a u64: {e}")))
}

/// Shape of the cluster a run submits, read from the template file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterTemplate {
    /// Release label, e.g. `emr-6.15.0`.
    pub release_label: String,
    /// Instance type for every node.
    pub instance_type: String,
    /// Total number of instances.
    pub instance_count: i32,
    /// Applications to install.
    pub applications: Vec<String>,
    /// Keep the cluster alive once it has no steps.
    pub keep_alive: bool,
    /// Add the debugging step.
    pub enable_debugging: bool,
    /// Optional SSH key pair.
    pub ec2_key_name: Option<String>,
}

impl Default for ClusterTemplate {
    fn default() -> Self {
        Self {
            release_label: "emr-6.15.0".to_string(),
            instance_type: "m5.xlarge".to_string(),
            instance_count: 3,
            applications: vec!["Hadoop".into(), "Hive".into(), "Spark".into()],
            keep_alive: true,
            enable_debugging: true,
            ec2_key_name: None,
        }
    }
}

impl ClusterTemplate {
    /// Reads a template from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// describes an unusable cluster.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("failed to read cluster template {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
            .map_err(|e| Error::Configuration(format!("{}: {e}", path.display())))
    }

    /// Parses a template from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the template is invalid.
    pub fn from_json(raw: &str) -> Result<Self> {
        let template: Self = serde_json::from_str(raw)
            .map_err(|e| Error::Configuration(format!("invalid cluster template: {e}")))?;
        template.validate()?;
        Ok(template)
    }

    /// Checks the template describes a cluster that can be submitted.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.release_label.trim().is_empty() {
            return Err(Error::Configuration("release_label cannot be empty".into()));
        }
        if self.instance_type.trim().is_empty() {
            return Err(Error::Configuration("instance_type cannot be empty".into()));
        }
        if self.instance_count < 1 {
            return Err(Error::Configuration(format!(
                "instance_count must be at least 1 (got {})",
                self.instance_count
            )));
        }
        Ok(())
    }
}
