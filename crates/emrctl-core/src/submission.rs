//! Bounded retry of job-flow submission.
//!
//! Freshly created instance profiles take a while to become visible to the
//! cluster service, which rejects the job flow with a validation error in the
//! meantime. Submission is modelled as a small state machine so the attempt
//! bound and the error-class gate can be checked independently.
//!
//! ```text
//!              ┌────────────────── wait elapsed ───────────────────┐
//!              ▼                                                   │
//!        ┌────────────┐  propagation delay,    ┌───────────┐      │
//! start ►│ ATTEMPTING │─ attempts remaining ──►│ RETRY_WAIT │──────┘
//!        └────────────┘                        └───────────┘
//!           │      │
//!     ok    │      │ other error, or last attempt
//!           ▼      ▼
//!   ┌───────────┐ ┌────────┐
//!   │ SUCCEEDED │ │ FAILED │
//!   └───────────┘ └────────┘
//! ```

use std::time::Duration;

use crate::error::ProviderError;
use crate::provider::{ClusterManager, JobFlowRequest, ProviderResult};

/// Default number of submission attempts, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default wait between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Limits applied to job-flow submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionPolicy {
    /// Total attempts allowed, including the first one.
    pub max_attempts: u32,
    /// Wait after each retryable failure.
    pub retry_delay: Duration,
}

impl Default for SubmissionPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Submission state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    /// About to make attempt number `attempt` (1-based).
    Attempting {
        /// Attempt about to be made.
        attempt: u32,
    },
    /// Attempt `attempt` hit a propagation delay; waiting before the next one.
    RetryWait {
        /// Attempt that failed.
        attempt: u32,
        /// How long to wait.
        delay: Duration,
        /// The retryable error.
        error: ProviderError,
    },
    /// The job flow was accepted.
    Succeeded {
        /// New cluster id.
        cluster_id: String,
        /// Attempts used.
        attempts: u32,
    },
    /// Submission gave up.
    Failed {
        /// Last error seen.
        error: ProviderError,
        /// Attempts used.
        attempts: u32,
    },
}

impl SubmissionState {
    /// Initial state.
    #[must_use]
    pub const fn start() -> Self {
        Self::Attempting { attempt: 1 }
    }

    /// Returns true for `Succeeded` and `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }

    /// Returns a lowercase label suitable for logs.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::Attempting { .. } => "attempting",
            Self::RetryWait { .. } => "retry_wait",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }

    /// Applies the outcome of the current attempt.
    ///
    /// Only meaningful in `Attempting`; any other state is returned unchanged.
    #[must_use]
    pub fn on_outcome(self, policy: &SubmissionPolicy, outcome: ProviderResult<String>) -> Self {
        let Self::Attempting { attempt } = self else {
            return self;
        };

        match outcome {
            Ok(cluster_id) => Self::Succeeded {
                cluster_id,
                attempts: attempt,
            },
            Err(error) if error.is_propagation_delay() && attempt < policy.max_attempts => {
                Self::RetryWait {
                    attempt,
                    delay: policy.retry_delay,
                    error,
                }
            }
            Err(error) => Self::Failed {
                error,
                attempts: attempt,
            },
        }
    }

    /// Leaves `RetryWait` for the next attempt.
    ///
    /// Any other state is returned unchanged.
    #[must_use]
    pub fn on_wait_elapsed(self) -> Self {
        match self {
            Self::RetryWait { attempt, .. } => Self::Attempting {
                attempt: attempt + 1,
            },
            other => other,
        }
    }
}

/// An accepted job flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// New cluster id.
    pub cluster_id: String,
    /// Attempts used, including the successful one.
    pub attempts: u32,
}

/// Runs the submission state machine against a cluster manager.
///
/// # Errors
///
/// Returns the last provider error once the machine reaches `Failed`.
pub async fn submit_job_flow(
    clusters: &dyn ClusterManager,
    request: &JobFlowRequest,
    policy: &SubmissionPolicy,
) -> Result<Submission, ProviderError> {
    let mut state = SubmissionState::start();
    loop {
        state = match state {
            SubmissionState::Attempting { attempt } => {
                tracing::debug!(attempt, cluster = %request.name, "submitting job flow");
                let outcome = clusters.run_job_flow(request).await;
                SubmissionState::Attempting { attempt }.on_outcome(policy, outcome)
            }
            wait @ SubmissionState::RetryWait { .. } => {
                if let SubmissionState::RetryWait {
                    attempt,
                    delay,
                    error,
                } = &wait
                {
                    tracing::info!(
                        attempt = *attempt,
                        delay_secs = delay.as_secs(),
                        error = %error,
                        "Instance profile is not ready, let's give it more time..."
                    );
                    tokio::time::sleep(*delay).await;
                }
                wait.on_wait_elapsed()
            }
            SubmissionState::Succeeded {
                cluster_id,
                attempts,
            } => {
                return Ok(Submission {
                    cluster_id,
                    attempts,
                });
            }
            SubmissionState::Failed { error, attempts } => {
                tracing::warn!(attempts, error = %error, "job flow submission failed");
                return Err(error);
            }
        };
    }
}
