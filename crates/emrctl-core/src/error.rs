//! Error types and result aliases for emrctl.
//!
//! Errors fall into three groups: user-input errors that are rejected before
//! any provider call, provider errors surfaced by a collaborator, and local
//! failures (registry, configuration).

use std::fmt;

/// The result type used throughout emrctl.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in emrctl operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The user-supplied name prefix cannot be used to derive resource names.
    #[error("invalid name prefix '{prefix}': {reason}")]
    InvalidPrefix {
        /// The rejected prefix.
        prefix: String,
        /// Why the prefix was rejected.
        reason: String,
    },

    /// A cluster name does not have the shape the create path produces.
    #[error("cluster name '{name}' was not created by emrctl")]
    UnrecognizedClusterName {
        /// The cluster name as reported by the provider.
        name: String,
    },

    /// A cloud provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The local bundle registry could not be read or written.
    #[error("registry error: {message}")]
    Registry {
        /// Description of the registry failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration was missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new invalid-prefix error.
    #[must_use]
    pub fn invalid_prefix(prefix: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPrefix {
            prefix: prefix.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new registry error with the given message.
    #[must_use]
    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new registry error with a source cause.
    #[must_use]
    pub fn registry_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Registry {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if this error was caused by user input rather than by a
    /// provider or local failure.
    #[must_use]
    pub const fn is_user_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidPrefix { .. } | Self::UnrecognizedClusterName { .. }
        )
    }

    /// Returns the provider error, if this error came from a collaborator.
    #[must_use]
    pub const fn as_provider(&self) -> Option<&ProviderError> {
        match self {
            Self::Provider(err) => Some(err),
            _ => None,
        }
    }
}

/// Cloud service that reported a [`ProviderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// Object storage (S3).
    Storage,
    /// Identity and access management (IAM).
    Identity,
    /// Networking (EC2 security groups).
    Network,
    /// Managed cluster service (EMR).
    Cluster,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage => write!(f, "s3"),
            Self::Identity => write!(f, "iam"),
            Self::Network => write!(f, "ec2"),
            Self::Cluster => write!(f, "emr"),
        }
    }
}

/// Error code the cluster service returns while a freshly created instance
/// profile is not yet visible to it.
pub const PROPAGATION_DELAY_CODE: &str = "ValidationException";

/// A failed call to a cloud provider API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{service} {operation} failed{}: {message}", code_suffix(.code.as_deref()))]
pub struct ProviderError {
    /// Service that rejected the call.
    pub service: Service,
    /// Provider operation name, e.g. `RunJobFlow`.
    pub operation: String,
    /// Provider error code, when the service returned one.
    pub code: Option<String>,
    /// Human-readable detail from the provider.
    pub message: String,
}

fn code_suffix(code: Option<&str>) -> String {
    code.map(|c| format!(" ({c})")).unwrap_or_default()
}

impl ProviderError {
    /// Creates a provider error without an error code.
    #[must_use]
    pub fn new(service: Service, operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service,
            operation: operation.into(),
            code: None,
            message: message.into(),
        }
    }

    /// Attaches a provider error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Returns true if the error is the cluster service's validation failure
    /// raised while IAM roles and instance profiles are still propagating.
    #[must_use]
    pub fn is_propagation_delay(&self) -> bool {
        self.service == Service::Cluster && self.code.as_deref() == Some(PROPAGATION_DELAY_CODE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display_includes_code() {
        let err = ProviderError::new(Service::Cluster, "RunJobFlow", "role not ready")
            .with_code("ValidationException");
        assert_eq!(
            err.to_string(),
            "emr RunJobFlow failed (ValidationException): role not ready"
        );
    }

    #[test]
    fn provider_error_display_without_code() {
        let err = ProviderError::new(Service::Storage, "CreateBucket", "timeout");
        assert_eq!(err.to_string(), "s3 CreateBucket failed: timeout");
    }

    #[test]
    fn propagation_delay_requires_cluster_service_and_code() {
        let transient = ProviderError::new(Service::Cluster, "RunJobFlow", "x")
            .with_code(PROPAGATION_DELAY_CODE);
        assert!(transient.is_propagation_delay());

        let other_code =
            ProviderError::new(Service::Cluster, "RunJobFlow", "x").with_code("AccessDenied");
        assert!(!other_code.is_propagation_delay());

        let other_service = ProviderError::new(Service::Identity, "CreateRole", "x")
            .with_code(PROPAGATION_DELAY_CODE);
        assert!(!other_service.is_propagation_delay());
    }

    #[test]
    fn user_input_classification() {
        assert!(Error::invalid_prefix("cluster-x", "reserved").is_user_input());
        assert!(!Error::registry("disk full").is_user_input());
        let provider: Error = ProviderError::new(Service::Network, "CreateSecurityGroup", "x").into();
        assert!(!provider.is_user_input());
        assert!(provider.as_provider().is_some());
    }
}
