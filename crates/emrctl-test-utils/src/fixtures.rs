//! Pre-built test fixtures for common test scenarios.
//!
//! Provides a ready-wired saga over [`TracingCloud`] and factory functions
//! for templates and provider errors.

use std::sync::Arc;

use emrctl_core::config::{ClusterTemplate, SagaConfig};
use emrctl_core::confirm::ScriptedConfirm;
use emrctl_core::error::{PROPAGATION_DELAY_CODE, ProviderError, Service};
use emrctl_core::registry::MemoryRegistry;
use emrctl_core::saga::ProvisioningSaga;

use crate::cloud::TracingCloud;

/// Test context with a traced cloud, an in-memory registry and scripted
/// confirmation answers.
pub struct TestContext {
    /// Traced cloud behind every collaborator.
    pub cloud: TracingCloud,
    /// Run registry.
    pub registry: Arc<MemoryRegistry>,
    /// Confirmation answers, consumed in order.
    pub confirm: Arc<ScriptedConfirm>,
    /// Saga timings.
    pub config: SagaConfig,
}

impl TestContext {
    /// Creates a context that answers "no" to every question.
    #[must_use]
    pub fn new() -> Self {
        Self::with_answers([])
    }

    /// Creates a context that replays `answers` to the confirmation prompts.
    #[must_use]
    pub fn with_answers(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            cloud: TracingCloud::new(),
            registry: Arc::new(MemoryRegistry::new()),
            confirm: Arc::new(ScriptedConfirm::new(answers)),
            config: SagaConfig::default(),
        }
    }

    /// Builds a saga over this context.
    ///
    /// Sagas built from the same context share cloud and registry state.
    #[must_use]
    pub fn saga(&self) -> ProvisioningSaga {
        ProvisioningSaga::new(
            self.cloud.collaborators(),
            self.registry.clone(),
            self.confirm.clone(),
            self.config.clone(),
        )
    }

    /// Builds a saga with a fresh answer script, sharing cloud and registry.
    #[must_use]
    pub fn saga_answering(&self, answers: impl IntoIterator<Item = bool>) -> ProvisioningSaga {
        ProvisioningSaga::new(
            self.cloud.collaborators(),
            self.registry.clone(),
            Arc::new(ScriptedConfirm::new(answers)),
            self.config.clone(),
        )
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Factory for cluster templates.
pub struct TemplateFactory;

impl TemplateFactory {
    /// Default template.
    #[must_use]
    pub fn standard() -> ClusterTemplate {
        ClusterTemplate::default()
    }

    /// Template for a single Spark node without the debugging step.
    #[must_use]
    pub fn single_node_spark() -> ClusterTemplate {
        ClusterTemplate {
            instance_count: 1,
            applications: vec!["Spark".to_string()],
            enable_debugging: false,
            ..ClusterTemplate::default()
        }
    }
}

/// Error the cluster service returns while an instance profile propagates.
#[must_use]
pub fn propagation_delay_error() -> ProviderError {
    ProviderError::new(
        Service::Cluster,
        "RunJobFlow",
        "Invalid InstanceProfile: instance profile is not ready",
    )
    .with_code(PROPAGATION_DELAY_CODE)
}

/// Error that aborts submission immediately.
#[must_use]
pub fn access_denied_error(service: Service, operation: &str) -> ProviderError {
    ProviderError::new(service, operation, "not authorized").with_code("AccessDenied")
}
