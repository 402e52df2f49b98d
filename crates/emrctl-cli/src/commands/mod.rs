//! CLI action implementations.

pub mod create;
pub mod list;
pub mod steps;
pub mod terminate;

use std::sync::Arc;

use anyhow::{Context, Result};
use emrctl_aws::AwsCloud;
use emrctl_core::confirm::Confirm;
use emrctl_core::config::SagaConfig;
use emrctl_core::registry::FileRegistry;
use emrctl_core::saga::ProvisioningSaga;
use owo_colors::OwoColorize;

use crate::Config;

/// Builds a saga against AWS and the configured registry file.
async fn aws_saga(config: &Config, confirm: Arc<dyn Confirm>) -> Result<ProvisioningSaga> {
    let saga_config = SagaConfig::from_env().context("invalid saga configuration")?;
    let cloud = AwsCloud::load(config.region.clone()).await;
    if cloud.region().is_none() {
        tracing::warn!("no AWS region configured; set --region or AWS_REGION");
    }
    let registry = Arc::new(FileRegistry::new(config.registry.clone()));
    Ok(ProvisioningSaga::new(
        cloud.collaborators(),
        registry,
        confirm,
        saga_config,
    ))
}

fn format_state_colored(state: &str) -> String {
    match state {
        "WAITING" | "RUNNING" => state.green().to_string(),
        "STARTING" | "BOOTSTRAPPING" => state.yellow().to_string(),
        "TERMINATING" => state.blue().to_string(),
        "TERMINATED_WITH_ERRORS" => state.red().to_string(),
        "TERMINATED" => state.dimmed().to_string(),
        _ => state.to_string(),
    }
}
