//! Create action - provision resources and start a cluster.

use std::sync::Arc;

use anyhow::{Context, Result};
use emrctl_core::config::ClusterTemplate;
use emrctl_core::confirm::AutoConfirm;
use emrctl_core::naming::validate_prefix;
use emrctl_core::saga::CreateOutcome;

use crate::{ClusterArgs, Config, OutputFormat};

/// Execute the create action.
///
/// # Errors
///
/// Returns an error if `--cname` or `--cfile` is missing or invalid, or if
/// any provisioning step fails. Resources created before the failure are
/// left in place and recorded in the registry.
pub async fn execute(args: &ClusterArgs, config: &Config) -> Result<()> {
    let name = args
        .cname
        .as_deref()
        .context("A cluster name is required. Use --cname")?;
    let template_path = args
        .cfile
        .as_deref()
        .context("A cluster template is required. Use --cfile")?;

    validate_prefix(name).context("Invalid cluster name")?;
    let template = ClusterTemplate::from_file(template_path)
        .with_context(|| format!("Failed to load cluster template {}", template_path.display()))?;

    // Creation never asks anything.
    let saga = super::aws_saga(config, Arc::new(AutoConfirm(false))).await?;

    if matches!(config.format, OutputFormat::Text) {
        println!("Creating cluster resources for '{name}'...");
    }

    let outcome = saga
        .create(&template, name)
        .await
        .with_context(|| format!("Failed to create cluster '{name}'"))?;

    print_outcome(&outcome, config)
}

fn print_outcome(outcome: &CreateOutcome, config: &Config) -> Result<()> {
    match config.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(outcome)?);
        }
        OutputFormat::Text | OutputFormat::Table => {
            let bundle = &outcome.bundle;
            println!("Cluster created successfully!");
            println!();
            println!("  Cluster ID:   {}", outcome.cluster_id);
            println!("  Cluster Name: {}", bundle.prefix.cluster_name());
            println!("  Run ID:       {}", bundle.run_id);
            println!("  Status:       {}", bundle.status.as_label());
            if let Some(bucket) = &bundle.bucket {
                println!("  Bucket:       {bucket}");
            }
            if let Some(roles) = &bundle.roles {
                println!("  Roles:        {}, {}", roles.job_flow_role, roles.service_role);
            }
            if !bundle.security_groups.is_empty() {
                let groups: Vec<String> = bundle
                    .security_groups
                    .iter()
                    .map(|group| format!("{} ({})", group.name, group.id))
                    .collect();
                println!("  Groups:       {}", groups.join(", "));
            }
            println!("  Attempts:     {}", outcome.attempts);
        }
    }
    Ok(())
}
