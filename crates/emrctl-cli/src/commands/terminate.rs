//! Terminate action - stop a cluster and clean up what it was created with.

use std::sync::Arc;

use anyhow::{Context, Result};
use emrctl_core::confirm::{AutoConfirm, Confirm, StdinConfirm};
use emrctl_core::saga::{BundleSource, ClassOutcome, TeardownReport};
use owo_colors::OwoColorize;

use crate::{ClusterArgs, Config, OutputFormat};

/// Execute the terminate action.
///
/// # Errors
///
/// Returns an error if `--cluster-id` is missing, the cluster cannot be
/// resolved or terminated, or a confirmed deletion failed.
pub async fn execute(args: &ClusterArgs, config: &Config) -> Result<()> {
    let cluster_id = args
        .cluster_id
        .as_deref()
        .context("A cluster ID is required. Use --cluster-id")?;

    let confirm: Arc<dyn Confirm> = if config.assume_yes {
        Arc::new(AutoConfirm(true))
    } else {
        Arc::new(StdinConfirm)
    };
    let saga = super::aws_saga(config, confirm).await?;

    let report = saga
        .terminate(cluster_id, config.remove_all)
        .await
        .with_context(|| format!("Failed to terminate cluster {cluster_id}"))?;

    print_report(&report, config)?;

    if report.has_failures() {
        anyhow::bail!("Some resources of cluster {cluster_id} could not be deleted");
    }
    Ok(())
}

fn print_report(report: &TeardownReport, config: &Config) -> Result<()> {
    match config.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Text | OutputFormat::Table => {
            println!("Cluster {} terminated", report.cluster_id);
            if report.source == BundleSource::Recovered {
                println!(
                    "  (no registry record; resources recovered from prefix {})",
                    report.prefix
                );
            }
            println!();
            for entry in &report.classes {
                println!(
                    "  {:<16} {}",
                    entry.class.as_label(),
                    format_outcome(&entry.outcome)
                );
            }
            if !report.cost_reminders.is_empty() {
                println!();
                for reminder in &report.cost_reminders {
                    println!("{}", reminder.yellow());
                }
            }
        }
    }

    for warning in &report.warnings {
        eprintln!("{} {warning}", "warning:".yellow().bold());
    }
    Ok(())
}

fn format_outcome(outcome: &ClassOutcome) -> String {
    match outcome {
        ClassOutcome::Deleted => "deleted".green().to_string(),
        ClassOutcome::Kept => "kept".yellow().to_string(),
        ClassOutcome::Missing => "nothing to delete".dimmed().to_string(),
        ClassOutcome::Failed(reason) => format!("{} ({reason})", "failed".red()),
    }
}
