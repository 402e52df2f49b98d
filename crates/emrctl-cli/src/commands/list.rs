//! List action - show active clusters.

use std::sync::Arc;

use anyhow::{Context, Result};
use emrctl_core::confirm::AutoConfirm;
use emrctl_core::provider::ClusterSummary;

use super::format_state_colored;
use crate::{Config, OutputFormat};

/// Execute the list action.
///
/// # Errors
///
/// Returns an error if the cluster listing fails.
pub async fn execute(config: &Config) -> Result<()> {
    let saga = super::aws_saga(config, Arc::new(AutoConfirm(false))).await?;
    let clusters = saga.list().await.context("Failed to list clusters")?;
    print_clusters(&clusters, config)
}

fn print_clusters(clusters: &[ClusterSummary], config: &Config) -> Result<()> {
    match config.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(clusters)?);
        }
        OutputFormat::Text => {
            if clusters.is_empty() {
                println!("No active clusters found");
                return Ok(());
            }

            println!("Active clusters:");
            println!();
            for cluster in clusters {
                println!(
                    "  {} {} {}",
                    cluster.id,
                    cluster.name,
                    format_state_colored(&cluster.state)
                );
            }
        }
        OutputFormat::Table => {
            use tabled::{Table, Tabled};

            #[derive(Tabled)]
            struct ClusterRow {
                #[tabled(rename = "Cluster ID")]
                id: String,
                #[tabled(rename = "Name")]
                name: String,
                #[tabled(rename = "State")]
                state: String,
            }

            let rows: Vec<_> = clusters
                .iter()
                .map(|c| ClusterRow {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    state: c.state.clone(),
                })
                .collect();

            if rows.is_empty() {
                println!("No active clusters found");
            } else {
                println!("{}", Table::new(rows));
            }
        }
    }

    Ok(())
}
