//! # emrctl-cli
//!
//! Command-line interface for provisioning EMR clusters.
//!
//! ## Actions
//!
//! - `emrctl --action create_cluster --cname <prefix> --cfile <template.json>`
//! - `emrctl --action list_clusters`
//! - `emrctl --action terminate_cluster --cluster-id <id> [--remove-all] [--yes]`
//! - `emrctl --action add_steps|delete_steps|execute_steps` (not supported)
//!
//! ## Configuration
//!
//! - `AWS_REGION` - region (default: the AWS configuration chain)
//! - `EMRCTL_REGISTRY` - registry file (default: `.emrctl/registry.json`)
//! - `EMRCTL_LOG_FORMAT` - `pretty` or `json` logs on stderr
//! - `EMRCTL_PROPAGATION_WAIT_SECS`, `EMRCTL_SUBMIT_RETRY_DELAY_SECS`,
//!   `EMRCTL_MAX_SUBMIT_ATTEMPTS` - saga timings

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
// CLI uses print! macros intentionally
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

pub mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, ValueEnum};
use emrctl_core::observability::LogFormat;

/// Default location of the run registry.
pub const DEFAULT_REGISTRY_PATH: &str = ".emrctl/registry.json";

/// emrctl - provision and tear down EMR clusters.
#[derive(Debug, Parser)]
#[command(name = "emrctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Action to perform.
    #[arg(short = 'a', long, alias = "Action", value_enum)]
    pub action: Option<Action>,

    /// Action parameters.
    #[command(flatten)]
    pub params: ClusterArgs,

    /// AWS region.
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Registry file recording what each run created.
    #[arg(long, env = "EMRCTL_REGISTRY", default_value = DEFAULT_REGISTRY_PATH)]
    pub registry: PathBuf,

    /// Output format.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Ask one combined question instead of one per resource class.
    #[arg(long)]
    pub remove_all: bool,

    /// Answer every confirmation with yes.
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Log format on stderr.
    #[arg(long, env = "EMRCTL_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogOutput,
}

impl Cli {
    /// Get the effective configuration.
    #[must_use]
    pub fn config(&self) -> Config {
        Config {
            region: self.region.clone(),
            registry: self.registry.clone(),
            format: self.format.clone(),
            remove_all: self.remove_all,
            assume_yes: self.yes,
        }
    }
}

/// Runs the action selected on the command line.
///
/// Without an action this prints `Action is invalid` and returns before any
/// AWS configuration is loaded.
///
/// # Errors
///
/// Returns the error of the selected action.
pub async fn run(cli: &Cli) -> Result<()> {
    let Some(action) = cli.action else {
        println!("Action is invalid");
        return Ok(());
    };
    let config = cli.config();

    match action {
        Action::CreateCluster => commands::create::execute(&cli.params, &config).await,
        Action::ListClusters => commands::list::execute(&config).await,
        Action::TerminateCluster => commands::terminate::execute(&cli.params, &config).await,
        Action::AddSteps | Action::DeleteSteps | Action::ExecuteSteps => {
            commands::steps::execute(action, &cli.params);
            Ok(())
        }
    }
}

/// Parameters shared by the actions.
#[derive(Debug, Clone, Default, Args)]
pub struct ClusterArgs {
    /// Name prefix for every resource of a new cluster.
    #[arg(short = 'c', long)]
    pub cname: Option<String>,

    /// Cluster template (JSON).
    #[arg(long)]
    pub cfile: Option<PathBuf>,

    /// Id of an existing cluster.
    #[arg(long = "cluster-id", alias = "cluster_id")]
    pub cluster_id: Option<String>,

    /// Steps file.
    #[arg(long)]
    pub sfile: Option<PathBuf>,
}

/// Actions understood by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Provision a bucket, roles and security groups, then start a cluster.
    #[value(name = "create_cluster")]
    CreateCluster,
    /// List active clusters.
    #[value(name = "list_clusters")]
    ListClusters,
    /// Terminate a cluster and optionally delete what it was created with.
    #[value(name = "terminate_cluster")]
    TerminateCluster,
    /// Add steps to a cluster.
    #[value(name = "add_steps")]
    AddSteps,
    /// Delete steps from a cluster.
    #[value(name = "delete_steps")]
    DeleteSteps,
    /// Execute the steps of a cluster.
    #[value(name = "execute_steps")]
    ExecuteSteps,
}

impl Action {
    /// Returns the action as typed on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateCluster => "create_cluster",
            Self::ListClusters => "list_clusters",
            Self::TerminateCluster => "terminate_cluster",
            Self::AddSteps => "add_steps",
            Self::DeleteSteps => "delete_steps",
            Self::ExecuteSteps => "execute_steps",
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// Table output.
    Table,
}

/// Log output on stderr.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogOutput {
    /// Compact human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl From<LogOutput> for LogFormat {
    fn from(output: LogOutput) -> Self {
        match output {
            LogOutput::Pretty => Self::Pretty,
            LogOutput::Json => Self::Json,
        }
    }
}

/// CLI configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// AWS region override.
    pub region: Option<String>,
    /// Registry file.
    pub registry: PathBuf,
    /// Output format.
    pub format: OutputFormat,
    /// Combined teardown question.
    pub remove_all: bool,
    /// Skip confirmations.
    pub assume_yes: bool,
}
