//! emrctl - provision and tear down EMR clusters.
//!
//! The main entry point for the `emrctl` binary.

use anyhow::Result;
use clap::Parser;

use emrctl_cli::Cli;
use emrctl_core::observability::init_logging;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format.into(), "info");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(emrctl_cli::run(&cli))
}
