//! Basic usage example: provision and tear down a cluster in memory.
//!
//! Run with: `cargo run --example basic_usage`

use std::sync::Arc;

use emrctl_core::error::Result;
use emrctl_core::prelude::*;

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal {
            message: format!("failed to start runtime: {e}"),
        })?;

    runtime.block_on(async {
        let cloud = Arc::new(MemoryCloud::new());
        let config = SagaConfig {
            propagation_wait: std::time::Duration::ZERO,
            ..SagaConfig::default()
        };
        let saga = ProvisioningSaga::new(
            Collaborators::shared(cloud.clone()),
            Arc::new(MemoryRegistry::new()),
            Arc::new(AutoConfirm(true)),
            config,
        );

        let outcome = saga.create(&ClusterTemplate::default(), "demo").await?;
        println!("Cluster: {}", outcome.cluster_id);
        println!("Run prefix: {}", outcome.bundle.prefix);

        for cluster in saga.list().await? {
            println!("Active: {} {} {}", cluster.id, cluster.name, cluster.state);
        }

        let report = saga.terminate(&outcome.cluster_id, true).await?;
        for entry in &report.classes {
            println!("{}: {:?}", entry.class.as_label(), entry.outcome);
        }
        Ok::<(), Error>(())
    })
}
