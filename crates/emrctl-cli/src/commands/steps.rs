//! Step actions - accepted on the command line but not implemented.

use crate::{Action, ClusterArgs};

/// Execute a step action.
///
/// Prints a notice and does nothing else.
pub fn execute(action: Action, args: &ClusterArgs) {
    let target = args
        .cluster_id
        .as_deref()
        .map(|id| format!(" for cluster {id}"))
        .unwrap_or_default();
    println!("Action '{}'{target} is not supported yet", action.as_str());
    tracing::info!(action = action.as_str(), "step action requested; nothing to do");
}
