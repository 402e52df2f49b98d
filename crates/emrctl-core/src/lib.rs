//! # emrctl-core
//!
//! Provisioning saga for managed big-data clusters.
//!
//! A provisioning run creates, in order, a bucket with fixed subfolders, two
//! IAM roles, two security groups and finally a cluster job flow. Teardown
//! terminates the cluster and, after confirmation, deletes each class of
//! resources the run created.
//!
//! - **Collaborators**: [`provider`] traits for storage, identity, network and
//!   cluster services; [`memory::MemoryCloud`] implements all four in memory
//! - **Saga**: [`saga::ProvisioningSaga`] drives create, list and terminate
//! - **Submission**: [`submission`] retries job-flow submission while
//!   instance profiles propagate
//! - **Registry**: [`registry`] persists each run's [`bundle::ResourceBundle`]
//!   so teardown needs only a cluster id
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use emrctl_core::prelude::*;
//!
//! # tokio_test_block_on(async {
//! let cloud = Arc::new(MemoryCloud::new());
//! let saga = ProvisioningSaga::new(
//!     Collaborators::shared(cloud),
//!     Arc::new(MemoryRegistry::new()),
//!     Arc::new(AutoConfirm(false)),
//!     SagaConfig {
//!         propagation_wait: std::time::Duration::ZERO,
//!         ..SagaConfig::default()
//!     },
//! );
//! let outcome = saga.create(&ClusterTemplate::default(), "myjob").await?;
//! assert!(outcome.cluster_id.starts_with("j-"));
//! # Ok::<(), Error>(())
//! # }).unwrap();
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bundle;
pub mod config;
pub mod confirm;
pub mod error;
pub mod id;
pub mod memory;
pub mod naming;
pub mod observability;
pub mod provider;
pub mod registry;
pub mod saga;
pub mod submission;

pub use error::{Error, ProviderError, Result, Service};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use emrctl_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bundle::{BundleStatus, ResourceBundle, ResourceClass, RoleNames};
    pub use crate::config::{ClusterTemplate, SagaConfig};
    pub use crate::confirm::{AutoConfirm, Confirm, ScriptedConfirm, StdinConfirm};
    pub use crate::error::{Error, ProviderError, Result, Service};
    pub use crate::id::RunId;
    pub use crate::memory::MemoryCloud;
    pub use crate::naming::RunPrefix;
    pub use crate::provider::{
        ClusterDescription, ClusterManager, ClusterSummary, IdentityProvisioner, JobFlowRequest,
        NetworkProvisioner, ProviderResult, Role, RolePair, SecurityGroup, SecurityGroups,
        StorageProvisioner,
    };
    pub use crate::registry::{BundleRegistry, FileRegistry, MemoryRegistry};
    pub use crate::saga::{
        BundleSource, ClassOutcome, Collaborators, CreateOutcome, ProvisioningSaga, TeardownReport,
    };
    pub use crate::submission::{Submission, SubmissionPolicy, SubmissionState};
}
