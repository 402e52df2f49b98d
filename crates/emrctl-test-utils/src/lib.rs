//! Shared test utilities for emrctl.
//!
//! This crate provides:
//! - [`TracingCloud`]: in-memory cloud with call recording
//! - [`TestContext`]: a saga wired to the traced cloud, an in-memory registry
//!   and scripted confirmations
//! - Factory functions for templates and provider errors
//! - Custom assertion helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use emrctl_test_utils::{TestContext, TemplateFactory, assert_create_order};
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_example() {
//!     let ctx = TestContext::new();
//!     ctx.saga().create(&TemplateFactory::standard(), "etl").await.unwrap();
//!     assert_create_order(&ctx.cloud.operations());
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod assertions;
pub mod cloud;
pub mod fixtures;

pub use assertions::*;
pub use cloud::*;
pub use emrctl_core::confirm::ScriptedConfirm;
pub use fixtures::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("emrctl_core=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
