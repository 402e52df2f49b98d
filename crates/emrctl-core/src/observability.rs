//! Logging setup and span helpers.
//!
//! Every saga operation runs inside a `provisioning` span carrying the
//! operation name and the run prefix, so all provider calls of one run can
//! be correlated in the logs.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs (for automation).
    Json,
    /// Compact human-readable logs.
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at startup. Subsequent calls are no-ops. Logs go to stderr so
/// command output on stdout stays machine-readable.
///
/// `RUST_LOG` controls levels; `default_level` applies when it is unset.
///
/// # Example
///
/// ```rust
/// use emrctl_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty, "info");
/// ```
pub fn init_logging(format: LogFormat, default_level: &str) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json().with_writer(std::io::stderr))
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                    .init();
            }
        }
    });
}

/// Creates a span for one saga operation.
///
/// # Example
///
/// ```rust
/// use emrctl_core::observability::provisioning_span;
///
/// let span = provisioning_span("create", "myjob-1718000000000000000");
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn provisioning_span(operation: &str, run: &str) -> Span {
    tracing::info_span!("provisioning", op = operation, run = run)
}
