//! Conversion of SDK errors into [`ProviderError`].

use std::error::Error as StdError;
use std::fmt::Debug;

use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use emrctl_core::{ProviderError, Service};

/// Maps an SDK error onto the provider error the saga classifies.
///
/// The service error code is kept verbatim; the submission retry gate keys
/// off it.
pub(crate) fn provider_error<E, R>(
    service: Service,
    operation: &str,
    err: &SdkError<E, R>,
) -> ProviderError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
    R: Debug,
{
    let message = err
        .message()
        .map_or_else(|| error_chain(err), str::to_string);
    let error = ProviderError::new(service, operation, message);
    match err.code() {
        Some(code) => error.with_code(code),
        None => error,
    }
}

/// Joins an error and its sources, outermost first.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Error for a response that lacks a field the call depends on.
pub(crate) fn missing_field(service: Service, operation: &str, field: &str) -> ProviderError {
    ProviderError::new(service, operation, format!("response did not include {field}"))
}
