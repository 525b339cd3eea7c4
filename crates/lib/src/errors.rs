use thiserror::Error;

/// The single terminal form of an external-API failure.
///
/// Transient, retryable errors never escape [`crate::retry::RetryPolicy`];
/// what callers see is this type, produced either when an error was
/// classified as non-retryable or when all attempts were exhausted. The
/// payload is the original provider error message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("API call failed: {0}")]
pub struct ApiFailure(pub String);
