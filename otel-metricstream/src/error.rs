use std::result;

use thiserror::Error;

/// A specialized `Result` type for metric operations.
pub type MetricResult<T> = result::Result<T, MetricError>;

/// Errors returned by the configuration surface of this crate.
///
/// The hot path (`record`/`collect`) never returns errors; misconfiguration is
/// rejected when components are constructed.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MetricError {
    /// Invalid configuration, such as non-ascending histogram bucket boundaries.
    #[error("Config error {0}")]
    Config(String),
    /// Other errors not covered by specific cases.
    #[error("Metrics error: {0}")]
    Other(String),
}
