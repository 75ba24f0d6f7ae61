use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected at engine or filter construction, never raised per-frame.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Malformed solver input, rejected before any internal mutation.
    #[error("malformed cost matrix: {0}")]
    CostMatrix(String),

    /// Innovation covariance could not be inverted during a correction.
    #[error("innovation covariance is singular")]
    SingularInnovation,

    /// Propagated from a `Detector` implementation.
    #[error("detector failure: {0}")]
    Detection(String),
}
