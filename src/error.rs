//! Error types for the aqi-forecast pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while preprocessing, training, or serving.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient rows for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Every training column is constant, scaling is undefined.
    #[error("all feature columns have zero variance")]
    ZeroVariance,

    /// A declared feature does not exist in the table.
    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    /// The caller's feature list differs from the model's schema.
    #[error("feature mismatch: model expects {expected:?}, got {got:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// No artifact with the given family/version.
    #[error("artifact not found: {family} v{version}")]
    ArtifactNotFound { family: String, version: u32 },

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),

    /// Filesystem error from the artifact store.
    #[error("io error: {0}")]
    Io(String),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
