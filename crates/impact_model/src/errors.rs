//! Error types for impact model evaluation

use lca_sobol::SobolError;
use thiserror::Error;

/// Errors that can occur while evaluating an impact model
#[derive(Error, Debug)]
pub enum ImpactError {
    /// Parameter name not declared by the parameter collection
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// Two parameters declared under the same name
    #[error("Duplicate parameter: {0}")]
    DuplicateParameter(String),

    /// Two parameters transform into the same tree input
    #[error("Transform output {key} produced by both {first} and {second}")]
    TransformCollision { key: String, first: String, second: String },

    /// Batch-valued parameters supplied together with different lengths
    #[error("Batch length mismatch: {0:?}")]
    BatchLengthMismatch(Vec<(String, usize)>),

    /// Value incompatible with the parameter's declaration
    #[error("Invalid value for parameter {parameter}: {reason}")]
    InvalidValue { parameter: String, reason: String },

    /// Model was built without an impact tree
    #[error("Impact model has no tree")]
    MissingTree,

    /// Sample count requested for uncertainty or sensitivity analysis
    #[error("Sample count must be greater than zero, got {0}")]
    InvalidSampleCount(usize),

    /// Sample batch drawn with a scheme the caller cannot use
    #[error("Sample scheme mismatch: {0}")]
    SchemeMismatch(String),

    /// Tree node failed to compute its scores
    #[error("Failed to compute node {node}: {reason}")]
    Compute { node: String, reason: String },

    /// Sensitivity estimation failed
    #[error("Sensitivity analysis failed: {0}")]
    Sensitivity(#[from] SobolError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for impact model operations
pub type Result<T> = std::result::Result<T, ImpactError>;
