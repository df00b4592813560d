//! Error types for the Sobol sensitivity core

use thiserror::Error;

/// Errors raised while building designs or estimating indices
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SobolError {
    /// A design or analysis was requested with zero base samples
    #[error("Sample count must be greater than zero")]
    EmptySample,

    /// Problem definition is unusable (no variables, bad bounds, ...)
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// Output vector does not follow the Saltelli layout
    #[error("Output length {actual} does not match the {expected} rows of the design")]
    LayoutMismatch { expected: usize, actual: usize },

    /// Model output at a design row is NaN or infinite
    #[error("Model output at row {row} is not finite: {value}")]
    NonFiniteOutput { row: usize, value: f64 },

    /// Analysis option out of range
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

/// Result type for Sobol operations
pub type Result<T> = std::result::Result<T, SobolError>;
