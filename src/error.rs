// src/error.rs

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, FactorizationError>;

/// Errors raised while factoring a matrix or using a factorization.
///
/// Every variant aborts the operation at the point of detection; no partial
/// factors are ever returned alongside an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FactorizationError {
    /// Partial pivoting found no nonzero candidate in column `step`.
    #[error("Matrix is singular and cannot be decomposed (no nonzero pivot in column {step}).")]
    Singular { step: usize },

    /// The diagonal entry at `step` was zero and pivoting was disabled.
    #[error("Zero pivot encountered at step {step}; matrix is singular or requires pivoting.")]
    ZeroPivot { step: usize },

    /// The selected native backend could not be loaded or failed while running.
    #[error("Native backend '{backend}' is unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    #[error("Input matrix has zero rows; a factorization needs n >= 1.")]
    EmptyMatrix,

    #[error("Input matrix must be square, got {rows}x{cols}.")]
    NotSquare { rows: usize, cols: usize },

    #[error("Dimension mismatch: expected {expected}, got {got}.")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Invalid permutation: {0}")]
    InvalidPermutation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FactorizationError {
    pub(crate) fn backend_unavailable(backend: &str, reason: impl Into<String>) -> Self {
        FactorizationError::BackendUnavailable {
            backend: backend.to_string(),
            reason: reason.into(),
        }
    }
}
