use thiserror::Error;

/// Errors produced while projecting an embedding set.
///
/// Every variant is a deterministic function of the input, so retrying with the
/// same vectors reproduces it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// A vector (or matrix row/component) does not have the expected length.
    #[error("shape mismatch at index {index}: expected length {expected}, found {found}")]
    ShapeMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid dimension request {requested}: {reason}")]
    InvalidDimensionRequest { requested: i64, reason: &'static str },

    /// The eigen-solver exhausted its iteration budget. `residual` is the
    /// off-diagonal norm left when it gave up (NaN when the solver does not
    /// report one).
    #[error("eigen-decomposition did not converge after {iterations} iterations (residual {residual:e})")]
    DecompositionFailure { iterations: usize, residual: f64 },

    #[error("non-finite value in vector {index} at component {component}")]
    NonFiniteValue { index: usize, component: usize },

    #[error("expected a square matrix, got {rows} x {cols}")]
    NonSquareMatrix { rows: usize, cols: usize },
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
