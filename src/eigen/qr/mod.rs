use crate::eigen::{ensure_square, EigenDecomposition, EigenSolver};
use crate::error::{ProjectionError, Result};
use nalgebra::SymmetricEigen;
use ndarray::{Array1, ArrayView2};
use nshare::{IntoNalgebra, IntoNdarray2};

/// Symmetric eigen-solver backed by nalgebra (Householder tridiagonalisation
/// followed by implicit symmetric QR steps).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetricQr {
    /// Convergence threshold on off-diagonal entries.
    pub epsilon: f64,
    /// QR step budget per matrix dimension. The total budget for a `d x d`
    /// matrix is `iterations_per_dimension * d`.
    pub iterations_per_dimension: usize,
}

impl Default for SymmetricQr {
    fn default() -> Self {
        Self {
            epsilon: f64::EPSILON,
            iterations_per_dimension: 64,
        }
    }
}

impl SymmetricQr {
    pub fn new(epsilon: f64, iterations_per_dimension: usize) -> Self {
        Self {
            epsilon,
            iterations_per_dimension,
        }
    }

    fn budget(&self, d: usize) -> usize {
        // nalgebra treats a zero budget as unbounded
        self.iterations_per_dimension.saturating_mul(d).max(1)
    }
}

impl EigenSolver for SymmetricQr {
    fn decompose(&self, matrix: ArrayView2<f64>) -> Result<EigenDecomposition> {
        let d = ensure_square(matrix)?;
        if d == 0 {
            return Ok(EigenDecomposition {
                values: Array1::zeros(0),
                vectors: ndarray::Array2::zeros((0, 0)),
                iterations: None,
            });
        }

        let budget = self.budget(d);
        let owned = matrix.to_owned().into_nalgebra();
        let eigen = SymmetricEigen::try_new(owned, self.epsilon, budget).ok_or_else(|| {
            log::warn!("symmetric QR did not converge on a {d} x {d} matrix within {budget} steps");
            ProjectionError::DecompositionFailure {
                iterations: budget,
                residual: f64::NAN,
            }
        })?;

        Ok(EigenDecomposition {
            values: Array1::from(eigen.eigenvalues.as_slice().to_vec()),
            vectors: eigen.eigenvectors.into_ndarray2(),
            iterations: None,
        })
    }
}
