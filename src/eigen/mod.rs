//! # Symmetric Eigen-Decomposition
//!
//! Extracts the leading eigenpairs of a real symmetric matrix (covariance or Gram).
//! The solver itself sits behind [`EigenSolver`], so the ordering, sign and
//! degenerate-input rules in [`top_k_eigenpairs`] hold no matter which backend
//! produced the raw decomposition.
//!
//! ## Available solvers
//! - **SymmetricQr** ([`SymmetricQr`]): nalgebra's tridiagonalisation + implicit QR.
//!   The default; scales to embedding widths in the thousands.
//! - **Jacobi** ([`Jacobi`]): cyclic Jacobi rotations. Slower for large matrices but
//!   produces eigenvectors orthogonal to machine precision.

mod jacobi;
mod qr;

pub use jacobi::Jacobi;
pub use qr::SymmetricQr;

use crate::error::{ProjectionError, Result};
use crate::utils::{approx_equal, max_abs};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Eigenvalues closer than this, relative to the largest |eigenvalue|, keep the
/// solver's index order.
pub const TIE_TOLERANCE: f64 = 1e-10;

/// Raw output of a solver: all eigenpairs, in whatever order the solver produced them.
#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    /// Eigenvalues, aligned with the columns of `vectors`.
    pub values: Array1<f64>,
    /// Eigenvectors stored as columns.
    pub vectors: Array2<f64>,
    /// Sweeps spent reaching convergence, for solvers that report it.
    pub iterations: Option<usize>,
}

/// A single eigenvalue with its unit-length eigenvector.
#[derive(Debug, Clone, PartialEq)]
pub struct Eigenpair {
    pub value: f64,
    pub vector: Array1<f64>,
}

/// Trait for symmetric eigen-solvers.
///
/// Implementations must be reentrant (no shared scratch state) and deterministic:
/// identical input gives bit-identical output.
pub trait EigenSolver: Send + Sync {
    /// Full decomposition of a square symmetric matrix.
    ///
    /// Fails with [`ProjectionError::DecompositionFailure`] when the iteration budget
    /// runs out; a partially converged basis is never returned.
    fn decompose(&self, matrix: ArrayView2<f64>) -> Result<EigenDecomposition>;
}

/// Runtime selection between the built-in solvers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EigenMethod {
    SymmetricQr(SymmetricQr),
    Jacobi(Jacobi),
}

impl Default for EigenMethod {
    fn default() -> Self {
        Self::SymmetricQr(SymmetricQr::default())
    }
}

impl EigenSolver for EigenMethod {
    fn decompose(&self, matrix: ArrayView2<f64>) -> Result<EigenDecomposition> {
        match self {
            EigenMethod::SymmetricQr(solver) => solver.decompose(matrix),
            EigenMethod::Jacobi(solver) => solver.decompose(matrix),
        }
    }
}

/// Returns the `k` eigenpairs with the largest eigenvalues, ordered descending.
///
/// # Guarantees
/// - Eigenvectors are unit length and pairwise orthogonal.
/// - Eigenvalues equal within [`TIE_TOLERANCE`] keep the solver's original order.
/// - Each eigenvector is sign-normalised: its largest-magnitude component is positive.
/// - An all-zero matrix yields zero eigenvalues paired with the canonical basis,
///   without calling the solver.
///
/// # Errors
/// - [`ProjectionError::NonSquareMatrix`] if `matrix` is not square
/// - [`ProjectionError::InvalidDimensionRequest`] if `k` exceeds the matrix dimension
/// - [`ProjectionError::DecompositionFailure`] if the solver does not converge
pub fn top_k_eigenpairs<S>(solver: &S, matrix: ArrayView2<f64>, k: usize) -> Result<Vec<Eigenpair>>
where
    S: EigenSolver + ?Sized,
{
    let d = ensure_square(matrix)?;
    if k > d {
        return Err(ProjectionError::InvalidDimensionRequest {
            requested: i64::try_from(k).unwrap_or(i64::MAX),
            reason: "more eigenpairs requested than the matrix dimension",
        });
    }
    if k == 0 {
        return Ok(Vec::new());
    }

    if max_abs(matrix) == 0.0 {
        log::debug!("zero matrix ({d} x {d}), returning canonical basis");
        return Ok((0..k)
            .map(|i| {
                let mut vector = Array1::zeros(d);
                vector[i] = 1.0;
                Eigenpair { value: 0.0, vector }
            })
            .collect());
    }

    let decomposition = solver.decompose(matrix)?;
    if let Some(iterations) = decomposition.iterations {
        log::trace!("eigen-decomposition of {d} x {d} matrix converged after {iterations} sweeps");
    }

    let order = descending_order(decomposition.values.view(), TIE_TOLERANCE);
    Ok(order
        .into_iter()
        .take(k)
        .map(|idx| {
            let mut vector = decomposition.vectors.column(idx).to_owned();
            normalize_in_place(&mut vector);
            flip_sign(&mut vector);
            Eigenpair {
                value: decomposition.values[idx],
                vector,
            }
        })
        .collect())
}

pub(crate) fn ensure_square(matrix: ArrayView2<f64>) -> Result<usize> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(ProjectionError::NonSquareMatrix { rows, cols });
    }
    Ok(rows)
}

/// Indices sorted by descending value. Runs of values within `tol * max |λ|` of the
/// run's first element are re-sorted by index so near-ties stay in solver order.
fn descending_order(values: ArrayView1<f64>, tol: f64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    let scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));

    let mut start = 0;
    while start < order.len() {
        let anchor = values[order[start]];
        let mut end = start + 1;
        while end < order.len() && approx_equal(anchor, values[order[end]], tol, scale) {
            end += 1;
        }
        order[start..end].sort_unstable();
        start = end;
    }
    order
}

pub(crate) fn normalize_in_place(vector: &mut Array1<f64>) {
    let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        vector.mapv_inplace(|v| v / norm);
    }
}

/// Makes the largest-magnitude component positive (first one wins on ties).
pub(crate) fn flip_sign(vector: &mut Array1<f64>) {
    let mut pivot = 0.0_f64;
    for &v in vector.iter() {
        if v.abs() > pivot.abs() {
            pivot = v;
        }
    }
    if pivot < 0.0 {
        vector.mapv_inplace(|v| -v);
    }
}
