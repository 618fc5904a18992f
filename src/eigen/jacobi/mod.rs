use crate::eigen::{ensure_square, EigenDecomposition, EigenSolver};
use crate::error::{ProjectionError, Result};
use ndarray::{Array1, Array2, ArrayView2};

/// Cyclic Jacobi eigen-solver.
///
/// Each sweep applies one plane rotation per off-diagonal pair `(p, q)` in row-major
/// order. Iteration stops once the off-diagonal Frobenius norm drops below
/// `tolerance` times the norm of the input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jacobi {
    pub max_sweeps: usize,
    pub tolerance: f64,
}

impl Default for Jacobi {
    fn default() -> Self {
        Self {
            max_sweeps: 64,
            tolerance: 1e-12,
        }
    }
}

impl Jacobi {
    pub fn new(max_sweeps: usize, tolerance: f64) -> Self {
        Self {
            max_sweeps,
            tolerance,
        }
    }

    fn sweep(a: &mut Array2<f64>, v: &mut Array2<f64>) {
        let d = a.nrows();
        for p in 0..d {
            for q in (p + 1)..d {
                if a[[p, q]] != 0.0 {
                    Self::rotate(a, v, p, q);
                }
            }
        }
    }

    /// Applies `A <- J^T A J` and `V <- V J` for the rotation that zeroes `a[p, q]`.
    fn rotate(a: &mut Array2<f64>, v: &mut Array2<f64>, p: usize, q: usize) {
        let d = a.nrows();
        let (c, s) = Self::compute_rotation(a[[p, p]], a[[q, q]], a[[p, q]]);

        for k in 0..d {
            let akp = a[[k, p]];
            let akq = a[[k, q]];
            a[[k, p]] = c * akp - s * akq;
            a[[k, q]] = s * akp + c * akq;
        }
        for k in 0..d {
            let apk = a[[p, k]];
            let aqk = a[[q, k]];
            a[[p, k]] = c * apk - s * aqk;
            a[[q, k]] = s * apk + c * aqk;
        }
        a[[p, q]] = 0.0;
        a[[q, p]] = 0.0;

        for k in 0..d {
            let vkp = v[[k, p]];
            let vkq = v[[k, q]];
            v[[k, p]] = c * vkp - s * vkq;
            v[[k, q]] = s * vkp + c * vkq;
        }
    }

    fn compute_rotation(app: f64, aqq: f64, apq: f64) -> (f64, f64) {
        let zeta = (aqq - app) / (2.0 * apq);
        let t = if zeta >= 0.0 {
            1.0 / (zeta + zeta.hypot(1.0))
        } else {
            -1.0 / (-zeta + zeta.hypot(1.0))
        };
        let c = 1.0 / t.hypot(1.0);
        let s = t * c;
        (c, s)
    }
}

fn frobenius_norm(a: &Array2<f64>) -> f64 {
    a.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn off_diagonal_norm(a: &Array2<f64>) -> f64 {
    let mut sum = 0.0;
    for ((i, j), x) in a.indexed_iter() {
        if i != j {
            sum += x * x;
        }
    }
    sum.sqrt()
}

impl EigenSolver for Jacobi {
    fn decompose(&self, matrix: ArrayView2<f64>) -> Result<EigenDecomposition> {
        let d = ensure_square(matrix)?;
        let mut a = matrix.to_owned();
        let mut v = Array2::<f64>::eye(d);

        let threshold = self.tolerance * frobenius_norm(&a);
        let mut off = off_diagonal_norm(&a);
        let mut sweeps = 0;

        while off > threshold {
            if sweeps == self.max_sweeps {
                log::warn!(
                    "jacobi did not converge on a {d} x {d} matrix after {sweeps} sweeps (off-diagonal norm {off:e})"
                );
                return Err(ProjectionError::DecompositionFailure {
                    iterations: sweeps,
                    residual: off,
                });
            }
            Self::sweep(&mut a, &mut v);
            sweeps += 1;
            off = off_diagonal_norm(&a);
            log::trace!("jacobi sweep {sweeps}: off-diagonal norm {off:e}");
        }

        let values: Array1<f64> = a.diag().to_owned();
        Ok(EigenDecomposition {
            values,
            vectors: v,
            iterations: Some(sweeps),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_two_by_two() {
        let m = array![[2.0, 1.0], [1.0, 2.0]];
        let eig = Jacobi::default().decompose(m.view()).unwrap();

        // a single rotation diagonalises a 2x2 matrix
        assert_eq!(eig.iterations, Some(1));
        assert_abs_diff_eq!(eig.values[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eig.values[1], 3.0, epsilon = 1e-12);

        let h = 1.0 / 2.0_f64.sqrt();
        assert_abs_diff_eq!(eig.vectors[[0, 0]], h, epsilon = 1e-12);
        assert_abs_diff_eq!(eig.vectors[[1, 0]], -h, epsilon = 1e-12);
        assert_abs_diff_eq!(eig.vectors[[0, 1]], h, epsilon = 1e-12);
        assert_abs_diff_eq!(eig.vectors[[1, 1]], h, epsilon = 1e-12);
    }

    #[test]
    fn test_diagonal_needs_no_sweeps() {
        let m = array![[3.0, 0.0], [0.0, 1.0]];
        let eig = Jacobi::default().decompose(m.view()).unwrap();
        assert_eq!(eig.iterations, Some(0));
        assert_eq!(eig.values, array![3.0, 1.0]);
        assert_eq!(eig.vectors, Array2::<f64>::eye(2));
    }

    #[test]
    fn test_reconstruction_and_orthogonality() {
        let m = array![
            [4.0, -2.0, 1.0, 0.5],
            [-2.0, 5.0, 0.0, 1.5],
            [1.0, 0.0, 3.0, -1.0],
            [0.5, 1.5, -1.0, 2.0]
        ];
        let eig = Jacobi::default().decompose(m.view()).unwrap();

        let vtv = eig.vectors.t().dot(&eig.vectors);
        let reconstructed = eig
            .vectors
            .dot(&Array2::from_diag(&eig.values))
            .dot(&eig.vectors.t());
        for i in 0..4 {
            for j in 0..4 {
                let identity = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(vtv[[i, j]], identity, epsilon = 1e-12);
                assert_abs_diff_eq!(reconstructed[[i, j]], m[[i, j]], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_exhausted_budget_fails() {
        let m = array![[2.0, 1.0], [1.0, 2.0]];
        let err = Jacobi::new(0, 1e-12).decompose(m.view()).unwrap_err();
        match err {
            ProjectionError::DecompositionFailure {
                iterations,
                residual,
            } => {
                assert_eq!(iterations, 0);
                assert_abs_diff_eq!(residual, 2.0_f64.sqrt(), epsilon = 1e-12);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_matrix() {
        let m = Array2::<f64>::zeros((0, 0));
        let eig = Jacobi::default().decompose(m.view()).unwrap();
        assert_eq!(eig.values.len(), 0);
        assert_eq!(eig.iterations, Some(0));
    }
}
