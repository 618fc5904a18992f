use ndarray::{ArrayView1, ArrayView2};
use num_traits::Float;

/// Dot product accumulated strictly in index order.
///
/// `ArrayBase::dot` may dispatch to a BLAS-style kernel with its own summation
/// order; projection and covariance go through this instead so results stay
/// bit-identical between runs and between the serial and rayon paths.
pub(crate) fn ordered_dot(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut acc = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        acc += x * y;
    }
    acc
}

pub(crate) fn max_abs(matrix: ArrayView2<f64>) -> f64 {
    matrix.iter().fold(0.0, |acc, &v| acc.max(v.abs()))
}

/// Closeness relative to a caller-supplied magnitude: `|a - b| <= tol * scale`.
pub(crate) fn approx_equal<T: Float>(a: T, b: T, tol: T, scale: T) -> bool {
    (a - b).abs() <= tol * scale.abs()
}
