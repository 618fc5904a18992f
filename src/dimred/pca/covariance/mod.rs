//! Covariance and Gram matrices of centered data.
//!
//! Both builders compute only the upper triangle, one entry at a time with a
//! fixed `0..n` (or `0..d`) summation order, then mirror it. The result is exactly
//! symmetric and identical between serial and parallel runs.

use crate::utils::ordered_dot;
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

/// Sample covariance `C^T C / max(n - 1, 1)` of a centered `n x d` matrix.
///
/// With `n <= 1` there is no variance to capture and the result is the zero matrix.
pub fn covariance(centered: ArrayView2<f64>) -> Array2<f64> {
    covariance_with(centered, false)
}

/// Gram matrix `C C^T / max(n - 1, 1)` of a centered `n x d` matrix.
///
/// Shares its non-zero eigenvalues with [`covariance`] and is the cheaper matrix to
/// decompose when there are fewer samples than features.
pub fn gram(centered: ArrayView2<f64>) -> Array2<f64> {
    gram_with(centered, false)
}

pub(crate) fn covariance_with(centered: ArrayView2<f64>, parallel: bool) -> Array2<f64> {
    let denom = bessel_denominator(centered.nrows());
    symmetric_from_upper(
        centered.ncols(),
        |i, j| ordered_dot(centered.column(i), centered.column(j)) / denom,
        parallel,
    )
}

pub(crate) fn gram_with(centered: ArrayView2<f64>, parallel: bool) -> Array2<f64> {
    let denom = bessel_denominator(centered.nrows());
    symmetric_from_upper(
        centered.nrows(),
        |i, j| ordered_dot(centered.row(i), centered.row(j)) / denom,
        parallel,
    )
}

/// Trace of the covariance matrix, computed without building it.
pub fn total_variance(centered: ArrayView2<f64>) -> f64 {
    let denom = bessel_denominator(centered.nrows());
    let mut sum = 0.0;
    for &value in centered.iter() {
        sum += value * value;
    }
    sum / denom
}

pub(crate) fn bessel_denominator(n: usize) -> f64 {
    n.saturating_sub(1).max(1) as f64
}

fn symmetric_from_upper<F>(size: usize, entry: F, parallel: bool) -> Array2<f64>
where
    F: Fn(usize, usize) -> f64 + Sync,
{
    let upper_row = |i: usize| -> Vec<f64> { (i..size).map(|j| entry(i, j)).collect() };
    let rows: Vec<Vec<f64>> = if parallel {
        (0..size).into_par_iter().map(upper_row).collect()
    } else {
        (0..size).map(upper_row).collect()
    };

    let mut out = Array2::zeros((size, size));
    for (i, row) in rows.into_iter().enumerate() {
        for (offset, value) in row.into_iter().enumerate() {
            let j = i + offset;
            out[[i, j]] = value;
            out[[j, i]] = value;
        }
    }
    out
}
