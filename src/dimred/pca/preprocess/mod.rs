use crate::error::{ProjectionError, Result};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;

/// Mean-centered embedding matrix together with the mean that was removed.
#[derive(Debug, Clone, PartialEq)]
pub struct Centered {
    /// `n x d`, every column has zero mean.
    pub matrix: Array2<f64>,
    /// Column means of the input, length `d`.
    pub mean: Array1<f64>,
}

/// Validates the embedding set and subtracts its mean vector from every row.
///
/// An empty set yields a `0 x 0` matrix and an empty mean. A single vector yields an
/// all-zero row.
///
/// # Errors
/// - [`ProjectionError::ShapeMismatch`] for the first vector whose length differs
///   from the first vector's
/// - [`ProjectionError::NonFiniteValue`] for the first NaN or infinite component
pub fn preprocess<V: AsRef<[f64]>>(vectors: &[V]) -> Result<Centered> {
    preprocess_with(vectors, false)
}

pub(crate) fn preprocess_with<V: AsRef<[f64]>>(vectors: &[V], parallel: bool) -> Result<Centered> {
    let d = vectors.first().map_or(0, |v| v.as_ref().len());
    let mut matrix = to_matrix(vectors, d)?;

    let mean = column_mean(&matrix);
    subtract_mean(&mut matrix, &mean, parallel);

    Ok(Centered { matrix, mean })
}

/// Copies `vectors` into an `n x d` matrix, checking lengths and finiteness.
pub(crate) fn to_matrix<V: AsRef<[f64]>>(vectors: &[V], d: usize) -> Result<Array2<f64>> {
    let mut matrix = Array2::zeros((vectors.len(), d));
    for (index, (vector, mut row)) in vectors.iter().zip(matrix.rows_mut()).enumerate() {
        let vector = vector.as_ref();
        if vector.len() != d {
            return Err(ProjectionError::ShapeMismatch {
                index,
                expected: d,
                found: vector.len(),
            });
        }
        for (component, (&value, slot)) in vector.iter().zip(row.iter_mut()).enumerate() {
            if !value.is_finite() {
                return Err(ProjectionError::NonFiniteValue { index, component });
            }
            *slot = value;
        }
    }
    Ok(matrix)
}

/// Column means, accumulated row by row in index order.
fn column_mean(matrix: &Array2<f64>) -> Array1<f64> {
    let (n, d) = matrix.dim();
    let mut mean = Array1::zeros(d);
    if n == 0 {
        return mean;
    }
    for row in matrix.rows() {
        mean += &row;
    }
    mean /= n as f64;
    mean
}

pub(crate) fn subtract_mean(matrix: &mut Array2<f64>, mean: &Array1<f64>, parallel: bool) {
    if parallel {
        matrix
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .for_each(|mut row| {
                row -= mean;
            });
    } else {
        for mut row in matrix.rows_mut() {
            row -= mean;
        }
    }
}
