use crate::error::{ProjectionError, Result};
use crate::utils::ordered_dot;
use ndarray::{Array2, ArrayView2, Zip};

/// Projects centered rows onto principal components.
///
/// `components` is `m x d` with one unit-length component per row. The output is
/// `n x k`: column `j < min(m, k)` holds the dot product with component `j`, and any
/// columns past the available components are zero.
///
/// # Errors
/// - [`ProjectionError::ShapeMismatch`] if the component length differs from the
///   width of `centered`
/// - [`ProjectionError::InvalidDimensionRequest`] if an `n x k` output cannot be
///   allocated
pub fn project(centered: ArrayView2<f64>, components: ArrayView2<f64>, k: usize) -> Result<Array2<f64>> {
    project_with(centered, components, k, false)
}

pub(crate) fn project_with(
    centered: ArrayView2<f64>,
    components: ArrayView2<f64>,
    k: usize,
    parallel: bool,
) -> Result<Array2<f64>> {
    let (n, d) = centered.dim();
    if components.nrows() > 0 && components.ncols() != d {
        return Err(ProjectionError::ShapeMismatch {
            index: 0,
            expected: d,
            found: components.ncols(),
        });
    }

    let used = components.nrows().min(k);
    let mut transformed = zeroed_output(n, k)?;
    let zip = Zip::from(transformed.rows_mut()).and(centered.rows());

    let score = |mut out: ndarray::ArrayViewMut1<f64>, row: ndarray::ArrayView1<f64>| {
        for j in 0..used {
            out[j] = ordered_dot(row, components.row(j));
        }
    };
    if parallel {
        zip.par_for_each(score);
    } else {
        zip.for_each(score);
    }

    Ok(transformed)
}

/// `n x k` zeros, or an error when the buffer size overflows or cannot be reserved.
fn zeroed_output(n: usize, k: usize) -> Result<Array2<f64>> {
    let too_large = || ProjectionError::InvalidDimensionRequest {
        requested: i64::try_from(k).unwrap_or(i64::MAX),
        reason: "output coordinates do not fit in memory",
    };
    let len = n.checked_mul(k).ok_or_else(too_large)?;
    let mut buffer: Vec<f64> = Vec::new();
    buffer.try_reserve_exact(len).map_err(|_| too_large())?;
    buffer.resize(len, 0.0);
    Array2::from_shape_vec((n, k), buffer).map_err(|_| too_large())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_projection_scores() {
        let centered = array![[1.0, 2.0], [-1.0, -2.0]];
        let components = array![[1.0, 0.0], [0.0, 1.0]];
        let out = project(centered.view(), components.view(), 2).unwrap();
        assert_eq!(out, centered);

        let h = 1.0 / 2.0_f64.sqrt();
        let diagonal = array![[h, h]];
        let out = project(centered.view(), diagonal.view(), 1).unwrap();
        assert_abs_diff_eq!(out[[0, 0]], 3.0 * h, epsilon = 1e-12);
        assert_abs_diff_eq!(out[[1, 0]], -3.0 * h, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_padding() {
        let centered = array![[-1.0], [1.0]];
        let components = array![[1.0]];
        let out = project(centered.view(), components.view(), 3).unwrap();
        assert_eq!(out, array![[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_fewer_outputs_than_components() {
        let centered = array![[1.0, 2.0, 3.0]];
        let components = Array2::<f64>::eye(3);
        let out = project(centered.view(), components.view(), 2).unwrap();
        assert_eq!(out, array![[1.0, 2.0]]);
    }

    #[test]
    fn test_component_length_mismatch() {
        let centered = array![[1.0, 2.0, 3.0]];
        let components = array![[1.0, 0.0]];
        assert_eq!(
            project(centered.view(), components.view(), 1),
            Err(ProjectionError::ShapeMismatch {
                index: 0,
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn test_unallocatable_output() {
        let centered = array![[1.0, 2.0], [3.0, 4.0]];
        let components = Array2::<f64>::eye(2);
        for k in [usize::MAX, usize::MAX / 2] {
            assert!(matches!(
                project(centered.view(), components.view(), k),
                Err(ProjectionError::InvalidDimensionRequest { .. })
            ));
        }
    }

    #[test]
    fn test_empty_rows() {
        let centered = Array2::<f64>::zeros((0, 4));
        let components = Array2::<f64>::zeros((0, 4));
        let out = project(centered.view(), components.view(), 2).unwrap();
        assert_eq!(out.dim(), (0, 2));
    }

    #[test]
    fn test_parallel_matches_serial() {
        let centered = Array2::from_shape_fn((40, 6), |(i, j)| (i as f64 - 20.0) * 0.1 + j as f64);
        let components = Array2::from_shape_fn((2, 6), |(i, j)| if i == j { 1.0 } else { 0.25 });
        let serial = project_with(centered.view(), components.view(), 4, false).unwrap();
        let parallel = project_with(centered.view(), components.view(), 4, true).unwrap();
        assert_eq!(serial, parallel);
    }
}
