pub mod dimred;
pub mod eigen;
mod error;
mod utils;

pub use dimred::pca::{CovarianceStrategy, PcaProjector, PcaProjectorBuilder, Projection};
pub use eigen::{top_k_eigenpairs, EigenMethod, EigenSolver, Eigenpair, Jacobi, SymmetricQr};
pub use error::{ProjectionError, Result};

/// Projects `vectors` onto their top `target_dims` principal components.
///
/// Returns one row of exactly `target_dims` coordinates per input vector, in input
/// order. Coordinates along directions the data does not vary in are `0.0`, which
/// covers empty input, a single vector, and requests wider than the embeddings.
///
/// # Errors
/// - [`ProjectionError::InvalidDimensionRequest`] if `target_dims` is negative
/// - [`ProjectionError::ShapeMismatch`] if the vectors differ in length
/// - [`ProjectionError::NonFiniteValue`] if a component is NaN or infinite
/// - [`ProjectionError::DecompositionFailure`] if the eigen-solver does not converge
pub fn reduce_dimensions<V: AsRef<[f64]>>(vectors: &[V], target_dims: i64) -> Result<Vec<Vec<f64>>> {
    let n_components =
        usize::try_from(target_dims).map_err(|_| ProjectionError::InvalidDimensionRequest {
            requested: target_dims,
            reason: "target dimensionality must be non-negative",
        })?;

    let projection = PcaProjectorBuilder::new(SymmetricQr::default())
        .n_components(n_components)
        .build()
        .fit_transform(vectors)?;
    Ok(projection.into_rows())
}
