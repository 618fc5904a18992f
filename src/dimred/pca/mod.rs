//! # Principal Component Analysis
//!
//! Projects an embedding set onto its leading principal components. One call runs the
//! whole pipeline: center → covariance (or Gram) → eigen-decomposition → projection.
//! Nothing is cached between calls.

pub mod covariance;
pub mod preprocess;
pub mod projector;

use crate::eigen::{flip_sign, normalize_in_place, top_k_eigenpairs, EigenSolver, Eigenpair};
use crate::error::Result;
use crate::utils::ordered_dot;
use covariance::{covariance_with, gram_with, total_variance};
use ndarray::{s, Array1, Array2, ArrayView2};
use preprocess::{preprocess_with, subtract_mean, to_matrix};
use projector::project_with;
use std::sync::Arc;

/// Which symmetric matrix gets decomposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CovarianceStrategy {
    /// `d x d` covariance matrix.
    Covariance,
    /// `n x n` Gram matrix; `C^T u` spans the components, which are then refined
    /// against the covariance restricted to that span.
    Gram,
    /// Gram when there are fewer samples than features, covariance otherwise.
    #[default]
    Auto,
}

pub struct PcaProjectorBuilder<S: EigenSolver> {
    n_components: usize,
    strategy: CovarianceStrategy,
    rank_tolerance: f64,
    parallel: bool,
    solver: Arc<S>,
}

impl<S: EigenSolver> PcaProjectorBuilder<S> {
    /// Creates a builder with default parameters.
    ///
    /// Default values:
    /// - `n_components`: 2
    /// - `strategy`: Auto
    /// - `rank_tolerance`: 1e-10
    /// - `parallel`: false
    pub fn new(solver: S) -> Self {
        PcaProjectorBuilder {
            n_components: 2,
            strategy: CovarianceStrategy::default(),
            rank_tolerance: 1e-10,
            parallel: false,
            solver: Arc::new(solver),
        }
    }

    /// Sets the output dimensionality. Requests beyond the data's dimensionality
    /// produce zero-filled trailing coordinates.
    pub fn n_components(mut self, n_components: usize) -> Self {
        self.n_components = n_components;
        self
    }

    pub fn strategy(mut self, strategy: CovarianceStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the relative eigenvalue cutoff below which a direction counts as
    /// having no variance. Coordinates along such directions are exactly zero.
    pub fn rank_tolerance(mut self, rank_tolerance: f64) -> Self {
        self.rank_tolerance = rank_tolerance;
        self
    }

    /// Runs centering, matrix construction and projection on the rayon pool.
    /// Output is bit-identical to the serial path.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn build(self) -> PcaProjector<S> {
        PcaProjector {
            n_components: self.n_components,
            strategy: self.strategy,
            rank_tolerance: self.rank_tolerance,
            parallel: self.parallel,
            solver: self.solver,
        }
    }
}

/// Stateless PCA projector. Every [`fit_transform`](Self::fit_transform) call is an
/// independent recomputation, so one projector can be shared across threads.
pub struct PcaProjector<S: EigenSolver> {
    n_components: usize,
    strategy: CovarianceStrategy,
    rank_tolerance: f64,
    parallel: bool,
    solver: Arc<S>,
}

impl<S: EigenSolver> PcaProjector<S> {
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Fits principal components to `vectors` and projects them.
    ///
    /// # Returns
    /// - `Ok(Projection)`: coordinates (`n x n_components`) plus the fitted basis
    /// - `Err`: inconsistent vector lengths, non-finite values or solver failure
    pub fn fit_transform<V: AsRef<[f64]>>(&self, vectors: &[V]) -> Result<Projection> {
        let centered = preprocess_with(vectors, self.parallel)?;
        let (n_samples, n_features) = centered.matrix.dim();
        let k = self.n_components;
        let available = k.min(n_features);

        let use_gram = match self.strategy {
            CovarianceStrategy::Covariance => false,
            CovarianceStrategy::Gram => true,
            CovarianceStrategy::Auto => n_samples < n_features,
        };
        log::debug!(
            "PCA: {} samples x {} features -> {} components ({} via {})",
            n_samples,
            n_features,
            k,
            available,
            if use_gram { "gram" } else { "covariance" }
        );

        let eigenpairs = if use_gram {
            self.gram_eigenpairs(centered.matrix.view(), available)?
        } else {
            let cov = covariance_with(centered.matrix.view(), self.parallel);
            top_k_eigenpairs(self.solver.as_ref(), cov.view(), available)?
        };

        let eigenvalues: Array1<f64> = eigenpairs.iter().map(|p| p.value.max(0.0)).collect();
        let components =
            Array2::from_shape_fn((available, n_features), |(i, j)| eigenpairs[i].vector[j]);
        let rank = numeric_rank(eigenvalues.as_slice().unwrap_or(&[]), self.rank_tolerance);

        let coordinates = project_with(
            centered.matrix.view(),
            components.slice(s![..rank, ..]),
            k,
            self.parallel,
        )?;

        let total_variance = total_variance(centered.matrix.view());
        let explained_variance_ratio = if total_variance > 0.0 {
            &eigenvalues / total_variance
        } else {
            Array1::zeros(available)
        };
        log::debug!("PCA: numeric rank {rank}, total variance {total_variance:e}");

        Ok(Projection {
            coordinates,
            mean: centered.mean,
            components,
            eigenvalues,
            explained_variance_ratio,
            total_variance,
            rank,
        })
    }

    /// Decomposes the `n x n` Gram matrix and maps its eigenvectors back to feature
    /// space. Directions without variance are filled by completing an orthonormal
    /// basis so that `k` components are always returned.
    fn gram_eigenpairs(&self, centered: ArrayView2<f64>, k: usize) -> Result<Vec<Eigenpair>> {
        let (n_samples, n_features) = centered.dim();
        if k == 0 {
            return Ok(Vec::new());
        }

        let gram = gram_with(centered, self.parallel);
        let pairs = top_k_eigenpairs(self.solver.as_ref(), gram.view(), n_samples)?;
        let largest = pairs.first().map_or(0.0, |p| p.value);

        // C^T u stays inside the row space of C even when u is inaccurate, so the
        // mapped vectors are only used as a subspace and refined below.
        let mut subspace: Vec<Array1<f64>> = Vec::new();
        for pair in &pairs {
            if largest <= 0.0 || pair.value <= self.rank_tolerance * largest {
                break;
            }
            let mut vector: Array1<f64> = centered
                .columns()
                .into_iter()
                .map(|column| ordered_dot(column, pair.vector.view()))
                .collect();
            normalize_in_place(&mut vector);
            if let Some(vector) = orthogonal_remainder(&subspace, vector) {
                subspace.push(vector);
            }
        }

        let mut eigenpairs = self.ritz_pairs(centered, &subspace, k)?;
        let mut basis: Vec<Array1<f64>> = eigenpairs.iter().map(|p| p.vector.clone()).collect();
        complete_orthonormal_basis(&mut basis, n_features, k);
        for vector in basis.into_iter().skip(eigenpairs.len()) {
            eigenpairs.push(Eigenpair { value: 0.0, vector });
        }
        Ok(eigenpairs)
    }

    /// Rayleigh-Ritz on an orthonormal `subspace`: the covariance of the data
    /// expressed in subspace coordinates is decomposed and its top `k` eigenvectors
    /// are mapped back to feature space.
    fn ritz_pairs(
        &self,
        centered: ArrayView2<f64>,
        subspace: &[Array1<f64>],
        k: usize,
    ) -> Result<Vec<Eigenpair>> {
        let m = subspace.len();
        let n_features = centered.ncols();
        if m == 0 {
            return Ok(Vec::new());
        }

        let q = Array2::from_shape_fn((m, n_features), |(i, j)| subspace[i][j]);
        let scores = project_with(centered, q.view(), m, self.parallel)?;
        let reduced = covariance_with(scores.view(), self.parallel);
        let pairs = top_k_eigenpairs(self.solver.as_ref(), reduced.view(), k.min(m))?;

        Ok(pairs
            .into_iter()
            .map(|pair| {
                let mut vector = Array1::zeros(n_features);
                for (&weight, row) in pair.vector.iter().zip(q.rows()) {
                    vector.scaled_add(weight, &row);
                }
                normalize_in_place(&mut vector);
                flip_sign(&mut vector);
                Eigenpair {
                    value: pair.value,
                    vector,
                }
            })
            .collect())
    }
}

/// Number of leading eigenvalues above `tol * largest`. Expects descending order.
fn numeric_rank(eigenvalues: &[f64], tol: f64) -> usize {
    let largest = eigenvalues.first().copied().unwrap_or(0.0);
    if largest <= 0.0 {
        return 0;
    }
    eigenvalues
        .iter()
        .take_while(|&&value| value > tol * largest)
        .count()
}

/// Extends `basis` (orthonormal, length-`d` vectors) to `k` vectors by
/// Gram-Schmidt over the canonical basis, in index order.
fn complete_orthonormal_basis(basis: &mut Vec<Array1<f64>>, d: usize, k: usize) {
    for axis in 0..d {
        if basis.len() >= k {
            break;
        }
        let mut candidate = Array1::zeros(d);
        candidate[axis] = 1.0;
        if let Some(vector) = orthogonal_remainder(basis, candidate) {
            basis.push(vector);
        }
    }
}

/// Removes the components of a unit-length `candidate` along `basis` and
/// normalizes what is left. `None` when the remainder is numerically zero.
fn orthogonal_remainder(basis: &[Array1<f64>], mut candidate: Array1<f64>) -> Option<Array1<f64>> {
    // two passes keep the result orthogonal to working precision
    for _ in 0..2 {
        for b in basis {
            let overlap = ordered_dot(candidate.view(), b.view());
            candidate.scaled_add(-overlap, b);
        }
    }
    let norm = ordered_dot(candidate.view(), candidate.view()).sqrt();
    if norm > 1e-8 {
        candidate /= norm;
        Some(candidate)
    } else {
        None
    }
}

/// Result of one PCA projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    coordinates: Array2<f64>,
    mean: Array1<f64>,
    components: Array2<f64>,
    eigenvalues: Array1<f64>,
    explained_variance_ratio: Array1<f64>,
    total_variance: f64,
    rank: usize,
}

impl Projection {
    /// `n x n_components`, position-aligned with the input vectors.
    pub fn coordinates(&self) -> &Array2<f64> {
        &self.coordinates
    }

    /// Coordinates as one `Vec` per input vector.
    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.coordinates.rows().into_iter().map(|row| row.to_vec()).collect()
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Principal components as rows (`min(n_components, d) x d`), descending by
    /// eigenvalue. Rows at or past [`rank`](Self::rank) span directions without variance.
    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }

    pub fn eigenvalues(&self) -> &Array1<f64> {
        &self.eigenvalues
    }

    pub fn explained_variance_ratio(&self) -> &Array1<f64> {
        &self.explained_variance_ratio
    }

    /// Running sum of [`explained_variance_ratio`](Self::explained_variance_ratio).
    pub fn cumulative_explained_variance_ratio(&self) -> Array1<f64> {
        let mut cumulative = Array1::zeros(self.explained_variance_ratio.len());
        let mut sum = 0.0;
        for (i, &ratio) in self.explained_variance_ratio.iter().enumerate() {
            sum += ratio;
            cumulative[i] = sum;
        }
        cumulative
    }

    pub fn total_variance(&self) -> f64 {
        self.total_variance
    }

    /// Number of components with non-negligible variance.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Projects further vectors onto the fitted basis using the fitted mean.
    ///
    /// The basis itself is not updated.
    pub fn transform<V: AsRef<[f64]>>(&self, vectors: &[V]) -> Result<Array2<f64>> {
        let mut matrix = to_matrix(vectors, self.mean.len())?;
        subtract_mean(&mut matrix, &self.mean, false);
        project_with(
            matrix.view(),
            self.components.slice(s![..self.rank, ..]),
            self.coordinates.ncols(),
            false,
        )
    }
}
