//! Principal component analysis on the centred embedding matrix.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{MiseError, MiseResult};
use crate::linalg::{center, column_means, normalize_signs, symmetric_eigen};

/// Eigenvalues below this fraction of the largest one are treated as zero
/// when recovering directions from the Gram matrix.
const RELATIVE_EIGEN_FLOOR: f64 = 1e-12;

/// A fitted PCA model: the column mean and the leading principal directions.
#[derive(Debug, Clone)]
pub struct Pca {
    mean: Array1<f64>,
    /// One principal direction per row (m x D).
    components: Array2<f64>,
    explained_variance: Array1<f64>,
    explained_variance_ratio: Array1<f64>,
}

/// Full spectrum of a centred matrix.
struct Spectrum {
    mean: Array1<f64>,
    centered: Array2<f64>,
    /// Unit directions as columns (D x r), ordered by descending variance.
    directions: Array2<f64>,
    /// Variance captured by each direction (length r), non-negative.
    variances: Array1<f64>,
}

impl Spectrum {
    fn total(&self) -> f64 {
        self.variances.sum()
    }

    fn ratios(&self) -> Array1<f64> {
        let total = self.total();
        if total > 0.0 {
            self.variances.mapv(|v| v / total)
        } else {
            // Constant matrix: no variance to distribute.
            Array1::zeros(self.variances.len())
        }
    }
}

/// Largest component count a matrix supports.
pub(crate) fn max_components(matrix: ArrayView2<f32>) -> usize {
    matrix.nrows().min(matrix.ncols())
}

pub(crate) fn check_component_count(matrix: ArrayView2<f32>, m: usize) -> MiseResult<()> {
    let max = max_components(matrix);
    if m == 0 || m > max {
        return Err(MiseError::InvalidComponentCount { requested: m, max });
    }
    Ok(())
}

/// Computes all r = min(N, D) principal directions.
///
/// Uses the D x D covariance when D <= N and the N x N Gram matrix otherwise,
/// so the eigenproblem is always the smaller of the two.
fn spectrum(matrix: ArrayView2<f32>) -> Spectrum {
    let (n, d) = matrix.dim();
    let mean = column_means(matrix);
    let centered = center(matrix, &mean);
    let denom = n.saturating_sub(1).max(1) as f64;
    let r = n.min(d);

    let (directions, variances) = if d <= n {
        let covariance = centered.t().dot(&centered) / denom;
        let eig = symmetric_eigen(covariance.view());
        (eig.vectors, eig.values.mapv(|v| v.max(0.0)))
    } else {
        let gram = centered.dot(&centered.t()) / denom;
        let eig = symmetric_eigen(gram.view());
        let top = eig.values.first().copied().unwrap_or(0.0).max(0.0);
        let mut directions = Array2::<f64>::zeros((d, r));
        for j in 0..r {
            let lambda = eig.values[j];
            if lambda <= top * RELATIVE_EIGEN_FLOOR || lambda <= 0.0 {
                continue;
            }
            let mut dir = centered.t().dot(&eig.vectors.column(j));
            let norm = dir.dot(&dir).sqrt();
            if norm > 0.0 {
                dir /= norm;
                directions.column_mut(j).assign(&dir);
            }
        }
        normalize_signs(&mut directions);
        (directions, eig.values.mapv(|v| v.max(0.0)))
    };

    Spectrum {
        mean,
        centered,
        directions: directions.slice(s![.., ..r]).to_owned(),
        variances: variances.slice(s![..r]).to_owned(),
    }
}

impl Pca {
    /// Fits the top-`m` principal components of `matrix`.
    pub fn fit(matrix: ArrayView2<f32>, m: usize) -> MiseResult<Pca> {
        Self::fit_transform(matrix, m).map(|(pca, _)| pca)
    }

    /// Fits the model and returns the projection of the fitted rows (N x m).
    pub fn fit_transform(matrix: ArrayView2<f32>, m: usize) -> MiseResult<(Pca, Array2<f32>)> {
        check_component_count(matrix, m)?;
        let spectrum = spectrum(matrix);
        let ratios = spectrum.ratios();
        let directions = spectrum.directions.slice(s![.., ..m]);
        let projected = spectrum.centered.dot(&directions).mapv(|x| x as f32);

        let pca = Pca {
            components: directions.t().to_owned(),
            explained_variance: spectrum.variances.slice(s![..m]).to_owned(),
            explained_variance_ratio: ratios.slice(s![..m]).to_owned(),
            mean: spectrum.mean,
        };
        Ok((pca, projected))
    }

    /// Projects new rows (e.g. encoded queries) onto the fitted components.
    pub fn transform(&self, rows: ArrayView2<f32>) -> MiseResult<Array2<f32>> {
        if rows.ncols() != self.dimensions() {
            return Err(MiseError::DimensionMismatch {
                expected: self.dimensions(),
                actual: rows.ncols(),
            });
        }
        let centered = center(rows, &self.mean);
        Ok(centered.dot(&self.components.t()).mapv(|x| x as f32))
    }

    /// Projects a single vector.
    pub fn transform_one(&self, vector: ArrayView1<f32>) -> MiseResult<Array1<f32>> {
        let rows = vector.insert_axis(Axis(0));
        Ok(self.transform(rows)?.row(0).to_owned())
    }

    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    pub fn dimensions(&self) -> usize {
        self.mean.len()
    }

    /// Principal directions, one per row.
    pub fn components(&self) -> ArrayView2<'_, f64> {
        self.components.view()
    }

    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.mean.view()
    }

    pub fn explained_variance(&self) -> ArrayView1<'_, f64> {
        self.explained_variance.view()
    }

    pub fn explained_variance_ratio(&self) -> ArrayView1<'_, f64> {
        self.explained_variance_ratio.view()
    }
}

/// Fraction of total variance captured by every principal component, in
/// descending order. Independent of any chosen component count.
pub fn explained_variance_ratio(matrix: ArrayView2<f32>) -> MiseResult<Vec<f64>> {
    if max_components(matrix) == 0 {
        return Err(MiseError::InvalidArgument(
            "explained variance needs a non-empty matrix".to_string(),
        ));
    }
    Ok(spectrum(matrix).ratios().to_vec())
}
