//! Dimensionality reduction of embedding matrices.
//!
//! Two methods are available, selected by name: `pca` (linear, with
//! explained variance) and `tsne` (stochastic, seeded, no variance notion).

pub mod pca;
pub mod tsne;

use std::fmt;
use std::str::FromStr;

use ndarray::{concatenate, s, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TsneConfig;
use crate::error::{MiseError, MiseResult};

pub use pca::{explained_variance_ratio, Pca};

/// Reduction method, parsed from its lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReductionMethod {
    Pca,
    Tsne,
}

impl FromStr for ReductionMethod {
    type Err = MiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pca" => Ok(ReductionMethod::Pca),
            "tsne" | "t-sne" => Ok(ReductionMethod::Tsne),
            other => Err(MiseError::InvalidArgument(format!("unknown reduction method '{}'", other))),
        }
    }
}

impl fmt::Display for ReductionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReductionMethod::Pca => write!(f, "pca"),
            ReductionMethod::Tsne => write!(f, "tsne"),
        }
    }
}

/// Projected coordinates (N x m) plus, for PCA, the variance fraction of each kept component.
#[derive(Debug, Clone)]
pub struct ReducedCoordinates {
    pub coordinates: Array2<f32>,
    pub explained_variance_ratio: Option<Vec<f64>>,
}

/// Result of reducing several matrices through one shared projection.
#[derive(Debug, Clone)]
pub struct JointReduction {
    /// One block per input, same row count and order as that input.
    pub segments: Vec<Array2<f32>>,
    pub explained_variance_ratio: Option<Vec<f64>>,
}

/// Projects the rows of `matrix` onto its top-`m` principal components.
///
/// Fails with `InvalidComponentCount` unless `1 <= m <= min(N, D)`.
pub fn reduce_pca(matrix: ArrayView2<f32>, m: usize) -> MiseResult<ReducedCoordinates> {
    let (pca, coordinates) = Pca::fit_transform(matrix, m)?;
    Ok(ReducedCoordinates {
        coordinates,
        explained_variance_ratio: Some(pca.explained_variance_ratio().to_vec()),
    })
}

/// A reduction method together with its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reducer {
    method: ReductionMethod,
    tsne: TsneConfig,
}

impl Reducer {
    pub fn pca() -> Self {
        Reducer { method: ReductionMethod::Pca, tsne: TsneConfig::default() }
    }

    pub fn tsne(config: TsneConfig) -> Self {
        Reducer { method: ReductionMethod::Tsne, tsne: config }
    }

    /// Builds a reducer from a method name; `seed` only affects t-SNE.
    pub fn by_name(name: &str, seed: Option<u64>) -> MiseResult<Self> {
        let method: ReductionMethod = name.parse()?;
        let mut tsne = TsneConfig::default();
        if let Some(seed) = seed {
            tsne.seed = seed;
        }
        Ok(Reducer { method, tsne })
    }

    pub fn method(&self) -> ReductionMethod {
        self.method
    }

    pub fn reduce(&self, matrix: ArrayView2<f32>, m: usize) -> MiseResult<ReducedCoordinates> {
        match self.method {
            ReductionMethod::Pca => reduce_pca(matrix, m),
            ReductionMethod::Tsne => {
                pca::check_component_count(matrix, m)?;
                Ok(ReducedCoordinates {
                    coordinates: tsne::tsne(matrix, m, &self.tsne)?,
                    explained_variance_ratio: None,
                })
            }
        }
    }

    /// Full explained-variance spectrum. Only meaningful for PCA.
    pub fn explained_variance_ratio(&self, matrix: ArrayView2<f32>) -> MiseResult<Vec<f64>> {
        match self.method {
            ReductionMethod::Pca => explained_variance_ratio(matrix),
            ReductionMethod::Tsne => Err(MiseError::UnsupportedOperation(
                "t-SNE has no explained variance".to_string(),
            )),
        }
    }

    /// Fits one projection on the row-wise concatenation of `matrices` and
    /// splits the result back per input, so all segments share the same axes.
    ///
    /// All inputs must have the same column count.
    pub fn reduce_joint(&self, matrices: &[ArrayView2<f32>], m: usize) -> MiseResult<JointReduction> {
        let first = matrices.first().ok_or_else(|| {
            MiseError::InvalidArgument("joint reduction needs at least one matrix".to_string())
        })?;
        let dims = first.ncols();
        if let Some(bad) = matrices.iter().find(|mat| mat.ncols() != dims) {
            return Err(MiseError::DimensionMismatch { expected: dims, actual: bad.ncols() });
        }

        let stacked = concatenate(Axis(0), matrices)
            .map_err(|e| MiseError::InvalidArgument(format!("cannot stack matrices: {}", e)))?;
        debug!(inputs = matrices.len(), rows = stacked.nrows(), method = %self.method, "Joint reduction");
        let reduced = self.reduce(stacked.view(), m)?;

        let mut segments = Vec::with_capacity(matrices.len());
        let mut offset = 0;
        for mat in matrices {
            let len = mat.nrows();
            segments.push(reduced.coordinates.slice(s![offset..offset + len, ..]).to_owned());
            offset += len;
        }

        Ok(JointReduction {
            segments,
            explained_variance_ratio: reduced.explained_variance_ratio,
        })
    }
}
