//! Defines the data structures used for API request and response bodies.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use mise_core::analytics::{DEFAULT_MAX_ITERATIONS, DEFAULT_SAMPLE_SIZE, DEFAULT_SEED};
use mise_core::{MiseResult, Reducer, ReductionMethod, ScoredItem, TsneConfig, DEFAULT_TOP_K};

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

// --- Request Bodies ---

/// Request body for a similarity search.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query_vector: Vec<f32>,
    #[serde(default = "default_top_k")]
    pub k: usize,
}

/// Request body for reducing one space.
#[derive(Debug, Deserialize)]
pub struct ReduceRequest {
    /// `pca` or `tsne`.
    pub method: String,
    pub components: usize,
    pub seed: Option<u64>,
    /// t-SNE only; must stay below the row count.
    pub perplexity: Option<f64>,
}

impl ReduceRequest {
    pub fn reducer(&self) -> MiseResult<Reducer> {
        build_reducer(&self.method, self.seed, self.perplexity)
    }
}

/// Request body for clustering one space. Without `k` the default sweep runs.
#[derive(Debug, Default, Deserialize)]
pub struct ClusterRequest {
    pub k: Option<usize>,
    pub seed: Option<u64>,
    pub max_iterations: Option<usize>,
    pub sample_size: Option<usize>,
}

impl ClusterRequest {
    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or(DEFAULT_SEED)
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS)
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size.unwrap_or(DEFAULT_SAMPLE_SIZE)
    }
}

/// Request body for projecting several spaces onto shared axes.
#[derive(Debug, Deserialize)]
pub struct JointReduceRequest {
    pub spaces: Vec<String>,
    pub method: String,
    pub components: usize,
    pub seed: Option<u64>,
    pub perplexity: Option<f64>,
}

impl JointReduceRequest {
    pub fn reducer(&self) -> MiseResult<Reducer> {
        build_reducer(&self.method, self.seed, self.perplexity)
    }
}

fn build_reducer(method: &str, seed: Option<u64>, perplexity: Option<f64>) -> MiseResult<Reducer> {
    match method.parse::<ReductionMethod>()? {
        ReductionMethod::Pca => Ok(Reducer::pca()),
        ReductionMethod::Tsne => {
            let mut config = TsneConfig::default();
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(perplexity) = perplexity {
                config.perplexity = perplexity;
            }
            config.validate()?;
            Ok(Reducer::tsne(config))
        }
    }
}

// --- Response Bodies ---

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub space: String,
    pub results: Vec<ScoredItem>,
}

#[derive(Debug, Serialize)]
pub struct ReduceResponse {
    pub space: String,
    pub method: String,
    /// One row of `components` coordinates per item.
    pub coordinates: Vec<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explained_variance_ratio: Option<Vec<f64>>,
}

#[derive(Debug, Serialize)]
pub struct SpaceCoordinates {
    pub space: String,
    pub coordinates: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
pub struct JointReduceResponse {
    pub method: String,
    pub spaces: Vec<SpaceCoordinates>,
}

/// Row-major nested vectors, the JSON shape clients plot from.
pub fn rows_of(matrix: &Array2<f32>) -> Vec<Vec<f32>> {
    matrix.outer_iter().map(|row| row.to_vec()).collect()
}
