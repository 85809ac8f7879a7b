use serde::{Serialize, Deserialize};
use crate::error::{MiseResult, MiseError};

/// Configuration parameters for a single k-means run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KMeansConfig {
    /// Number of clusters to partition the space into.
    pub k: usize,
    /// Upper bound on Lloyd iterations. Reaching it is a normal termination.
    pub max_iterations: usize,
    /// Seed for centroid initialisation. Identical seeds reproduce identical assignments.
    pub seed: u64,
}

impl KMeansConfig {
    pub fn new(k: usize, seed: u64, max_iterations: usize) -> Self {
        KMeansConfig { k, max_iterations, seed }
    }

    /// Validates the parameters that do not depend on the input matrix.
    /// The `k <= N` bound is checked by the cluster engine itself.
    pub fn validate(&self) -> MiseResult<()> {
        if self.max_iterations == 0 {
            return Err(MiseError::Configuration("max_iterations must be greater than 0".to_string()));
        }
        Ok(())
    }
}

impl Default for KMeansConfig {
    fn default() -> Self {
        KMeansConfig {
            k: 8,
            max_iterations: 300,
            seed: 42,
        }
    }
}

/// Configuration parameters for t-SNE.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TsneConfig {
    /// Effective number of neighbours each point considers.
    pub perplexity: f64,
    /// Gradient descent step size.
    pub learning_rate: f64,
    /// Total optimisation iterations.
    pub iterations: usize,
    /// Factor applied to input affinities during the first phase.
    pub early_exaggeration: f64,
    /// Iterations the exaggeration stays active.
    pub exaggeration_iterations: usize,
    /// Seed for the initial layout. Required for reproducible output.
    pub seed: u64,
}

impl TsneConfig {
    pub fn with_seed(seed: u64) -> Self {
        TsneConfig { seed, ..Default::default() }
    }

    pub fn validate(&self) -> MiseResult<()> {
        if !(self.perplexity > 0.0) {
            return Err(MiseError::Configuration("perplexity must be greater than 0".to_string()));
        }
        if !(self.learning_rate > 0.0) {
            return Err(MiseError::Configuration("learning_rate must be greater than 0".to_string()));
        }
        if self.iterations == 0 {
            return Err(MiseError::Configuration("iterations must be greater than 0".to_string()));
        }
        if self.early_exaggeration < 1.0 {
            return Err(MiseError::Configuration("early_exaggeration must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for TsneConfig {
    fn default() -> Self {
        TsneConfig {
            perplexity: 30.0,
            learning_rate: 200.0,
            iterations: 1000,
            early_exaggeration: 12.0,
            exaggeration_iterations: 250,
            seed: 42,
        }
    }
}
