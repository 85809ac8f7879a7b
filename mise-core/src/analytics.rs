//! Reporting helpers that compose the store, reducer and cluster engine.

use ndarray::{Array2, ArrayView2};
use serde::Serialize;

use crate::cluster::{kmeans_sweep, sample_cluster, ClusterAssignment};
use crate::distance::euclidean_distance;
use crate::error::MiseResult;
use crate::reduce::{explained_variance_ratio, Reducer};
use crate::store::EmbeddingStore;
use crate::vector::ItemIndex;

/// Cluster counts explored by the default sweep.
pub const DEFAULT_SWEEP: [usize; 4] = [2, 3, 5, 10];
/// Members shown per cluster.
pub const DEFAULT_SAMPLE_SIZE: usize = 10;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_MAX_ITERATIONS: usize = 300;

/// Per-component and cumulative explained variance of one space.
#[derive(Debug, Clone, Serialize)]
pub struct VarianceCurve {
    pub ratios: Vec<f64>,
    pub cumulative: Vec<f64>,
}

impl VarianceCurve {
    fn from_ratios(ratios: Vec<f64>) -> Self {
        let cumulative = ratios
            .iter()
            .scan(0.0, |acc, &r| {
                *acc += r;
                Some(*acc)
            })
            .collect();
        VarianceCurve { ratios, cumulative }
    }

    /// Smallest component count whose cumulative variance reaches `threshold`,
    /// or `None` if the curve never gets there.
    pub fn components_for(&self, threshold: f64) -> Option<usize> {
        self.cumulative.iter().position(|&c| c >= threshold).map(|i| i + 1)
    }
}

/// Explained-variance curve of `space`.
pub fn variance_curve(store: &EmbeddingStore, space: &str) -> MiseResult<VarianceCurve> {
    let space = store.get(space)?;
    Ok(VarianceCurve::from_ratios(explained_variance_ratio(space.matrix())?))
}

#[derive(Debug, Clone, Serialize)]
pub struct SampledItem {
    pub item: ItemIndex,
    pub distance_to_centroid: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterSample {
    pub cluster: usize,
    pub size: usize,
    pub members: Vec<SampledItem>,
}

/// Clustering of one space for one k, with a few members drawn per cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterReport {
    pub k: usize,
    pub iterations: usize,
    pub converged: bool,
    pub labels: Vec<usize>,
    pub clusters: Vec<ClusterSample>,
}

/// Parameters of a cluster sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOptions {
    pub ks: Vec<usize>,
    pub seed: u64,
    pub max_iterations: usize,
    pub sample_size: usize,
}

impl Default for SweepOptions {
    fn default() -> Self {
        SweepOptions {
            ks: DEFAULT_SWEEP.to_vec(),
            seed: DEFAULT_SEED,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

/// Clusters `space` once per k and samples members of every cluster.
pub fn cluster_report(
    store: &EmbeddingStore,
    space: &str,
    options: &SweepOptions,
) -> MiseResult<Vec<ClusterReport>> {
    let matrix = store.get(space)?.matrix();
    kmeans_sweep(matrix, &options.ks, options.seed, options.max_iterations)?
        .into_iter()
        .map(|assignment| report_for(matrix, assignment, options))
        .collect()
}

fn report_for(
    matrix: ArrayView2<f32>,
    assignment: ClusterAssignment,
    options: &SweepOptions,
) -> MiseResult<ClusterReport> {
    let sizes = assignment.cluster_sizes();
    let mut clusters = Vec::with_capacity(assignment.k());
    for (cluster, &size) in sizes.iter().enumerate() {
        let seed = options.seed.wrapping_add(cluster as u64);
        let members = sample_cluster(&assignment, cluster, options.sample_size, seed)?
            .into_iter()
            .map(|item| -> MiseResult<SampledItem> {
                let distance = euclidean_distance(matrix.row(item), assignment.centroids().row(cluster))?;
                Ok(SampledItem { item, distance_to_centroid: distance })
            })
            .collect::<MiseResult<Vec<_>>>()?;
        clusters.push(ClusterSample { cluster, size, members });
    }
    Ok(ClusterReport {
        k: assignment.k(),
        iterations: assignment.iterations(),
        converged: assignment.converged(),
        labels: assignment.labels().to_vec(),
        clusters,
    })
}

/// Projects several spaces onto one shared set of axes, returned per space
/// in the order requested.
pub fn joint_projection(
    store: &EmbeddingStore,
    spaces: &[&str],
    reducer: &Reducer,
    components: usize,
) -> MiseResult<Vec<(String, Array2<f32>)>> {
    let matrices = spaces
        .iter()
        .map(|name| store.get(name).map(|space| space.matrix()))
        .collect::<MiseResult<Vec<_>>>()?;
    let joint = reducer.reduce_joint(&matrices, components)?;
    Ok(spaces
        .iter()
        .map(|name| name.to_string())
        .zip(joint.segments)
        .collect())
}
