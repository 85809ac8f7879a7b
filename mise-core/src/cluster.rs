//! K-means clustering (Lloyd's algorithm) over an embedding matrix.
//!
//! # Algorithm
//! 1. Seeded k-means++ picks k distinct rows as initial centroids
//! 2. Assign each row to the nearest centroid (squared Euclidean distance,
//!    ties go to the lower centroid id)
//! 3. Recompute each centroid as the mean of its rows
//! 4. Repeat until no assignment changes or `max_iterations` is reached
//!
//! # Empty clusters
//! When an update finds a cluster with no rows, the row farthest from its own
//! centroid among clusters with more than one member is moved into it (ties go
//! to the lower item index). Every returned cluster is therefore non-empty.
//!
//! With duplicate rows two centroids can coincide. Assignment then leaves one
//! of them empty on every pass, the re-seed moves a duplicate back, and the
//! labels never settle: the run stops at `max_iterations` with
//! `converged == false`. The result is still deterministic.

use ndarray::{Array2, ArrayView2};
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use tracing::debug;

use crate::config::KMeansConfig;
use crate::distance::squared_l2;
use crate::error::{MiseError, MiseResult};
use crate::utils::create_rng;
use crate::vector::ItemIndex;

/// Cluster id of every item plus the k centroids.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    labels: Vec<usize>,
    centroids: Array2<f32>,
    iterations: usize,
    converged: bool,
}

impl ClusterAssignment {
    /// Builds an assignment from externally computed labels; centroids are the
    /// member means (zero for a cluster without members).
    pub fn from_labels(matrix: ArrayView2<f32>, labels: Vec<usize>, k: usize) -> MiseResult<Self> {
        if labels.len() != matrix.nrows() {
            return Err(MiseError::DimensionMismatch { expected: matrix.nrows(), actual: labels.len() });
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= k) {
            return Err(MiseError::InvalidArgument(format!("cluster id {} is not below k = {}", bad, k)));
        }
        Ok(ClusterAssignment {
            centroids: member_means(matrix, &labels, k),
            labels,
            iterations: 0,
            converged: true,
        })
    }

    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }

    /// Cluster id per item index.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn label_of(&self, item: ItemIndex) -> Option<usize> {
        self.labels.get(item).copied()
    }

    /// Centroid vectors, one per row.
    pub fn centroids(&self) -> ArrayView2<'_, f32> {
        self.centroids.view()
    }

    /// Lloyd iterations performed.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// False when the iteration cap stopped refinement.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Items assigned to `cluster`, in ascending index order.
    pub fn members(&self, cluster: usize) -> Vec<ItemIndex> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == cluster)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k()];
        for &l in &self.labels {
            sizes[l] += 1;
        }
        sizes
    }

    /// Sum of squared distances from each row to its centroid.
    pub fn inertia(&self, matrix: ArrayView2<f32>) -> MiseResult<f64> {
        if matrix.dim() != (self.labels.len(), self.centroids.ncols()) {
            return Err(MiseError::DimensionMismatch {
                expected: self.labels.len() * self.centroids.ncols(),
                actual: matrix.len(),
            });
        }
        Ok(self
            .labels
            .iter()
            .enumerate()
            .map(|(i, &l)| squared_l2(matrix.row(i), self.centroids.row(l)) as f64)
            .sum())
    }
}

/// Partitions the rows of `matrix` into `config.k` clusters.
///
/// Fails with `InvalidClusterCount` unless `1 <= k <= N`. The same matrix and
/// config always produce the same assignment.
pub fn kmeans(matrix: ArrayView2<f32>, config: &KMeansConfig) -> MiseResult<ClusterAssignment> {
    let n = matrix.nrows();
    let k = config.k;
    if k == 0 || k > n {
        return Err(MiseError::InvalidClusterCount { requested: k, max: n });
    }
    config.validate()?;

    let mut centroids = kmeans_plus_plus(matrix, k, config.seed);
    let (mut labels, mut distances) = assign(matrix, &centroids);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;
        centroids = update_centroids(matrix, &mut labels, &distances, k);
        let (new_labels, new_distances) = assign(matrix, &centroids);
        let changed = new_labels != labels;
        labels = new_labels;
        distances = new_distances;
        if !changed {
            converged = true;
            break;
        }
    }
    // Centroids must be the means of the final labels, also when the cap hit.
    centroids = update_centroids(matrix, &mut labels, &distances, k);

    debug!(k, iterations, converged, "k-means finished");
    Ok(ClusterAssignment { labels, centroids, iterations, converged })
}

/// Runs [`kmeans`] once per entry of `ks` with the same seed and cap.
/// Every k is validated before any clustering starts.
pub fn kmeans_sweep(
    matrix: ArrayView2<f32>,
    ks: &[usize],
    seed: u64,
    max_iterations: usize,
) -> MiseResult<Vec<ClusterAssignment>> {
    let n = matrix.nrows();
    if let Some(&bad) = ks.iter().find(|&&k| k == 0 || k > n) {
        return Err(MiseError::InvalidClusterCount { requested: bad, max: n });
    }
    ks.iter()
        .map(|&k| kmeans(matrix, &KMeansConfig::new(k, seed, max_iterations)))
        .collect()
}

/// Draws up to `count` distinct members of `cluster` with a seeded generator.
///
/// Fails with `EmptyCluster` when the cluster has no members and `count > 0`.
pub fn sample_cluster(
    assignment: &ClusterAssignment,
    cluster: usize,
    count: usize,
    seed: u64,
) -> MiseResult<Vec<ItemIndex>> {
    if cluster >= assignment.k() {
        return Err(MiseError::InvalidArgument(format!(
            "cluster id {} is not below k = {}",
            cluster,
            assignment.k()
        )));
    }
    if count == 0 {
        return Ok(Vec::new());
    }
    let members = assignment.members(cluster);
    if members.is_empty() {
        return Err(MiseError::EmptyCluster(cluster));
    }
    let mut rng = create_rng(Some(seed));
    Ok(members.choose_multiple(&mut rng, count).copied().collect())
}

/// Seeded k-means++: each next centroid is a row drawn with probability
/// proportional to its squared distance from the nearest chosen centroid.
fn kmeans_plus_plus(matrix: ArrayView2<f32>, k: usize, seed: u64) -> Array2<f32> {
    let n = matrix.nrows();
    let mut rng = create_rng(Some(seed));
    let mut chosen_flags = vec![false; n];
    let mut chosen = Vec::with_capacity(k);

    let first = rng.gen_range(0..n);
    chosen.push(first);
    chosen_flags[first] = true;
    let mut nearest: Vec<f64> = (0..n)
        .map(|i| squared_l2(matrix.row(i), matrix.row(first)) as f64)
        .collect();

    while chosen.len() < k {
        let total: f64 = (0..n).filter(|&i| !chosen_flags[i]).map(|i| nearest[i]).sum();
        let next = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut acc = 0.0;
            let mut pick = None;
            for i in (0..n).filter(|&i| !chosen_flags[i] && nearest[i] > 0.0) {
                acc += nearest[i];
                pick = Some(i);
                if acc > target {
                    break;
                }
            }
            pick
        } else {
            None
        };
        // Remaining rows all coincide with chosen ones; fall back to a uniform draw.
        let next = match next {
            Some(i) => i,
            None => {
                let remaining: Vec<usize> = (0..n).filter(|&i| !chosen_flags[i]).collect();
                remaining[rng.gen_range(0..remaining.len())]
            }
        };

        chosen.push(next);
        chosen_flags[next] = true;
        for i in 0..n {
            let d = squared_l2(matrix.row(i), matrix.row(next)) as f64;
            if d < nearest[i] {
                nearest[i] = d;
            }
        }
    }

    let mut centroids = Array2::zeros((k, matrix.ncols()));
    for (c, &row) in chosen.iter().enumerate() {
        centroids.row_mut(c).assign(&matrix.row(row));
    }
    centroids
}

/// Nearest centroid and squared distance for every row.
fn assign(matrix: ArrayView2<f32>, centroids: &Array2<f32>) -> (Vec<usize>, Vec<f32>) {
    (0..matrix.nrows())
        .into_par_iter()
        .map(|i| {
            let row = matrix.row(i);
            let mut best = 0;
            let mut best_dist = f32::INFINITY;
            for (c, centroid) in centroids.rows().into_iter().enumerate() {
                let d = squared_l2(row, centroid);
                if d < best_dist {
                    best = c;
                    best_dist = d;
                }
            }
            (best, best_dist)
        })
        .unzip()
}

/// Re-seeds empty clusters (see module docs), then returns the member means.
fn update_centroids(
    matrix: ArrayView2<f32>,
    labels: &mut [usize],
    distances: &[f32],
    k: usize,
) -> Array2<f32> {
    let mut sizes = vec![0usize; k];
    for &l in labels.iter() {
        sizes[l] += 1;
    }
    let mut moved = vec![false; labels.len()];

    for cluster in 0..k {
        if sizes[cluster] > 0 {
            continue;
        }
        let mut donor: Option<usize> = None;
        for i in 0..labels.len() {
            if moved[i] || sizes[labels[i]] < 2 {
                continue;
            }
            if donor.map_or(true, |d| distances[i] > distances[d]) {
                donor = Some(i);
            }
        }
        // k <= N guarantees some cluster holds two rows while another is empty.
        if let Some(i) = donor {
            debug!(cluster, item = i, "Re-seeding empty cluster");
            sizes[labels[i]] -= 1;
            labels[i] = cluster;
            sizes[cluster] = 1;
            moved[i] = true;
        }
    }

    member_means(matrix, labels, k)
}

fn member_means(matrix: ArrayView2<f32>, labels: &[usize], k: usize) -> Array2<f32> {
    let d = matrix.ncols();
    let mut sums = Array2::<f64>::zeros((k, d));
    let mut counts = vec![0usize; k];
    for (i, &l) in labels.iter().enumerate() {
        counts[l] += 1;
        for (s, &x) in sums.row_mut(l).iter_mut().zip(matrix.row(i).iter()) {
            *s += x as f64;
        }
    }
    let mut centroids = Array2::<f32>::zeros((k, d));
    for c in 0..k {
        if counts[c] == 0 {
            continue;
        }
        let count = counts[c] as f64;
        for (dst, &s) in centroids.row_mut(c).iter_mut().zip(sums.row(c).iter()) {
            *dst = (s / count) as f32;
        }
    }
    centroids
}
