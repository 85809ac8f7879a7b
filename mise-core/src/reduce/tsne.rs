//! Exact t-distributed stochastic neighbour embedding.
//!
//! Affinities and gradients are computed over all N² pairs, so memory and time
//! grow quadratically with the item count. The layout depends on the seed only;
//! rows are processed in parallel but every per-row sum runs in a fixed order.

use ndarray::{Array2, ArrayView2, Axis, Zip};
use rand::Rng;
use rayon::prelude::*;
use tracing::debug;

use crate::config::TsneConfig;
use crate::error::{MiseError, MiseResult};
use crate::utils::create_rng;

const PERPLEXITY_TOLERANCE: f64 = 1e-5;
const PERPLEXITY_STEPS: usize = 50;
const MIN_PROBABILITY: f64 = 1e-12;
const MIN_GAIN: f64 = 0.01;
const INITIAL_MOMENTUM: f64 = 0.5;
const FINAL_MOMENTUM: f64 = 0.8;
const INITIAL_SPREAD: f64 = 1e-4;

/// Embeds the rows of `matrix` into `m` dimensions.
pub fn tsne(matrix: ArrayView2<f32>, m: usize, config: &TsneConfig) -> MiseResult<Array2<f32>> {
    config.validate()?;
    let n = matrix.nrows();
    if config.perplexity >= n as f64 {
        return Err(MiseError::InvalidArgument(format!(
            "perplexity {} must be smaller than the number of rows ({})",
            config.perplexity, n
        )));
    }

    let p = joint_probabilities(matrix, config.perplexity);
    let mut y = initial_layout(n, m, config.seed);
    let mut update = Array2::<f64>::zeros((n, m));
    let mut gains = Array2::<f64>::ones((n, m));

    for iteration in 0..config.iterations {
        let exaggeration = if iteration < config.exaggeration_iterations {
            config.early_exaggeration
        } else {
            1.0
        };
        let momentum = if iteration < config.exaggeration_iterations {
            INITIAL_MOMENTUM
        } else {
            FINAL_MOMENTUM
        };

        let grad = gradient(&p, &y, exaggeration);
        let learning_rate = config.learning_rate;
        Zip::from(&mut update)
            .and(&mut gains)
            .and(&grad)
            .for_each(|u, gain, &g| {
                *gain = if (g > 0.0) != (*u > 0.0) {
                    *gain + 0.2
                } else {
                    (*gain * 0.8).max(MIN_GAIN)
                };
                *u = momentum * *u - learning_rate * *gain * g;
            });
        y += &update;

        if let Some(mean) = y.mean_axis(Axis(0)) {
            y -= &mean;
        }
    }
    debug!(rows = n, components = m, iterations = config.iterations, "t-SNE layout finished");

    Ok(y.mapv(|v| v as f32))
}

/// Symmetrised input affinities P (N x N), each conditional row calibrated to
/// the requested perplexity by bisection on the Gaussian precision.
fn joint_probabilities(matrix: ArrayView2<f32>, perplexity: f64) -> Array2<f64> {
    let n = matrix.nrows();
    let target_entropy = perplexity.ln();

    let rows: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let xi = matrix.row(i);
            let distances: Vec<f64> = (0..n)
                .map(|j| {
                    xi.iter()
                        .zip(matrix.row(j).iter())
                        .map(|(a, b)| {
                            let d = (*a - *b) as f64;
                            d * d
                        })
                        .sum()
                })
                .collect();
            conditional_row(i, &distances, target_entropy)
        })
        .collect();

    let mut p = Array2::<f64>::zeros((n, n));
    for (i, row) in rows.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            p[[i, j]] = v;
        }
    }
    let sym = (&p + &p.t()) / (2.0 * n as f64);
    sym.mapv(|v| v.max(MIN_PROBABILITY))
}

fn conditional_row(i: usize, distances: &[f64], target_entropy: f64) -> Vec<f64> {
    let mut beta = 1.0f64;
    let mut beta_min = f64::NEG_INFINITY;
    let mut beta_max = f64::INFINITY;
    let mut row = vec![0.0f64; distances.len()];

    for _ in 0..PERPLEXITY_STEPS {
        let mut sum = 0.0;
        for (j, &d) in distances.iter().enumerate() {
            row[j] = if j == i { 0.0 } else { (-d * beta).exp() };
            sum += row[j];
        }
        if sum == 0.0 {
            // All neighbours underflowed; widen the kernel.
            beta_max = beta;
            beta = if beta_min.is_finite() { (beta + beta_min) / 2.0 } else { beta / 2.0 };
            continue;
        }
        let mut weighted = 0.0;
        for (j, &d) in distances.iter().enumerate() {
            row[j] /= sum;
            weighted += d * row[j];
        }
        let entropy = sum.ln() + beta * weighted;
        let diff = entropy - target_entropy;
        if diff.abs() < PERPLEXITY_TOLERANCE {
            break;
        }
        if diff > 0.0 {
            beta_min = beta;
            beta = if beta_max.is_finite() { (beta + beta_max) / 2.0 } else { beta * 2.0 };
        } else {
            beta_max = beta;
            beta = if beta_min.is_finite() { (beta + beta_min) / 2.0 } else { beta / 2.0 };
        }
    }
    row
}

/// Small Gaussian cloud around the origin (Box-Muller from the seeded generator).
fn initial_layout(n: usize, m: usize, seed: u64) -> Array2<f64> {
    let mut rng = create_rng(Some(seed));
    Array2::from_shape_simple_fn((n, m), || {
        let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = rng.gen();
        INITIAL_SPREAD * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    })
}

/// KL-divergence gradient with Student-t output kernel.
fn gradient(p: &Array2<f64>, y: &Array2<f64>, exaggeration: f64) -> Array2<f64> {
    let (n, m) = y.dim();

    let kernel: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            (0..n)
                .map(|j| {
                    if i == j {
                        return 0.0;
                    }
                    let dist: f64 = (0..m).map(|c| (y[[i, c]] - y[[j, c]]).powi(2)).sum();
                    1.0 / (1.0 + dist)
                })
                .collect()
        })
        .collect();
    let kernel_sum: f64 = kernel.iter().map(|row| row.iter().sum::<f64>()).sum();
    let kernel_sum = kernel_sum.max(f64::MIN_POSITIVE);

    let rows: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut g = vec![0.0f64; m];
            for j in 0..n {
                if i == j {
                    continue;
                }
                let q = kernel[i][j] / kernel_sum;
                let w = (exaggeration * p[[i, j]] - q) * kernel[i][j];
                for (c, gc) in g.iter_mut().enumerate() {
                    *gc += 4.0 * w * (y[[i, c]] - y[[j, c]]);
                }
            }
            g
        })
        .collect();

    let mut grad = Array2::<f64>::zeros((n, m));
    for (i, row) in rows.into_iter().enumerate() {
        for (c, v) in row.into_iter().enumerate() {
            grad[[i, c]] = v;
        }
    }
    grad
}
