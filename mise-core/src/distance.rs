//! Similarity and distance functions over embedding rows.

use ndarray::ArrayView1;
use crate::error::{MiseError, MiseResult};

/// Cosine similarity between two vectors, range [-1, 1].
///
/// Returns `MiseError::DimensionMismatch` if the vectors have different
/// lengths. A zero vector on either side yields 0.0 rather than an error.
pub fn cosine_similarity(v1: ArrayView1<f32>, v2: ArrayView1<f32>) -> MiseResult<f32> {
    check_lengths(v1, v2)?;
    Ok(cosine_with_norm(v1, norm_f64(v1), v2))
}

/// Euclidean (L2) distance between two vectors.
pub fn euclidean_distance(v1: ArrayView1<f32>, v2: ArrayView1<f32>) -> MiseResult<f32> {
    check_lengths(v1, v2)?;
    Ok(squared_l2(v1, v2).sqrt())
}

fn check_lengths(v1: ArrayView1<f32>, v2: ArrayView1<f32>) -> MiseResult<()> {
    if v1.len() != v2.len() {
        return Err(MiseError::DimensionMismatch {
            expected: v1.len(),
            actual: v2.len(),
        });
    }
    Ok(())
}

/// Euclidean norm accumulated in `f64`, so no finite `f32` row under- or overflows.
#[inline]
pub(crate) fn norm_f64(v: ArrayView1<f32>) -> f64 {
    v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt()
}

/// Cosine similarity where the norm of `query` is already known.
///
/// Accumulates in `f64`. A zero norm on either side yields 0.0, and the result
/// is never `-0.0`. The caller guarantees equal lengths.
#[inline]
pub(crate) fn cosine_with_norm(query: ArrayView1<f32>, query_norm: f64, v: ArrayView1<f32>) -> f32 {
    let norm_v = norm_f64(v);
    if query_norm == 0.0 || norm_v == 0.0 {
        return 0.0;
    }
    let dot: f64 = query.iter().zip(v.iter()).map(|(&a, &b)| a as f64 * b as f64).sum();
    // Clamp so rounding never pushes the score outside [-1, 1]
    let score = (dot / (query_norm * norm_v)).clamp(-1.0, 1.0) as f32;
    // Adding +0.0 turns -0.0 into +0.0 so ties rank by item index
    score + 0.0
}

/// Squared Euclidean distance. The caller guarantees equal lengths.
#[inline]
pub(crate) fn squared_l2(v1: ArrayView1<f32>, v2: ArrayView1<f32>) -> f32 {
    v1.iter()
        .zip(v2.iter())
        .map(|(a, b)| {
            let d = a - b;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_cosine_similarity() {
        let v1 = arr1(&[1.0, 2.0, 3.0]);
        let v2 = arr1(&[1.0, 2.0, 3.0]);
        let v3 = arr1(&[-1.0, -2.0, -3.0]);
        let v4 = arr1(&[2.0, 4.0, 6.0]);
        let v5 = arr1(&[1.0, 0.0, 0.0]);
        let v6 = arr1(&[0.0, 1.0, 0.0]);
        let zero = arr1(&[0.0, 0.0, 0.0]);

        assert!((cosine_similarity(v1.view(), v2.view()).unwrap() - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(v1.view(), v3.view()).unwrap() + 1.0).abs() < 1e-6);
        assert!((cosine_similarity(v1.view(), v4.view()).unwrap() - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(v5.view(), v6.view()).unwrap().abs() < 1e-6);
        assert_eq!(cosine_similarity(v1.view(), zero.view()).unwrap(), 0.0);
        assert_eq!(cosine_similarity(zero.view(), zero.view()).unwrap(), 0.0);
    }

    #[test]
    fn test_l2_distance() {
        let v1 = arr1(&[1.0, 2.0, 3.0]);
        let v3 = arr1(&[4.0, 6.0, 8.0]);

        assert!(euclidean_distance(v1.view(), v1.view()).unwrap().abs() < 1e-6);
        assert!((euclidean_distance(v1.view(), v3.view()).unwrap() - 50.0f32.sqrt()).abs() < 1e-6);
        assert!((squared_l2(v1.view(), v3.view()) - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_extreme_magnitudes() {
        let tiny = arr1(&[1e-30f32, 0.0]);
        assert!((cosine_similarity(tiny.view(), tiny.view()).unwrap() - 1.0).abs() < 1e-6);

        let huge = arr1(&[1e20f32, 1e20]);
        let axis = arr1(&[1e20f32, 0.0]);
        let score = cosine_similarity(huge.view(), axis.view()).unwrap();
        assert!((score - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_score_is_positive_zero() {
        let score = cosine_similarity(arr1(&[-1.0f32, 0.0]).view(), arr1(&[0.0f32, 1.0]).view()).unwrap();
        assert_eq!(score, 0.0);
        assert!(score.is_sign_positive());
    }

    #[test]
    fn test_dimension_mismatch() {
        let v1 = arr1(&[1.0, 2.0]);
        let v2 = arr1(&[1.0, 2.0, 3.0]);

        assert!(matches!(
            cosine_similarity(v1.view(), v2.view()),
            Err(MiseError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }
}
