//! Exact top-k cosine similarity search over one embedding space.
//!
//! Every call rescans the whole space (O(N·D)); there is no index to build or
//! keep in sync. Row scores are computed in parallel and the selection is
//! sequential, so results do not depend on thread scheduling.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use ndarray::ArrayView1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::distance::{cosine_with_norm, norm_f64};
use crate::error::{MiseError, MiseResult};
use crate::store::{EmbeddingSpace, EmbeddingStore};
use crate::vector::ItemIndex;

/// Result count the recipe search form shows.
pub const DEFAULT_TOP_K: usize = 5;

/// A single ranked hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item: ItemIndex,
    pub score: f32,
}

/// Hits in descending score order, at most k long.
pub type SimilarityResult = Vec<ScoredItem>;

/// Heap entry ordered so that "greater" means "ranks first":
/// higher score, then lower item index.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Neighbor {
    score: f32,
    item: ItemIndex,
}

impl Eq for Neighbor {}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.item.cmp(&self.item))
    }
}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Returns the `k` rows of `space_name` most similar to `query`.
///
/// Fails with `UnknownSpace`, with `InvalidArgument` for `k == 0`, and with
/// `DimensionMismatch` when the query length differs from the space's
/// dimensionality. A `k` larger than the item count is clamped.
pub fn top_k(
    store: &EmbeddingStore,
    space_name: &str,
    query: ArrayView1<f32>,
    k: usize,
) -> MiseResult<SimilarityResult> {
    let space = store.get(space_name)?;
    top_k_in_space(space, query, k)
}

/// Same as [`top_k`] for a space already looked up.
pub fn top_k_in_space(
    space: &EmbeddingSpace,
    query: ArrayView1<f32>,
    k: usize,
) -> MiseResult<SimilarityResult> {
    if k == 0 {
        return Err(MiseError::InvalidArgument("k must be at least 1".to_string()));
    }
    if query.len() != space.dimensions() {
        return Err(MiseError::DimensionMismatch {
            expected: space.dimensions(),
            actual: query.len(),
        });
    }

    let matrix = space.matrix();
    let query_norm = norm_f64(query);
    let scores: Vec<f32> = (0..matrix.nrows())
        .into_par_iter()
        .map(|i| cosine_with_norm(query, query_norm, matrix.row(i)))
        .collect();

    Ok(select_top(scores, k))
}

/// Keeps the `k` best entries in a bounded min-heap whose root is the current worst.
fn select_top(scores: Vec<f32>, k: usize) -> SimilarityResult {
    let k = k.min(scores.len());
    let mut heap: BinaryHeap<Reverse<Neighbor>> = BinaryHeap::with_capacity(k + 1);

    for (item, score) in scores.into_iter().enumerate() {
        let candidate = Neighbor { score, item };
        if heap.len() < k {
            heap.push(Reverse(candidate));
        } else if let Some(Reverse(worst)) = heap.peek() {
            if candidate > *worst {
                heap.pop();
                heap.push(Reverse(candidate));
            }
        }
    }

    let mut ranked: Vec<Neighbor> = heap.into_iter().map(|Reverse(n)| n).collect();
    ranked.sort_by(|a, b| b.cmp(a));
    ranked
        .into_iter()
        .map(|n| ScoredItem { item: n.item, score: n.score })
        .collect()
}
