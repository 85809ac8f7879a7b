//! Named, row-aligned embedding matrices.
//!
//! An [`EmbeddingStore`] is populated once at session start and then shared
//! read-only (typically behind an `Arc`) with every search and analysis call.

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::Serialize;
use tracing::debug;

use crate::error::{MiseError, MiseResult};
use crate::vector::ItemIndex;

/// The spaces a recipe corpus is embedded into.
pub const CANONICAL_SPACES: [&str; 4] = ["title", "ingredients", "instructions", "all"];

/// Maps a search-type label shown in a front end onto a space name.
///
/// Unrecognised labels fall back to the combined `all` space.
pub fn space_for_label(label: &str) -> &'static str {
    match label {
        "Title Only" => "title",
        "Ingredients Only" => "ingredients",
        "Instructions Only" => "instructions",
        _ => "all",
    }
}

/// One named N x D matrix. Row `i` is the embedding of item `i`.
#[derive(Debug, Clone)]
pub struct EmbeddingSpace {
    name: String,
    matrix: Array2<f32>,
}

impl EmbeddingSpace {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matrix(&self) -> ArrayView2<'_, f32> {
        self.matrix.view()
    }

    pub fn row(&self, item: ItemIndex) -> Option<ArrayView1<'_, f32>> {
        (item < self.rows()).then(|| self.matrix.row(item))
    }

    pub fn rows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn dimensions(&self) -> usize {
        self.matrix.ncols()
    }
}

/// Summary of a registered space, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceInfo {
    pub name: String,
    pub dimensions: usize,
    pub rows: usize,
}

/// Holds one or more named spaces sharing the same row count and row-to-item mapping.
#[derive(Debug, Default)]
pub struct EmbeddingStore {
    spaces: BTreeMap<String, EmbeddingSpace>,
}

impl EmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `matrix` under `name`.
    ///
    /// Fails with `DimensionMismatch` when the row count differs from the spaces
    /// already registered, and with `AlreadyExists` when the name is taken.
    pub fn register(&mut self, name: impl Into<String>, matrix: Array2<f32>) -> MiseResult<()> {
        let name = name.into();
        if self.spaces.contains_key(&name) {
            return Err(MiseError::AlreadyExists(name));
        }
        if let Some(existing) = self.spaces.values().next() {
            if existing.rows() != matrix.nrows() {
                return Err(MiseError::DimensionMismatch {
                    expected: existing.rows(),
                    actual: matrix.nrows(),
                });
            }
        }
        if matrix.ncols() == 0 {
            return Err(MiseError::InvalidArgument(format!(
                "space '{}' must have at least one column",
                name
            )));
        }
        debug!(space = %name, rows = matrix.nrows(), dimensions = matrix.ncols(), "Registered embedding space");
        self.spaces.insert(name.clone(), EmbeddingSpace { name, matrix });
        Ok(())
    }

    pub fn get(&self, name: &str) -> MiseResult<&EmbeddingSpace> {
        self.spaces
            .get(name)
            .ok_or_else(|| MiseError::UnknownSpace(name.to_string()))
    }

    /// Item count shared by all spaces, 0 while the store is empty.
    pub fn row_count(&self) -> usize {
        self.spaces.values().next().map_or(0, EmbeddingSpace::rows)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.spaces.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }

    /// Registered spaces in name order.
    pub fn spaces(&self) -> impl Iterator<Item = &EmbeddingSpace> {
        self.spaces.values()
    }

    pub fn describe(&self) -> Vec<SpaceInfo> {
        self.spaces()
            .map(|space| SpaceInfo {
                name: space.name.clone(),
                dimensions: space.dimensions(),
                rows: space.rows(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_empty_store_has_zero_rows() {
        let store = EmbeddingStore::new();
        assert_eq!(store.row_count(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_register_and_get() {
        let mut store = EmbeddingStore::new();
        store.register("title", array![[1.0, 0.0], [0.0, 1.0]]).unwrap();
        store.register("all", Array2::zeros((2, 5))).unwrap();

        assert_eq!(store.row_count(), 2);
        let title = store.get("title").unwrap();
        assert_eq!(title.dimensions(), 2);
        assert_eq!(title.row(1).unwrap().to_vec(), vec![0.0, 1.0]);
        assert!(title.row(2).is_none());
        assert_eq!(store.get("all").unwrap().dimensions(), 5);
    }

    #[test]
    fn test_row_count_alignment_is_enforced() {
        let mut store = EmbeddingStore::new();
        store.register("title", Array2::zeros((3, 4))).unwrap();
        let err = store.register("ingredients", Array2::zeros((2, 4))).unwrap_err();
        assert!(matches!(err, MiseError::DimensionMismatch { expected: 3, actual: 2 }));
        // Different dimensionality is fine as long as rows line up
        store.register("instructions", Array2::zeros((3, 8))).unwrap();
        assert!(store.spaces().all(|s| s.rows() == store.row_count()));
    }

    #[test]
    fn test_unknown_space() {
        let store = EmbeddingStore::new();
        assert!(matches!(store.get("title"), Err(MiseError::UnknownSpace(name)) if name == "title"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut store = EmbeddingStore::new();
        store.register("title", Array2::zeros((1, 2))).unwrap();
        assert!(matches!(store.register("title", Array2::zeros((1, 2))), Err(MiseError::AlreadyExists(_))));
    }

    #[test]
    fn test_describe_lists_in_name_order() {
        let mut store = EmbeddingStore::new();
        store.register("title", Array2::zeros((2, 3))).unwrap();
        store.register("all", Array2::zeros((2, 4))).unwrap();
        let names: Vec<String> = store.describe().into_iter().map(|info| info.name).collect();
        assert_eq!(names, vec!["all".to_string(), "title".to_string()]);
    }

    #[test]
    fn test_space_for_label() {
        assert_eq!(space_for_label("Title Only"), "title");
        assert_eq!(space_for_label("Ingredients Only"), "ingredients");
        assert_eq!(space_for_label("Instructions Only"), "instructions");
        assert_eq!(space_for_label("All"), "all");
        assert!(CANONICAL_SPACES.contains(&space_for_label("anything")));
    }
}
