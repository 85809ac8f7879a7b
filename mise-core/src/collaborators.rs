//! Contracts for the external parts of a search session: the text encoder that
//! turns a query into a vector, and the catalog that owns item content.

use async_trait::async_trait;

use crate::error::{MiseError, MiseResult};
use crate::search::{top_k, SimilarityResult};
use crate::store::EmbeddingStore;
use crate::vector::{Embedding, ItemIndex};

/// Produces a query vector from raw text. Implementations typically wrap a
/// pretrained language model running locally or behind a remote API.
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(&self, text: &str) -> MiseResult<Embedding>;

    /// Dimensionality of the vectors this encoder produces.
    fn dimensions(&self) -> usize;
}

/// Resolves item indices to displayable records.
pub trait Catalog: Send + Sync {
    type Record;

    fn item_at(&self, index: ItemIndex) -> Option<Self::Record>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Encodes `text` and searches `space` with it.
pub async fn search_text<E: Encoder + ?Sized>(
    encoder: &E,
    store: &EmbeddingStore,
    space: &str,
    text: &str,
    k: usize,
) -> MiseResult<SimilarityResult> {
    // Fail on an unknown space before paying for the encoder call.
    store.get(space)?;
    let query = encoder.encode(text).await?;
    top_k(store, space, query.view(), k)
}

/// Pairs each hit with its catalog record.
///
/// A hit the catalog cannot resolve means catalog and store are misaligned,
/// which is reported as a `DimensionMismatch` on the item count.
pub fn resolve_items<C: Catalog>(
    catalog: &C,
    results: &SimilarityResult,
) -> MiseResult<Vec<(C::Record, f32)>> {
    results
        .iter()
        .map(|hit| {
            catalog
                .item_at(hit.item)
                .map(|record| (record, hit.score))
                .ok_or(MiseError::DimensionMismatch {
                    expected: hit.item + 1,
                    actual: catalog.len(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Maps a few keywords onto fixed axes.
    struct KeywordEncoder;

    #[async_trait]
    impl Encoder for KeywordEncoder {
        async fn encode(&self, text: &str) -> MiseResult<Embedding> {
            let mut v = vec![0.0f32; 3];
            for word in text.split_whitespace() {
                match word {
                    "pasta" => v[0] += 1.0,
                    "salad" => v[1] += 1.0,
                    "cake" => v[2] += 1.0,
                    _ => {}
                }
            }
            Ok(Embedding::from(v))
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    struct Titles(Vec<&'static str>);

    impl Catalog for Titles {
        type Record = &'static str;

        fn item_at(&self, index: ItemIndex) -> Option<Self::Record> {
            self.0.get(index).copied()
        }

        fn len(&self) -> usize {
            self.0.len()
        }
    }

    fn store() -> EmbeddingStore {
        let mut store = EmbeddingStore::new();
        store
            .register("title", array![[0.9f32, 0.1, 0.0], [0.0, 1.0, 0.1], [0.1, 0.0, 1.0]])
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_search_text_and_resolve() {
        let store = store();
        let catalog = Titles(vec!["Carbonara", "Caesar Salad", "Lemon Cake"]);

        let hits = search_text(&KeywordEncoder, &store, "title", "chocolate cake", 1).await.unwrap();
        assert_eq!(hits[0].item, 2);

        let records = resolve_items(&catalog, &hits).unwrap();
        assert_eq!(records[0].0, "Lemon Cake");
    }

    #[tokio::test]
    async fn test_search_text_dimension_mismatch() {
        let mut store = EmbeddingStore::new();
        store.register("title", array![[1.0f32, 0.0]]).unwrap();
        let err = search_text(&KeywordEncoder, &store, "title", "pasta", 1).await.unwrap_err();
        assert!(matches!(err, MiseError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[tokio::test]
    async fn test_search_text_unknown_space() {
        let err = search_text(&KeywordEncoder, &store(), "ingredients", "pasta", 1).await.unwrap_err();
        assert!(matches!(err, MiseError::UnknownSpace(_)));
    }

    #[test]
    fn test_resolve_reports_misaligned_catalog() {
        let hits = vec![crate::search::ScoredItem { item: 4, score: 0.5 }];
        let catalog = Titles(vec!["Carbonara"]);
        assert!(matches!(
            resolve_items(&catalog, &hits),
            Err(MiseError::DimensionMismatch { expected: 5, actual: 1 })
        ));
    }
}
