use ndarray::Array1;
use serde::{Serialize, Deserialize};

/// Row position of an item. Row `i` refers to the same catalog item in every space.
pub type ItemIndex = usize;

/// A single embedding vector, e.g. an encoded query.
/// Uses `ndarray::Array1<f32>` for efficient numerical operations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Array1<f32>);

impl Embedding {
    /// Number of dimensions of this vector.
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }
}

impl std::ops::Deref for Embedding {
    type Target = Array1<f32>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(vec: Vec<f32>) -> Self {
        Embedding(Array1::from(vec))
    }
}

impl From<Embedding> for Vec<f32> {
    fn from(embedding: Embedding) -> Self {
        embedding.0.to_vec()
    }
}
