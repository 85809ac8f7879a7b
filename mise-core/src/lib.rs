pub mod analytics;
pub mod cluster;
pub mod collaborators;
pub mod config;
pub mod distance;
pub mod error;
pub mod linalg;
pub mod reduce;
pub mod search;
pub mod storage;
pub mod store;
pub mod vector;
pub mod utils; // Public for benchmarks/tests

// Re-export key types for easier use
pub use cluster::{kmeans, kmeans_sweep, sample_cluster, ClusterAssignment};
pub use collaborators::{Catalog, Encoder};
pub use config::{KMeansConfig, TsneConfig};
pub use error::{MiseError, MiseResult};
pub use reduce::{Pca, ReducedCoordinates, Reducer, ReductionMethod};
pub use search::{top_k, ScoredItem, SimilarityResult, DEFAULT_TOP_K};
pub use store::{EmbeddingSpace, EmbeddingStore, SpaceInfo};
pub use vector::{Embedding, ItemIndex};
