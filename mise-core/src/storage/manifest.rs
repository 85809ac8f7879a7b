use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MiseError, MiseResult};
use crate::store::EmbeddingStore;
use super::{load_npy, load_raw_f32};

/// Name of the manifest file inside a corpus directory.
pub const MANIFEST_FILE: &str = "spaces.json";

/// On-disk layout of one space's matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatrixFormat {
    Raw,
    Npy,
}

/// One space listed in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceEntry {
    pub name: String,
    /// Relative to the manifest's directory unless absolute.
    pub file: PathBuf,
    /// Inferred from the file extension when omitted (`.npy`, otherwise raw).
    #[serde(default)]
    pub format: Option<MatrixFormat>,
    /// Required for raw files; checked against the header for `.npy`.
    #[serde(default)]
    pub dimensions: Option<usize>,
}

impl SpaceEntry {
    pub fn format(&self) -> MatrixFormat {
        self.format.unwrap_or_else(|| {
            match self.file.extension().and_then(|ext| ext.to_str()) {
                Some("npy") => MatrixFormat::Npy,
                _ => MatrixFormat::Raw,
            }
        })
    }
}

/// The spaces of one corpus, all derived from the same item order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceManifest {
    pub spaces: Vec<SpaceEntry>,
}

impl SpaceManifest {
    pub fn read(dir: &Path) -> MiseResult<Self> {
        let path = dir.join(MANIFEST_FILE);
        let file = fs::File::open(&path).map_err(|e| MiseError::IoError { path: path.clone(), source: e })?;
        serde_json::from_reader(file)
            .map_err(|e| MiseError::StorageError(format!("Failed to parse manifest {:?}: {}", path, e)))
    }

    pub fn write(&self, dir: &Path) -> MiseResult<()> {
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| MiseError::StorageError(format!("Failed to serialize manifest: {}", e)))?;
        fs::write(&path, json).map_err(|e| MiseError::IoError { path, source: e })
    }
}

/// Loads every space listed in `dir/spaces.json` into a new store.
///
/// Registration enforces that all spaces share one row count.
pub fn load_store(dir: &Path) -> MiseResult<EmbeddingStore> {
    let manifest = SpaceManifest::read(dir)?;
    let mut store = EmbeddingStore::new();

    for entry in &manifest.spaces {
        let path = if entry.file.is_absolute() { entry.file.clone() } else { dir.join(&entry.file) };
        let matrix = match entry.format() {
            MatrixFormat::Raw => {
                let dimensions = entry.dimensions.ok_or_else(|| {
                    MiseError::Configuration(format!("raw space '{}' needs 'dimensions'", entry.name))
                })?;
                load_raw_f32(&path, dimensions)?
            }
            MatrixFormat::Npy => {
                let matrix = load_npy(&path)?;
                if let Some(expected) = entry.dimensions {
                    if expected != matrix.ncols() {
                        return Err(MiseError::DimensionMismatch { expected, actual: matrix.ncols() });
                    }
                }
                matrix
            }
        };
        info!(space = %entry.name, path = ?path, rows = matrix.nrows(), dimensions = matrix.ncols(), "Loaded embedding space");
        store.register(entry.name.clone(), matrix)?;
    }

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{write_npy, write_raw_f32};
    use ndarray::array;
    use tempfile::tempdir;

    #[test]
    fn test_format_inferred_from_extension() {
        let entry = SpaceEntry {
            name: "title".into(),
            file: "title_embeddings.npy".into(),
            format: None,
            dimensions: None,
        };
        assert_eq!(entry.format(), MatrixFormat::Npy);
        let raw = SpaceEntry { file: "title.f32".into(), ..entry.clone() };
        assert_eq!(raw.format(), MatrixFormat::Raw);
        let forced = SpaceEntry { format: Some(MatrixFormat::Raw), ..entry };
        assert_eq!(forced.format(), MatrixFormat::Raw);
    }

    #[test]
    fn test_load_store_from_directory() -> MiseResult<()> {
        let dir = tempdir().unwrap();
        write_npy(&dir.path().join("title.npy"), array![[1.0f32, 0.0], [0.0, 1.0], [0.5, 0.5]].view())?;
        write_raw_f32(&dir.path().join("all.f32"), array![[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]].view())?;

        let manifest: SpaceManifest = serde_json::from_str(
            r#"{"spaces": [
                {"name": "title", "file": "title.npy"},
                {"name": "all", "file": "all.f32", "dimensions": 3}
            ]}"#,
        )
        .unwrap();
        manifest.write(dir.path())?;

        let store = load_store(dir.path())?;
        assert_eq!(store.row_count(), 3);
        assert_eq!(store.get("title")?.dimensions(), 2);
        assert_eq!(store.get("all")?.row(2).unwrap().to_vec(), vec![7.0, 8.0, 9.0]);
        Ok(())
    }

    #[test]
    fn test_misaligned_spaces_are_rejected() -> MiseResult<()> {
        let dir = tempdir().unwrap();
        write_npy(&dir.path().join("title.npy"), array![[1.0f32], [2.0], [3.0]].view())?;
        write_npy(&dir.path().join("ingredients.npy"), array![[1.0f32], [2.0]].view())?;
        SpaceManifest {
            spaces: vec![
                SpaceEntry { name: "title".into(), file: "title.npy".into(), format: None, dimensions: None },
                SpaceEntry { name: "ingredients".into(), file: "ingredients.npy".into(), format: None, dimensions: None },
            ],
        }
        .write(dir.path())?;

        assert!(matches!(load_store(dir.path()), Err(MiseError::DimensionMismatch { expected: 3, actual: 2 })));
        Ok(())
    }

    #[test]
    fn test_raw_space_without_dimensions() -> MiseResult<()> {
        let dir = tempdir().unwrap();
        SpaceManifest {
            spaces: vec![SpaceEntry { name: "all".into(), file: "all.f32".into(), format: None, dimensions: None }],
        }
        .write(dir.path())?;
        assert!(matches!(load_store(dir.path()), Err(MiseError::Configuration(_))));
        Ok(())
    }

    #[test]
    fn test_missing_manifest() {
        let dir = tempdir().unwrap();
        assert!(matches!(load_store(dir.path()), Err(MiseError::IoError { .. })));
    }
}
