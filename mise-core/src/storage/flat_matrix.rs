use std::fs;
use std::mem::size_of;
use std::path::Path;

use ndarray::{Array2, ArrayView2};
use tracing::debug;

use crate::error::{MiseError, MiseResult};
use super::{decode_f32_le, encode_f32_le, map_file};

/// Loads a raw row-major matrix of little-endian `f32` values.
///
/// The file carries no header; the row count is `file_len / (dimensions * 4)`
/// and the length must divide evenly.
pub fn load_raw_f32(path: &Path, dimensions: usize) -> MiseResult<Array2<f32>> {
    if dimensions == 0 {
        return Err(MiseError::Configuration("Dimensions must be greater than 0".to_string()));
    }
    let row_bytes = dimensions.checked_mul(size_of::<f32>()).ok_or_else(|| {
        MiseError::Configuration(format!("Dimensions {} are too large to address", dimensions))
    })?;

    let Some(mmap) = map_file(path)? else {
        return Ok(Array2::zeros((0, dimensions)));
    };
    if mmap.len() % row_bytes != 0 {
        return Err(MiseError::StorageError(format!(
            "{:?} holds {} bytes, not a whole number of {}-dimensional f32 rows",
            path,
            mmap.len(),
            dimensions
        )));
    }
    let rows = mmap.len() / row_bytes;
    let values = decode_f32_le(&mmap[..]);
    debug!(path = ?path, rows, dimensions, "Loaded raw f32 matrix");

    Array2::from_shape_vec((rows, dimensions), values)
        .map_err(|e| MiseError::StorageError(format!("Failed to shape matrix from {:?}: {}", path, e)))
}

/// Writes `matrix` as raw little-endian `f32` rows, the layout [`load_raw_f32`] reads.
pub fn write_raw_f32(path: &Path, matrix: ArrayView2<f32>) -> MiseResult<()> {
    // `iter()` walks logical row-major order whatever the memory layout.
    let bytes = encode_f32_le(matrix.iter());
    fs::write(path, bytes).map_err(|e| MiseError::IoError { path: path.to_path_buf(), source: e })
}
