//! Bulk loading of embedding matrices from disk.
//!
//! Two flat layouts are understood: raw little-endian `f32` rows with the row
//! count implied by the file length, and NumPy `.npy` arrays. A corpus
//! directory lists its spaces in a `spaces.json` manifest.

pub mod flat_matrix;
pub mod manifest;
pub mod npy;

pub use flat_matrix::{load_raw_f32, write_raw_f32};
pub use manifest::{load_store, MatrixFormat, SpaceEntry, SpaceManifest, MANIFEST_FILE};
pub use npy::{load_npy, write_npy};

use std::fs::File;
use std::path::Path;

use memmap2::{Mmap, MmapOptions};

use crate::error::{MiseError, MiseResult};

/// Read-only map of a whole file. `None` for an empty file, which cannot be mapped.
pub(crate) fn map_file(path: &Path) -> MiseResult<Option<Mmap>> {
    let file = File::open(path).map_err(|e| MiseError::IoError { path: path.to_path_buf(), source: e })?;
    let len = file
        .metadata()
        .map_err(|e| MiseError::IoError { path: path.to_path_buf(), source: e })?
        .len();
    if len == 0 {
        return Ok(None);
    }
    // Safe as long as the file is not truncated while mapped; the bytes are
    // copied out before the map is dropped.
    let mmap = unsafe { MmapOptions::new().map(&file) }
        .map_err(|e| MiseError::IoError { path: path.to_path_buf(), source: e })?;
    Ok(Some(mmap))
}

/// Decodes little-endian `f32` values regardless of host byte order or alignment.
pub(crate) fn decode_f32_le(bytes: &[u8]) -> Vec<f32> {
    bytemuck::pod_collect_to_vec::<u8, u32>(bytes)
        .into_iter()
        .map(|bits| f32::from_bits(u32::from_le(bits)))
        .collect()
}

/// Decodes little-endian `f64` values, narrowing them to `f32`.
pub(crate) fn decode_f64_le(bytes: &[u8]) -> Vec<f32> {
    bytemuck::pod_collect_to_vec::<u8, u64>(bytes)
        .into_iter()
        .map(|bits| f64::from_bits(u64::from_le(bits)) as f32)
        .collect()
}

/// Little-endian bytes of `values`.
pub(crate) fn encode_f32_le<'a>(values: impl Iterator<Item = &'a f32>) -> Vec<u8> {
    let words: Vec<u32> = values.map(|v| v.to_bits().to_le()).collect();
    bytemuck::cast_slice::<u32, u8>(&words).to_vec()
}

#[cfg(test)]
mod flat_matrix_tests;

#[cfg(test)]
mod npy_tests;
