use std::fs;
use std::path::Path;

use ndarray::{Array2, ArrayView2};
use tracing::debug;

use crate::error::{MiseError, MiseResult};
use super::{decode_f32_le, decode_f64_le, encode_f32_le, map_file};

const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";
/// Magic, version and the 2-byte header length of a version 1.0 file.
const V1_PREAMBLE: usize = 10;
/// Version 2.0 and 3.0 use a 4-byte header length.
const V2_PREAMBLE: usize = 12;
const HEADER_ALIGNMENT: usize = 64;

/// Element types the loader accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dtype {
    F32,
    F64,
}

impl Dtype {
    fn size(self) -> usize {
        match self {
            Dtype::F32 => 4,
            Dtype::F64 => 8,
        }
    }
}

/// Parsed `.npy` header dictionary.
#[derive(Debug, PartialEq, Eq)]
struct NpyHeader {
    dtype: Dtype,
    fortran_order: bool,
    shape: Vec<usize>,
}

/// Loads a 2-D (or 1-D, read as a single row) little-endian float array from a `.npy` file.
pub fn load_npy(path: &Path) -> MiseResult<Array2<f32>> {
    let mmap = map_file(path)?
        .ok_or_else(|| MiseError::StorageError(format!("{:?} is empty", path)))?;
    let bytes = &mmap[..];

    let (header, data_offset) = read_header(bytes)
        .map_err(|reason| MiseError::StorageError(format!("Invalid npy file {:?}: {}", path, reason)))?;
    if header.fortran_order {
        return Err(MiseError::StorageError(format!(
            "{:?} is stored in Fortran order, only C order is supported",
            path
        )));
    }
    let (rows, cols) = match header.shape.as_slice() {
        [n] => (1, *n),
        [n, d] => (*n, *d),
        other => {
            return Err(MiseError::StorageError(format!(
                "{:?} has shape {:?}, expected one or two dimensions",
                path, other
            )))
        }
    };

    let expected = rows
        .checked_mul(cols)
        .and_then(|values| values.checked_mul(header.dtype.size()))
        .ok_or_else(|| {
            MiseError::StorageError(format!("{:?} declares shape ({}, {}), too large to address", path, rows, cols))
        })?;
    let data = &bytes[data_offset..];
    if data.len() != expected {
        return Err(MiseError::StorageError(format!(
            "{:?} declares {} data bytes but holds {}",
            path,
            expected,
            data.len()
        )));
    }
    let values = match header.dtype {
        Dtype::F32 => decode_f32_le(data),
        Dtype::F64 => decode_f64_le(data),
    };
    debug!(path = ?path, rows, cols, dtype = ?header.dtype, "Loaded npy matrix");

    Array2::from_shape_vec((rows, cols), values)
        .map_err(|e| MiseError::StorageError(format!("Failed to shape matrix from {:?}: {}", path, e)))
}

/// Writes `matrix` as a version 1.0 `.npy` file of little-endian `f32`.
pub fn write_npy(path: &Path, matrix: ArrayView2<f32>) -> MiseResult<()> {
    let (rows, cols) = matrix.dim();
    let mut dict = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        rows, cols
    );
    // Pad with spaces so the data starts on an aligned offset, newline-terminated.
    let unpadded = V1_PREAMBLE + dict.len() + 1;
    let padding = (HEADER_ALIGNMENT - unpadded % HEADER_ALIGNMENT) % HEADER_ALIGNMENT;
    dict.push_str(&" ".repeat(padding));
    dict.push('\n');

    let header_len = u16::try_from(dict.len())
        .map_err(|_| MiseError::StorageError("npy header too long".to_string()))?;
    let mut out = Vec::with_capacity(V1_PREAMBLE + dict.len() + matrix.len() * 4);
    out.extend_from_slice(NPY_MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out.extend_from_slice(&encode_f32_le(matrix.iter()));

    fs::write(path, out).map_err(|e| MiseError::IoError { path: path.to_path_buf(), source: e })
}

/// Returns the parsed header and the offset where array data begins.
fn read_header(bytes: &[u8]) -> Result<(NpyHeader, usize), String> {
    if bytes.len() < V1_PREAMBLE || &bytes[..6] != NPY_MAGIC {
        return Err("missing magic string".to_string());
    }
    let major = bytes[6];
    let (header_len, start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, V1_PREAMBLE),
        2 | 3 => {
            if bytes.len() < V2_PREAMBLE {
                return Err("truncated preamble".to_string());
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
            (len, V2_PREAMBLE)
        }
        v => return Err(format!("unsupported format version {}", v)),
    };
    let end = start + header_len;
    if bytes.len() < end {
        return Err("truncated header".to_string());
    }
    let text = std::str::from_utf8(&bytes[start..end]).map_err(|_| "header is not text".to_string())?;
    Ok((parse_dict(text)?, end))
}

/// Parses the Python dict literal in the header. Only the three keys NumPy
/// writes are read; their order does not matter.
fn parse_dict(text: &str) -> Result<NpyHeader, String> {
    let descr = value_after(text, "descr")?;
    let descr = descr
        .trim_start()
        .trim_start_matches(['\'', '"'])
        .split(['\'', '"'])
        .next()
        .unwrap_or_default();
    let dtype = match descr {
        "<f4" | "f4" => Dtype::F32,
        "<f8" | "f8" => Dtype::F64,
        other => return Err(format!("unsupported dtype '{}'", other)),
    };

    let fortran = value_after(text, "fortran_order")?.trim_start();
    let fortran_order = if fortran.starts_with("True") {
        true
    } else if fortran.starts_with("False") {
        false
    } else {
        return Err("malformed fortran_order".to_string());
    };

    let shape_text = value_after(text, "shape")?.trim_start();
    let inner = shape_text
        .strip_prefix('(')
        .and_then(|rest| rest.split(')').next())
        .ok_or_else(|| "malformed shape".to_string())?;
    let shape = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|_| format!("bad shape entry '{}'", s)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NpyHeader { dtype, fortran_order, shape })
}

/// Text following `'key':` in the dict literal.
fn value_after<'a>(text: &'a str, key: &str) -> Result<&'a str, String> {
    let quoted = format!("'{}'", key);
    let pos = text.find(&quoted).ok_or_else(|| format!("missing key '{}'", key))?;
    let rest = &text[pos + quoted.len()..];
    let colon = rest.find(':').ok_or_else(|| format!("missing value for '{}'", key))?;
    Ok(&rest[colon + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numpy_header() {
        let header = parse_dict("{'descr': '<f4', 'fortran_order': False, 'shape': (13501, 768), }").unwrap();
        assert_eq!(
            header,
            NpyHeader { dtype: Dtype::F32, fortran_order: false, shape: vec![13501, 768] }
        );
    }

    #[test]
    fn test_parse_one_dimensional_and_reordered_keys() {
        let header = parse_dict("{'shape': (768,), 'fortran_order': True, 'descr': '<f8'}").unwrap();
        assert_eq!(header.dtype, Dtype::F64);
        assert!(header.fortran_order);
        assert_eq!(header.shape, vec![768]);
    }

    #[test]
    fn test_unsupported_dtype() {
        assert!(parse_dict("{'descr': '<i8', 'fortran_order': False, 'shape': (2, 2), }").is_err());
        assert!(parse_dict("{'descr': '>f4', 'fortran_order': False, 'shape': (2, 2), }").is_err());
    }
}
