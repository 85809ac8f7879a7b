#[cfg(test)]
mod tests {
    use super::super::npy::*;
    use crate::error::MiseError;
    use ndarray::array;
    use std::fs;
    use tempfile::tempdir;

    /// Builds a version 1.0 file by hand, the way NumPy lays it out.
    fn handmade_npy(descr: &str, shape: &str, data: &[u8]) -> Vec<u8> {
        let mut dict = format!("{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}", descr, shape);
        while (10 + dict.len() + 1) % 64 != 0 {
            dict.push(' ');
        }
        dict.push('\n');
        let mut out = b"\x93NUMPY\x01\x00".to_vec();
        out.extend_from_slice(&(dict.len() as u16).to_le_bytes());
        out.extend_from_slice(dict.as_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn test_write_then_load_npy() -> Result<(), MiseError> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("title_embeddings.npy");
        let matrix = array![[0.5f32, 1.5], [-3.0, 4.0], [1e-3, 9.0]];
        write_npy(&path, matrix.view())?;

        let bytes = fs::read(&path)?;
        assert_eq!(&bytes[..6], b"\x93NUMPY");
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);

        assert_eq!(load_npy(&path)?, matrix);
        Ok(())
    }

    #[test]
    fn test_load_f8_array() -> Result<(), MiseError> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("all.npy");
        let data: Vec<u8> = [1.0f64, 2.0, 3.0, 4.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        fs::write(&path, handmade_npy("<f8", "(2, 2)", &data))?;

        assert_eq!(load_npy(&path)?, array![[1.0f32, 2.0], [3.0, 4.0]]);
        Ok(())
    }

    #[test]
    fn test_one_dimensional_array_is_one_row() -> Result<(), MiseError> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("query.npy");
        let data: Vec<u8> = [0.25f32, 0.5, 0.75].iter().flat_map(|v| v.to_le_bytes()).collect();
        fs::write(&path, handmade_npy("<f4", "(3,)", &data))?;

        assert_eq!(load_npy(&path)?, array![[0.25f32, 0.5, 0.75]]);
        Ok(())
    }

    #[test]
    fn test_truncated_data_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.npy");
        fs::write(&path, handmade_npy("<f4", "(2, 2)", &[0u8; 12])).unwrap();
        assert!(matches!(load_npy(&path), Err(MiseError::StorageError(_))));
    }

    #[test]
    fn test_oversized_shape_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("huge.npy");
        fs::write(&path, handmade_npy("<f4", "(4611686018427387904, 4)", &[0u8; 16])).unwrap();
        assert!(matches!(load_npy(&path), Err(MiseError::StorageError(_))));
    }

    #[test]
    fn test_not_an_npy_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, b"Title,Ingredients\n").unwrap();
        assert!(matches!(load_npy(&path), Err(MiseError::StorageError(_))));
    }
}
