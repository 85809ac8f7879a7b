#[cfg(test)]
mod tests {
    use super::super::flat_matrix::*;
    use crate::error::MiseError;
    use ndarray::{array, Array2};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_load_raw() -> Result<(), MiseError> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("title.f32");
        let matrix = array![[1.0f32, -2.5, 3.0], [0.0, 0.25, -7.0]];

        write_raw_f32(&path, matrix.view())?;
        assert_eq!(fs::metadata(&path)?.len(), 6 * 4);

        let loaded = load_raw_f32(&path, 3)?;
        assert_eq!(loaded, matrix);
        Ok(())
    }

    #[test]
    fn test_row_count_is_implied_by_length() -> Result<(), MiseError> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("all.f32");
        let matrix = Array2::from_shape_fn((5, 4), |(i, j)| (i * 4 + j) as f32);
        write_raw_f32(&path, matrix.view())?;

        // Same bytes read with a different width give a different row count.
        assert_eq!(load_raw_f32(&path, 4)?.dim(), (5, 4));
        assert_eq!(load_raw_f32(&path, 2)?.dim(), (10, 2));
        Ok(())
    }

    #[test]
    fn test_transposed_view_is_written_in_logical_order() -> Result<(), MiseError> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.f32");
        let matrix = array![[1.0f32, 2.0], [3.0, 4.0]];
        write_raw_f32(&path, matrix.t())?;
        assert_eq!(load_raw_f32(&path, 2)?, array![[1.0f32, 3.0], [2.0, 4.0]]);
        Ok(())
    }

    #[test]
    fn test_partial_row_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.f32");
        fs::write(&path, vec![0u8; 4 * 5]).unwrap();
        assert!(matches!(load_raw_f32(&path, 3), Err(MiseError::StorageError(_))));
    }

    #[test]
    fn test_empty_file_has_no_rows() -> Result<(), MiseError> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.f32");
        fs::write(&path, b"").unwrap();
        assert_eq!(load_raw_f32(&path, 8)?.dim(), (0, 8));
        Ok(())
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.f32");
        match load_raw_f32(&path, 3) {
            Err(MiseError::IoError { path: p, .. }) => assert_eq!(p, path),
            other => panic!("Expected IoError, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_raw_f32(&dir.path().join("x.f32"), 0),
            Err(MiseError::Configuration(_))
        ));
        assert!(matches!(
            load_raw_f32(&dir.path().join("x.f32"), usize::MAX),
            Err(MiseError::Configuration(_))
        ));
    }
}
