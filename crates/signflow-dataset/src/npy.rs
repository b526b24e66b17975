//! NPY frame files.
//!
//! Frames are written as 1-D little-endian float32 arrays. Reading accepts
//! float32 or float64 arrays of any shape and flattens them in logical
//! (C) order.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use ndarray::{ArrayD, ArrayView1};
use ndarray_npy::{ReadNpyError, ReadNpyExt, WriteNpyExt};

use signflow_core::{Error, Result};

/// Write one feature vector as a 1-D `<f4` array
pub fn write_frame(path: &Path, values: &[f32]) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    ArrayView1::from(values)
        .write_npy(writer)
        .map_err(|e| Error::Npy(format!("write {}: {e}", path.display())))
}

/// Read a float array and flatten it
pub fn read_frame(path: &Path) -> Result<Vec<f32>> {
    let bytes = std::fs::read(path)?;
    decode(&bytes).map_err(|e| Error::Npy(format!("read {}: {e}", path.display())))
}

fn decode(bytes: &[u8]) -> std::result::Result<Vec<f32>, ReadNpyError> {
    match ArrayD::<f32>::read_npy(bytes) {
        Ok(array) => Ok(array.iter().copied().collect()),
        Err(ReadNpyError::WrongDescriptor(_)) => {
            let array = ArrayD::<f64>::read_npy(bytes)?;
            Ok(array.iter().map(|v| *v as f32).collect())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read_frame() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.npy");
        let values: Vec<f32> = (0..1662).map(|i| i as f32 * 0.5).collect();

        write_frame(&path, &values).unwrap();
        assert_eq!(read_frame(&path).unwrap(), values);
    }

    #[test]
    fn test_written_header_is_f4_vector() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.npy");
        write_frame(&path, &[1.0, 2.0, 3.0]).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..6], b"\x93NUMPY");
        let header = String::from_utf8_lossy(&bytes[10..]);
        assert!(header.contains("<f4"));
        assert!(header.contains("(3,)"));
    }

    #[test]
    fn test_reads_f8_arrays() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.npy");
        let array = ndarray::Array1::from(vec![0.25f64, -1.5, 3.0]);
        array.write_npy(File::create(&path).unwrap()).unwrap();

        assert_eq!(read_frame(&path).unwrap(), vec![0.25f32, -1.5, 3.0]);
    }

    #[test]
    fn test_multidimensional_arrays_flatten_row_major() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.npy");
        let array = Array2::from_shape_vec((2, 3), vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        array.write_npy(File::create(&path).unwrap()).unwrap();

        assert_eq!(
            read_frame(&path).unwrap(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );

        let cube = Array3::<f32>::zeros((2, 2, 2));
        let path = dir.path().join("cube.npy");
        cube.write_npy(File::create(&path).unwrap()).unwrap();
        assert_eq!(read_frame(&path).unwrap().len(), 8);
    }

    #[test]
    fn test_garbage_file_is_npy_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.npy");
        std::fs::write(&path, b"not an npy file").unwrap();

        assert!(matches!(read_frame(&path), Err(Error::Npy(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            read_frame(&dir.path().join("nope.npy")),
            Err(Error::Io(_))
        ));
    }
}
