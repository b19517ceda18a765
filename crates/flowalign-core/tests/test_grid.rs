mod common;

use approx::assert_abs_diff_eq;
use ndarray::Array2;
use tempfile::tempdir;

use flowalign_core::grid::{GridReader, ImageSource};

#[test]
fn test_grid_reader_roundtrip() {
    let dir = tempdir().unwrap();
    let h5_path = dir.path().join("conc_10pM.h5");

    let mut data = Array2::<f32>::from_elem((512, 512), 100.0);
    data[[17, 23]] = 1100.0;
    let other = Array2::<f32>::from_elem((512, 512), 100.0);
    common::write_acquisition(&h5_path, "phix", &[(3, 0, &data), (2, 1, &other)]);

    let grid = GridReader::open(&h5_path, "phix").unwrap();
    assert_eq!(grid.columns(), vec![0, 1]);
    assert_eq!(grid.height(), 4);

    let image = grid.get(3, 0).unwrap().unwrap();
    assert_eq!(image.index, "phix_3_0");
    assert_eq!(image.row, 3);
    assert_eq!(image.column, 0);
    // Images come back median-normalized.
    assert_abs_diff_eq!(image.data[[0, 0]], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(image.data[[17, 23]], 10.0, epsilon = 1e-4);
}

#[test]
fn test_grid_reader_missing_image_is_none() {
    let dir = tempdir().unwrap();
    let h5_path = dir.path().join("conc_1pM.h5");
    let data = Array2::<f32>::from_elem((512, 512), 100.0);
    common::write_acquisition(&h5_path, "phix", &[(3, 0, &data)]);

    let grid = GridReader::open(&h5_path, "phix").unwrap();
    assert!(grid.get(0, 0).unwrap().is_none());
    assert!(grid.get(3, 5).unwrap().is_none());
    assert!(grid.get(3, 0).unwrap().is_some());
}

#[test]
fn test_grid_reader_unknown_channel_errors() {
    let dir = tempdir().unwrap();
    let h5_path = dir.path().join("conc_1pM.h5");
    let data = Array2::<f32>::from_elem((512, 512), 100.0);
    common::write_acquisition(&h5_path, "phix", &[(3, 0, &data)]);

    assert!(GridReader::open(&h5_path, "cy5").is_err());
}

#[test]
fn test_non_multiple_of_512_is_invalid() {
    let dir = tempdir().unwrap();
    let h5_path = dir.path().join("bad.h5");
    let data = Array2::<f32>::from_elem((500, 512), 100.0);
    common::write_acquisition(&h5_path, "phix", &[(0, 0, &data)]);

    let grid = GridReader::open(&h5_path, "phix").unwrap();
    assert!(grid.get(0, 0).is_err());
}
