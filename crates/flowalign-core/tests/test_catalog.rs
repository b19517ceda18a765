use std::fs;

use approx::assert_abs_diff_eq;
use tempfile::tempdir;

use flowalign_core::catalog::Catalog;

#[test]
fn test_catalog_parses_last_two_columns() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("phix_3_0.cat");
    fs::write(
        &path,
        "# 1 NUMBER\n\
         # 2 FLUX_AUTO\n\
         # 3 X_IMAGE\n\
         # 4 Y_IMAGE\n\
         1 523.1 100.25 200.75\n\
         2 127.9 300.5 12.0\n",
    )
    .unwrap();

    let catalog = Catalog::from_file(&path).unwrap();
    assert_eq!(catalog.len(), 2);
    // (x, y) columns land as (r, c) = (y, x).
    assert_abs_diff_eq!(catalog.points()[0][0], 200.75, epsilon = 1e-12);
    assert_abs_diff_eq!(catalog.points()[0][1], 100.25, epsilon = 1e-12);
    assert_abs_diff_eq!(catalog.points()[1][0], 12.0, epsilon = 1e-12);
}

#[test]
fn test_catalog_rejects_garbage() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.cat");
    fs::write(&path, "1 2 three four\n").unwrap();
    assert!(Catalog::from_file(&path).is_err());

    fs::write(&path, "lonely\n").unwrap();
    assert!(Catalog::from_file(&path).is_err());
}

#[test]
fn test_empty_catalog_is_valid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.cat");
    fs::write(&path, "# header only\n").unwrap();
    let catalog = Catalog::from_file(&path).unwrap();
    assert!(catalog.is_empty());
}
