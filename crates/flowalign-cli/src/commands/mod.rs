pub mod align;
pub mod channel;
pub mod info;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

/// All acquisition HDF5 files in the image directory, sorted by name.
pub(crate) fn acquisition_files(image_directory: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(image_directory)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "h5"))
        .collect();
    files.sort();
    if files.is_empty() {
        bail!(
            "no HDF5 acquisition files in {}",
            image_directory.display()
        );
    }
    Ok(files)
}
