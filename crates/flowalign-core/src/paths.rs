use std::path::{Path, PathBuf};

/// Output directory layout rooted at the image directory: alignment results
/// under `results/<base>/`, diagnostic figures under `figures/<base>/`.
#[derive(Clone, Debug)]
pub struct PathInfo {
    pub results_dir: PathBuf,
    pub figures_dir: PathBuf,
}

impl PathInfo {
    pub fn new(image_directory: &Path) -> Self {
        Self {
            results_dir: image_directory.join("results"),
            figures_dir: image_directory.join("figures"),
        }
    }

    pub fn results_for(&self, base: &str) -> PathBuf {
        self.results_dir.join(base)
    }

    pub fn figures_for(&self, base: &str) -> PathBuf {
        self.figures_dir.join(base)
    }
}

/// File stem of an acquisition HDF5 file, used to key end tiles and name
/// the per-acquisition output directories.
pub fn acquisition_base(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The source-extractor catalog for one image: the acquisition path with its
/// extension stripped is a directory holding one `.cat` per image index.
pub fn catalog_path(h5_path: &Path, index: &str) -> PathBuf {
    h5_path.with_extension("").join(format!("{}.cat", index))
}

pub fn stats_filename(index: &str) -> String {
    format!("{}_stats.txt", index)
}

pub fn all_read_rcs_filename(index: &str) -> String {
    format!("{}_all_read_rcs.txt", index)
}

/// Parse `(row, column)` back out of a `{channel}_{row}_{column}_stats.txt`
/// file name.
pub fn parse_stats_filename(name: &str) -> Option<(usize, usize)> {
    let index = name.strip_suffix("_stats.txt")?;
    let mut fields = index.rsplitn(3, '_');
    let column = fields.next()?.parse().ok()?;
    let row = fields.next()?.parse().ok()?;
    fields.next()?;
    Some((row, column))
}
