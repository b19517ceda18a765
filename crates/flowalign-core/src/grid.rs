use std::collections::BTreeSet;
use std::path::Path;

use crate::error::Result;
use crate::image::Image;

/// Source of grid-indexed images for one channel of one acquisition.
///
/// `get` returns `None` for positions the acquisition never imaged; callers
/// treat that as skippable, not an error.
pub trait ImageSource {
    /// Column indices present in the grid, ascending.
    fn columns(&self) -> Vec<usize>;
    /// Number of grid rows (one past the highest row index).
    fn height(&self) -> usize;
    fn get(&self, row: usize, column: usize) -> Result<Option<Image>>;
}

/// Reads one channel of an acquisition HDF5 file.
///
/// Each channel is a group holding one 2-D dataset per field of view, named
/// `(Major, minor) = (column, row)` by the acquisition converter.
pub struct GridReader {
    file: hdf5::File,
    channel: String,
    positions: BTreeSet<(usize, usize)>,
}

impl GridReader {
    pub fn open(path: &Path, channel: &str) -> Result<Self> {
        let file = hdf5::File::open(path)?;
        let group = file.group(channel)?;
        let positions = group
            .member_names()?
            .iter()
            .filter_map(|name| parse_dataset_name(name))
            .map(|(column, row)| (row, column))
            .collect();
        Ok(Self {
            file,
            channel: channel.to_string(),
            positions,
        })
    }

    fn dataset_name(row: usize, column: usize) -> String {
        format!("(Major, minor) = ({}, {})", column, row)
    }
}

impl ImageSource for GridReader {
    fn columns(&self) -> Vec<usize> {
        let columns: BTreeSet<usize> = self.positions.iter().map(|&(_, c)| c).collect();
        columns.into_iter().collect()
    }

    fn height(&self) -> usize {
        self.positions
            .iter()
            .map(|&(r, _)| r + 1)
            .max()
            .unwrap_or(0)
    }

    fn get(&self, row: usize, column: usize) -> Result<Option<Image>> {
        if !self.positions.contains(&(row, column)) {
            return Ok(None);
        }
        let dataset = self
            .file
            .group(&self.channel)?
            .dataset(&Self::dataset_name(row, column))?;
        let data = dataset.read_2d::<f32>()?;
        Ok(Some(Image::new(data, &self.channel, row, column)?))
    }
}

/// Parse `(Major, minor) = (column, row)` into `(column, row)`.
fn parse_dataset_name(name: &str) -> Option<(usize, usize)> {
    let coords = name.strip_prefix("(Major, minor) = (")?.strip_suffix(')')?;
    let (major, minor) = coords.split_once(',')?;
    Some((major.trim().parse().ok()?, minor.trim().parse().ok()?))
}
