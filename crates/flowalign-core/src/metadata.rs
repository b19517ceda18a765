use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bounds::EndTiles;
use crate::error::Result;

pub const METADATA_FILENAME: &str = "flowalign.yaml";

/// Per-experiment metadata stored as YAML in the image directory.
///
/// Written once at initialization and updated as pipeline phases complete,
/// so an interrupted run can resume where it stopped. `end_tiles` caches the
/// bounds-discovery result, which is by far the most expensive thing to
/// recompute.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Metadata {
    pub microns_per_pixel: f64,
    pub chip_type: String,
    pub alignment_channel: String,
    #[serde(default)]
    pub ports_on_right: bool,
    #[serde(default)]
    pub chip_name: Option<String>,
    #[serde(default)]
    pub mapped_reads: Option<PathBuf>,
    #[serde(default)]
    pub parsed_reads: Option<PathBuf>,
    #[serde(default)]
    pub flipud: bool,
    #[serde(default)]
    pub fliplr: bool,
    #[serde(default)]
    pub perfect_target_name: Option<String>,
    #[serde(default)]
    pub preprocessed: bool,
    #[serde(default)]
    pub phix_aligned: bool,
    #[serde(default)]
    pub protein_channels_aligned: Vec<String>,
    #[serde(default)]
    pub end_tiles: Option<EndTiles>,
}

impl Metadata {
    pub fn load(image_directory: &Path) -> Result<Self> {
        let file = File::open(image_directory.join(METADATA_FILENAME))?;
        Ok(serde_yaml::from_reader(file)?)
    }

    pub fn save(&self, image_directory: &Path) -> Result<()> {
        let file = File::create(image_directory.join(METADATA_FILENAME))?;
        serde_yaml::to_writer(file, self)?;
        Ok(())
    }
}
