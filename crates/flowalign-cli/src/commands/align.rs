use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use flowalign_core::bounds::{find_end_tiles, BoundsParams};
use flowalign_core::chip::Chip;
use flowalign_core::metadata::Metadata;
use flowalign_core::paths::PathInfo;
use flowalign_core::pipeline::{align_channel, AlignParams};
use flowalign_core::reads::TileStore;

#[derive(Args)]
pub struct AlignArgs {
    /// Directory holding the acquisition HDF5 files and flowalign.yaml
    pub image_directory: PathBuf,

    /// Read names of the fiducial clusters (e.g. phiX), one per line
    #[arg(long)]
    pub fiducial_reads: PathBuf,

    /// Read names of all clusters, used for the mapped output files
    #[arg(long)]
    pub all_reads: Option<PathBuf>,

    /// Signal-to-noise threshold for rough alignment
    #[arg(long, default_value = "1.2")]
    pub snr: f64,

    /// Minimum mutual-neighbor hits for a precision alignment
    #[arg(long, default_value = "15")]
    pub min_hits: usize,

    /// Render diagnostic figures for each aligned image
    #[arg(long)]
    pub make_figures: bool,
}

pub fn run(args: &AlignArgs) -> Result<()> {
    let mut metadata = Metadata::load(&args.image_directory)
        .with_context(|| format!("loading metadata from {}", args.image_directory.display()))?;
    let chip = Chip::from_name(&metadata.chip_type, metadata.ports_on_right)?;
    let h5_paths = super::acquisition_files(&args.image_directory)?;
    let path_info = PathInfo::new(&args.image_directory);

    info!(file = %args.fiducial_reads.display(), "loading fiducial reads");
    let store = TileStore::load_reads(&args.fiducial_reads)?;
    let all_store = match &args.all_reads {
        Some(path) => {
            info!(file = %path.display(), "loading all reads");
            store.merged_with(&TileStore::load_reads(path)?)?
        }
        None => store.clone(),
    };

    let end_tiles = match &metadata.end_tiles {
        Some(end_tiles) => {
            info!("end tiles already calculated");
            end_tiles.clone()
        }
        None => {
            let end_tiles = find_end_tiles(
                &h5_paths,
                &metadata.alignment_channel,
                &chip,
                &store,
                BoundsParams {
                    snr_threshold: args.snr,
                    um_per_pixel: metadata.microns_per_pixel,
                },
            )?;
            metadata.end_tiles = Some(end_tiles.clone());
            metadata.save(&args.image_directory)?;
            end_tiles
        }
    };

    if metadata.phix_aligned {
        info!("fiducial channel already aligned");
        return Ok(());
    }

    let written = align_channel(
        &h5_paths,
        &end_tiles,
        &metadata.alignment_channel,
        &store,
        &all_store,
        &path_info,
        AlignParams {
            snr_threshold: args.snr,
            min_hits: args.min_hits,
            um_per_pixel: metadata.microns_per_pixel,
            rotation_estimate: chip.rotation_estimate(),
            tile_width: chip.tile_width(),
            make_figures: args.make_figures,
        },
    )?;
    println!(
        "{} {} alignments written",
        console::style("done:").green().bold(),
        written
    );

    metadata.phix_aligned = true;
    metadata.save(&args.image_directory)?;
    Ok(())
}
