use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use flowalign_core::metadata::Metadata;
use flowalign_core::paths::PathInfo;
use flowalign_core::pipeline::{align_data_channel, ChannelParams};
use flowalign_core::reads::TileStore;

#[derive(Args)]
pub struct ChannelArgs {
    /// Directory holding the acquisition HDF5 files and flowalign.yaml
    pub image_directory: PathBuf,

    /// Fluorescence channel to align
    #[arg(long)]
    pub channel: String,

    /// Read names to map into this channel's images, one per line
    #[arg(long)]
    pub reads: PathBuf,

    /// Minimum mutual-neighbor hits for a precision alignment
    #[arg(long, default_value = "15")]
    pub min_hits: usize,

    /// Render diagnostic figures for each aligned image
    #[arg(long)]
    pub make_figures: bool,
}

pub fn run(args: &ChannelArgs) -> Result<()> {
    let mut metadata = Metadata::load(&args.image_directory)
        .with_context(|| format!("loading metadata from {}", args.image_directory.display()))?;
    let h5_paths = super::acquisition_files(&args.image_directory)?;
    let path_info = PathInfo::new(&args.image_directory);

    if metadata
        .protein_channels_aligned
        .iter()
        .any(|c| c == &args.channel)
    {
        info!(channel = %args.channel, "channel already aligned");
        return Ok(());
    }

    info!(file = %args.reads.display(), "loading reads");
    let store = TileStore::load_reads(&args.reads)?;

    let written = align_data_channel(
        &h5_paths,
        &args.channel,
        &metadata.alignment_channel,
        &store,
        &store,
        &path_info,
        ChannelParams {
            min_hits: args.min_hits,
            um_per_pixel: metadata.microns_per_pixel,
            make_figures: args.make_figures,
        },
    )?;
    println!(
        "{} {} alignments written",
        console::style("done:").green().bold(),
        written
    );

    metadata.protein_channels_aligned.push(args.channel.clone());
    metadata.save(&args.image_directory)?;
    Ok(())
}
