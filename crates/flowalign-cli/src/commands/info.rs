use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use flowalign_core::metadata::Metadata;
use flowalign_core::paths::PathInfo;
use flowalign_core::pipeline::second_channel::aligned_positions;

#[derive(Args)]
pub struct InfoArgs {
    /// Directory holding the acquisition HDF5 files and flowalign.yaml
    pub image_directory: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let metadata = Metadata::load(&args.image_directory)
        .with_context(|| format!("loading metadata from {}", args.image_directory.display()))?;
    let path_info = PathInfo::new(&args.image_directory);

    println!("{}", style("Experiment").bold().underlined());
    println!("  chip type:          {}", metadata.chip_type);
    println!("  microns per pixel:  {}", metadata.microns_per_pixel);
    println!("  alignment channel:  {}", metadata.alignment_channel);
    println!("  ports on right:     {}", metadata.ports_on_right);
    if let Some(name) = &metadata.perfect_target_name {
        println!("  perfect target:     {}", name);
    }

    println!();
    println!("{}", style("Progress").bold().underlined());
    println!(
        "  end tiles:          {}",
        checkmark(metadata.end_tiles.is_some())
    );
    println!("  fiducial aligned:   {}", checkmark(metadata.phix_aligned));
    println!(
        "  protein channels:   {}",
        if metadata.protein_channels_aligned.is_empty() {
            "none".to_string()
        } else {
            metadata.protein_channels_aligned.join(", ")
        }
    );

    let h5_paths = super::acquisition_files(&args.image_directory)?;
    println!();
    println!("{}", style("Acquisitions").bold().underlined());
    for path in &h5_paths {
        let aligned = aligned_positions(path, &metadata.alignment_channel, &path_info)?;
        println!(
            "  {}: {} images aligned",
            path.file_name().unwrap_or_default().to_string_lossy(),
            aligned.len()
        );
    }
    Ok(())
}

fn checkmark(done: bool) -> String {
    if done {
        style("yes").green().to_string()
    } else {
        style("no").red().to_string()
    }
}
