use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::align::Aligner;
use crate::error::{FlowalignError, Result};
use crate::grid::{GridReader, ImageSource};
use crate::paths::{acquisition_base, catalog_path, parse_stats_filename, PathInfo};
use crate::pipeline::orchestrator::{is_task_error, worker_count};
use crate::pipeline::writer::{write_output, WriteJob};
use crate::reads::TileStore;
use crate::stats::AlignmentStats;

/// Parameters for a precision-only channel pass.
#[derive(Clone, Copy, Debug)]
pub struct ChannelParams {
    pub min_hits: usize,
    pub um_per_pixel: f64,
    pub make_figures: bool,
}

#[derive(Clone, Debug)]
struct SeededTask {
    h5_path: PathBuf,
    stats_path: PathBuf,
    row: usize,
    column: usize,
}

/// Align a non-alignment channel by reusing the transforms the first-channel
/// pass persisted: every stats file of the alignment channel seeds a
/// precision-only alignment of the image at the same grid position in
/// `channel`.
///
/// Rough alignment's FFT work is skipped entirely, so this pass runs on a
/// dedicated rayon pool of roughly all cores. Returns the number of
/// alignments written.
pub fn align_data_channel(
    h5_paths: &[PathBuf],
    channel: &str,
    alignment_channel: &str,
    store: &TileStore,
    all_store: &TileStore,
    path_info: &PathInfo,
    params: ChannelParams,
) -> Result<usize> {
    let tasks = aligned_stats_files(h5_paths, alignment_channel, path_info)?;
    let threads = worker_count(2);
    info!(
        channel,
        seeds = tasks.len(),
        threads,
        "starting precision-only channel pass"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| FlowalignError::Pipeline(e.to_string()))?;

    let results: Vec<Result<bool>> = pool.install(|| {
        tasks
            .par_iter()
            .map(|task| process_seeded_task(task, channel, store, all_store, path_info, params))
            .collect()
    });

    let mut written = 0;
    for (task, result) in tasks.iter().zip(results) {
        match result {
            Ok(true) => written += 1,
            Ok(false) => {}
            Err(e) if is_task_error(&e) => {
                debug!(
                    row = task.row,
                    column = task.column,
                    acquisition = %task.h5_path.display(),
                    error = %e,
                    "skipping seeded image"
                );
            }
            Err(e) => return Err(e),
        }
    }
    info!(written, channel, "channel pass finished");
    Ok(written)
}

/// Every stats file the first-channel pass wrote, with its grid position.
fn aligned_stats_files(
    h5_paths: &[PathBuf],
    alignment_channel: &str,
    path_info: &PathInfo,
) -> Result<Vec<SeededTask>> {
    let mut tasks = Vec::new();
    for h5_path in h5_paths {
        let results_dir = path_info.results_for(&acquisition_base(h5_path));
        if !results_dir.is_dir() {
            continue;
        }
        for dir_entry in fs::read_dir(&results_dir)? {
            let dir_entry = dir_entry?;
            let name = dir_entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with("_stats.txt") || !name.contains(alignment_channel) {
                continue;
            }
            let Some((row, column)) = parse_stats_filename(&name) else {
                debug!(file = %name, "stats file name does not parse, skipping");
                continue;
            };
            tasks.push(SeededTask {
                h5_path: h5_path.clone(),
                stats_path: dir_entry.path(),
                row,
                column,
            });
        }
    }
    Ok(tasks)
}

fn process_seeded_task(
    task: &SeededTask,
    channel: &str,
    store: &TileStore,
    all_store: &TileStore,
    path_info: &PathInfo,
    params: ChannelParams,
) -> Result<bool> {
    let stats = AlignmentStats::from_file(&task.stats_path)?;
    let grid = GridReader::open(&task.h5_path, channel)?;
    let Some(image) = grid.get(task.row, task.column)? else {
        return Err(FlowalignError::MissingImage {
            row: task.row,
            column: task.column,
        });
    };
    let base = acquisition_base(&task.h5_path);
    let image_index = image.index.clone();
    let cat_path = catalog_path(&task.h5_path, &image_index);

    let mut aligner = Aligner::new(store, params.um_per_pixel);
    aligner.set_image(image);
    if !aligner.set_catalog_from_file(&cat_path)? {
        return Err(FlowalignError::MissingCatalog(cat_path));
    }
    aligner.load_alignment(&stats);
    aligner.precision_align(params.min_hits)?;

    let refined = aligner
        .stats()
        .cloned()
        .ok_or_else(|| FlowalignError::Pipeline("precision alignment left no stats".into()))?;
    let catalog = aligner
        .catalog()
        .map(|c| c.points().to_vec())
        .unwrap_or_default();
    write_output(
        &WriteJob {
            image_index,
            base,
            stats: refined,
            read_rcs: aligner.all_read_rcs(all_store),
            catalog,
        },
        path_info,
        params.make_figures,
    )
}

/// The `(row, column)` positions that already have a stats file; exposed so
/// callers can report progress or verify idempotence.
pub fn aligned_positions(
    h5_path: &Path,
    alignment_channel: &str,
    path_info: &PathInfo,
) -> Result<Vec<(usize, usize)>> {
    let paths = [h5_path.to_path_buf()];
    Ok(aligned_stats_files(&paths, alignment_channel, path_info)?
        .into_iter()
        .map(|t| (t.row, t.column))
        .collect())
}
