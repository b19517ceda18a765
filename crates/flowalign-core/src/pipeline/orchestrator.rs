use std::path::PathBuf;
use std::thread;

use crossbeam_channel::{bounded, unbounded};
use crossbeam_utils::thread::scope;
use tracing::{debug, error, info, warn};

use crate::align::Aligner;
use crate::bounds::EndTiles;
use crate::error::{FlowalignError, Result};
use crate::grid::{GridReader, ImageSource};
use crate::paths::{acquisition_base, catalog_path, PathInfo};
use crate::pipeline::writer::{write_output, WriteJob};
use crate::reads::TileStore;

/// Parameters shared by every alignment task of a run.
#[derive(Clone, Copy, Debug)]
pub struct AlignParams {
    pub snr_threshold: f64,
    pub min_hits: usize,
    pub um_per_pixel: f64,
    pub rotation_estimate: f64,
    pub tile_width: f64,
    pub make_figures: bool,
}

/// One image-alignment work item.
#[derive(Clone, Debug)]
struct Task {
    row: usize,
    column: usize,
    h5_path: PathBuf,
    candidate_keys: Vec<String>,
}

/// Align every image inside the discovered bounds of every acquisition.
///
/// A producer feeds tasks through a bounded channel into a pool of worker
/// threads; each worker opens its own HDF5 handle, runs rough then precision
/// alignment, and forwards successes to a single writer thread. Closing the
/// task channel shuts the workers down, and the writer exits when the last
/// worker drops its result sender. Per-image failures are logged and
/// dropped; pipeline-level failures abort the run. Returns the number of
/// alignments written.
pub fn align_channel(
    h5_paths: &[PathBuf],
    end_tiles: &EndTiles,
    channel: &str,
    store: &TileStore,
    all_store: &TileStore,
    path_info: &PathInfo,
    params: AlignParams,
) -> Result<usize> {
    let worker_count = worker_count(3);
    info!(workers = worker_count, channel, "starting alignment pipeline");

    let (task_tx, task_rx) = bounded::<Task>(worker_count);
    let (result_tx, result_rx) = unbounded::<WriteJob>();

    let outcome = scope(|s| -> Result<usize> {
        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            workers.push(s.spawn(move |_| -> Result<()> {
                for task in task_rx.iter() {
                    match process_task(&task, channel, store, all_store, params) {
                        Ok(Some(job)) => {
                            if result_tx.send(job).is_err() {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) if is_task_error(&e) => {
                            debug!(
                                row = task.row,
                                column = task.column,
                                acquisition = %task.h5_path.display(),
                                error = %e,
                                "skipping image"
                            );
                        }
                        Err(e @ FlowalignError::InvalidShape(_)) => {
                            error!(
                                row = task.row,
                                column = task.column,
                                acquisition = %task.h5_path.display(),
                                error = %e,
                                "skipping image with invalid shape"
                            );
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok(())
            }));
        }
        drop(task_rx);
        drop(result_tx);

        let writer = {
            let path_info = path_info.clone();
            s.spawn(move |_| -> Result<usize> {
                let mut written = 0;
                for job in result_rx.iter() {
                    if write_output(&job, &path_info, params.make_figures)? {
                        written += 1;
                    }
                }
                Ok(written)
            })
        };

        let mut produce_error = None;
        'produce: for h5_path in h5_paths {
            let base = acquisition_base(h5_path);
            let Some(entry) = end_tiles.get(&base) else {
                warn!(acquisition = %base, "no end tiles, skipping acquisition");
                continue;
            };
            let height = match GridReader::open(h5_path, channel) {
                Ok(grid) => grid.height(),
                Err(e) => {
                    produce_error = Some(e);
                    break;
                }
            };
            for column in entry.min_column..=entry.max_column {
                let Some(candidate_keys) = entry.tile_map.get(&column) else {
                    continue;
                };
                for row in 0..height {
                    let task = Task {
                        row,
                        column,
                        h5_path: h5_path.clone(),
                        candidate_keys: candidate_keys.clone(),
                    };
                    if task_tx.send(task).is_err() {
                        // Every worker exited early; their join results below
                        // carry the reason.
                        break 'produce;
                    }
                }
            }
        }
        drop(task_tx);

        for worker in workers {
            worker.join().unwrap()?;
        }
        let written = writer.join().unwrap()?;
        if let Some(e) = produce_error {
            return Err(e);
        }
        info!(written, channel, "alignment pipeline finished");
        Ok(written)
    })
    .unwrap();
    outcome
}

/// Load one image, rough-align it against its candidate tiles, refine, and
/// package the result for the writer. `None` means the image was skippable.
fn process_task(
    task: &Task,
    channel: &str,
    store: &TileStore,
    all_store: &TileStore,
    params: AlignParams,
) -> Result<Option<WriteJob>> {
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
    aligner.rough_align(
        &task.candidate_keys,
        params.rotation_estimate,
        params.tile_width,
        params.snr_threshold,
    )?;
    if aligner.hitting_tiles.is_empty() {
        debug!(image = %image_index, "no tile cleared the SNR threshold");
        return Ok(None);
    }
    aligner.precision_align(params.min_hits)?;

    let stats = aligner
        .stats()
        .cloned()
        .ok_or_else(|| FlowalignError::Pipeline("precision alignment left no stats".into()))?;
    debug!(image = %image_index, score = stats.score, "image aligned");
    let catalog = aligner
        .catalog()
        .map(|c| c.points().to_vec())
        .unwrap_or_default();
    Ok(Some(WriteJob {
        image_index,
        base,
        stats,
        read_rcs: aligner.all_read_rcs(all_store),
        catalog,
    }))
}

/// Errors that concern a single image and only cost us that image.
pub(crate) fn is_task_error(e: &FlowalignError) -> bool {
    matches!(
        e,
        FlowalignError::MissingCatalog(_)
            | FlowalignError::MissingImage { .. }
            | FlowalignError::InsufficientHits { .. }
            | FlowalignError::InvalidCatalog(_)
            | FlowalignError::CorruptStats(_)
    )
}

/// Worker threads to spawn: all cores minus `reserved`, at least one.
pub(crate) fn worker_count(reserved: usize) -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(reserved)
        .max(1)
}
