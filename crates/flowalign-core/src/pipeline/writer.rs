use std::fmt::Write as _;
use std::fs;

use tracing::{debug, info};

use crate::error::Result;
use crate::paths::{all_read_rcs_filename, stats_filename, PathInfo};
use crate::stats::{load_existing_score, AlignmentStats};

/// A completed alignment handed from a worker to the writer thread.
#[derive(Clone, Debug)]
pub struct WriteJob {
    /// Image index `{channel}_{row}_{column}`.
    pub image_index: String,
    /// Acquisition base name, also the per-acquisition output directory.
    pub base: String,
    pub stats: AlignmentStats,
    /// Every read of the hitting tiles with its transformed (r, c) pixels.
    pub read_rcs: Vec<(String, [f64; 2])>,
    /// Catalog detections, kept for diagnostic figures.
    pub catalog: Vec<[f64; 2]>,
}

/// Persist one alignment: the stats record and the transformed coordinates
/// of every read. Refuses to replace an existing stats file whose score is
/// at least as good; returns whether anything was written.
pub fn write_output(job: &WriteJob, path_info: &PathInfo, make_figures: bool) -> Result<bool> {
    let results_dir = path_info.results_for(&job.base);
    fs::create_dir_all(&results_dir)?;

    let stats_path = results_dir.join(stats_filename(&job.image_index));
    let existing_score = load_existing_score(&stats_path);
    // Scores are persisted at two decimals; compare at that precision so a
    // byte-identical re-run never looks like an improvement.
    let candidate_score = (job.stats.score * 100.0).round() / 100.0;
    if candidate_score <= existing_score {
        debug!(
            image = %job.image_index,
            score = job.stats.score,
            existing_score,
            "existing alignment is at least as good, keeping it"
        );
        return Ok(false);
    }

    info!(
        image = %job.image_index,
        base = %job.base,
        score = job.stats.score,
        "saving alignment"
    );
    fs::write(&stats_path, job.stats.serialized())?;

    let mut lines = String::new();
    for (name, rc) in &job.read_rcs {
        writeln!(lines, "{} {:.4} {:.4}", name, rc[0], rc[1]).unwrap();
    }
    fs::write(results_dir.join(all_read_rcs_filename(&job.image_index)), lines)?;

    if make_figures {
        render_figures(job, path_info);
    }
    Ok(true)
}

#[cfg(feature = "plotting")]
fn render_figures(job: &WriteJob, path_info: &PathInfo) {
    if let Err(e) = crate::figures::render_diagnostics(job, &path_info.figures_for(&job.base)) {
        tracing::warn!(image = %job.image_index, error = %e, "could not render figures");
    }
}

#[cfg(not(feature = "plotting"))]
fn render_figures(job: &WriteJob, _path_info: &PathInfo) {
    debug!(
        image = %job.image_index,
        "figures requested but the plotting feature is disabled"
    );
}
