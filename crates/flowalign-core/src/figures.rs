//! Diagnostic figures for a finished alignment, rendered with plotters.
//!
//! Two bitmaps per image: an overlay of the catalog detections with the
//! transformed read positions, and a histogram of read-to-detection
//! distances. Only compiled with the `plotting` feature.

use std::fs;
use std::path::Path;

use plotters::prelude::*;

use crate::error::{FlowalignError, Result};
use crate::kernel::nearest_neighbors;
use crate::pipeline::writer::WriteJob;

const FIGURE_SIZE: (u32, u32) = (1024, 1024);
const HIST_SIZE: (u32, u32) = (800, 600);
const HIST_BINS: usize = 40;
const HIST_RANGE: f64 = 10.0;

pub fn render_diagnostics(job: &WriteJob, figures_dir: &Path) -> Result<()> {
    fs::create_dir_all(figures_dir)?;
    render_all_hits(
        job,
        &figures_dir.join(format!("{}_all_hits.png", job.image_index)),
    )?;
    render_hit_hists(
        job,
        &figures_dir.join(format!("{}_hit_hists.png", job.image_index)),
    )?;
    Ok(())
}

fn draw_error(e: impl std::fmt::Display) -> FlowalignError {
    FlowalignError::Pipeline(format!("figure rendering: {}", e))
}

/// Catalog detections as open circles with the transformed reads on top.
fn render_all_hits(job: &WriteJob, path: &Path) -> Result<()> {
    let (min, max) = point_bounds(job);
    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(draw_error)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&job.image_index, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(min[1]..max[1], max[0]..min[0])
        .map_err(draw_error)?;
    chart.configure_mesh().draw().map_err(draw_error)?;

    chart
        .draw_series(
            job.catalog
                .iter()
                .map(|p| Circle::new((p[1], p[0]), 4, RED.stroke_width(1))),
        )
        .map_err(draw_error)?;
    chart
        .draw_series(
            job.read_rcs
                .iter()
                .map(|(_, p)| Circle::new((p[1], p[0]), 1, BLUE.filled())),
        )
        .map_err(draw_error)?;
    root.present().map_err(draw_error)?;
    Ok(())
}

/// Histogram of the distance from each transformed read to its nearest
/// catalog detection.
fn render_hit_hists(job: &WriteJob, path: &Path) -> Result<()> {
    let reads: Vec<[f64; 2]> = job.read_rcs.iter().map(|(_, p)| *p).collect();
    let distances = nearest_neighbors(&reads, &job.catalog);
    let mut bins = vec![0usize; HIST_BINS];
    for &(_, d) in &distances {
        if d < HIST_RANGE {
            bins[(d / HIST_RANGE * HIST_BINS as f64) as usize] += 1;
        }
    }
    let peak = bins.iter().max().copied().unwrap_or(1).max(1);

    let root = BitMapBackend::new(path, HIST_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(draw_error)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&job.image_index, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(0.0..HIST_RANGE, 0..peak + peak / 10 + 1)
        .map_err(draw_error)?;
    chart
        .configure_mesh()
        .x_desc("distance to nearest detection (px)")
        .y_desc("reads")
        .draw()
        .map_err(draw_error)?;
    let bin_width = HIST_RANGE / HIST_BINS as f64;
    chart
        .draw_series(bins.iter().enumerate().map(|(i, &count)| {
            let x0 = i as f64 * bin_width;
            Rectangle::new([(x0, 0), (x0 + bin_width, count)], BLUE.filled())
        }))
        .map_err(draw_error)?;
    root.present().map_err(draw_error)?;
    Ok(())
}

fn point_bounds(job: &WriteJob) -> ([f64; 2], [f64; 2]) {
    let mut min = [f64::INFINITY, f64::INFINITY];
    let mut max = [f64::NEG_INFINITY, f64::NEG_INFINITY];
    for p in job
        .catalog
        .iter()
        .chain(job.read_rcs.iter().map(|(_, p)| p))
    {
        min[0] = min[0].min(p[0]);
        min[1] = min[1].min(p[1]);
        max[0] = max[0].max(p[0]);
        max[1] = max[1].max(p[1]);
    }
    if !min[0].is_finite() {
        return ([0.0, 0.0], [1.0, 1.0]);
    }
    (min, max)
}
