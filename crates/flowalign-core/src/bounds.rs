use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::align::Aligner;
use crate::chip::{Chip, TileMap};
use crate::consts::BOUNDS_PROBE_ROWS;
use crate::error::{FlowalignError, Result};
use crate::grid::{GridReader, ImageSource};
use crate::paths::{acquisition_base, catalog_path};
use crate::reads::TileStore;

/// Column range and per-column candidate tiles for one acquisition.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EndTileEntry {
    pub min_column: usize,
    pub max_column: usize,
    pub tile_map: TileMap,
}

/// End-tile bounds per acquisition file, keyed by the acquisition base name.
pub type EndTiles = BTreeMap<String, EndTileEntry>;

#[derive(Clone, Copy, Debug)]
pub struct BoundsParams {
    pub snr_threshold: f64,
    pub um_per_pixel: f64,
}

/// Find which sequencer tiles the outermost imaged columns of each
/// acquisition see, then interpolate a candidate tile map for the interior.
///
/// Probes columns left-to-right against the chip's left-side tiles and
/// right-to-left against its right-side tiles, stopping each scan at the
/// first column where any acquisition aligns. Acquisitions that never
/// aligned inherit the plurality-vote tile and column of those that did.
pub fn find_end_tiles(
    h5_paths: &[PathBuf],
    channel: &str,
    chip: &Chip,
    store: &TileStore,
    params: BoundsParams,
) -> Result<EndTiles> {
    if h5_paths.is_empty() {
        return Err(FlowalignError::Pipeline("no acquisition files".into()));
    }
    let columns = GridReader::open(&h5_paths[0], channel)?.columns();

    let left_candidates = chip.left_side_tile_keys();
    let right_candidates = chip.right_side_tile_keys();
    let left = probe_side(
        h5_paths,
        columns.iter().copied(),
        &left_candidates,
        channel,
        chip,
        store,
        params,
    )?;
    let right = probe_side(
        h5_paths,
        columns.iter().rev().copied(),
        &right_candidates,
        channel,
        chip,
        store,
        params,
    )?;

    let (default_left_tile, default_left_column) = plurality(&left);
    let (default_right_tile, default_right_column) = plurality(&right);

    let mut end_tiles = EndTiles::new();
    for path in h5_paths {
        let base = acquisition_base(path);
        let (left_tiles, left_column) = left
            .get(path)
            .cloned()
            .unwrap_or_else(|| (vec![default_left_tile.clone()], default_left_column));
        let (right_tiles, right_column) = right
            .get(path)
            .cloned()
            .unwrap_or_else(|| (vec![default_right_tile.clone()], default_right_column));
        let min_column = left_column.min(right_column);
        let max_column = left_column.max(right_column);
        let tile_map = chip.expected_tile_map(&left_tiles, &right_tiles, min_column, max_column);
        info!(
            acquisition = %base,
            min_column,
            max_column,
            "end tiles located"
        );
        end_tiles.insert(
            base,
            EndTileEntry {
                min_column,
                max_column,
                tile_map,
            },
        );
    }
    Ok(end_tiles)
}

type SideBounds = BTreeMap<PathBuf, (Vec<String>, usize)>;

fn probe_side(
    h5_paths: &[PathBuf],
    columns: impl Iterator<Item = usize>,
    candidates: &[String],
    channel: &str,
    chip: &Chip,
    store: &TileStore,
    params: BoundsParams,
) -> Result<SideBounds> {
    for column in columns {
        let results: Vec<Option<(Vec<String>, usize)>> = h5_paths
            .par_iter()
            .map(|path| check_column(path, column, candidates, channel, chip, store, params))
            .collect::<Result<Vec<_>>>()?;

        let found: SideBounds = h5_paths
            .iter()
            .zip(results)
            .filter_map(|(path, res)| res.map(|v| (path.clone(), v)))
            .collect();
        if !found.is_empty() {
            return Ok(found);
        }
    }
    Err(FlowalignError::NoAlignment)
}

/// Rough-align one column of one acquisition against the side candidates.
/// Probes a few central rows and reports the hitting tiles of the first row
/// that aligns.
fn check_column(
    path: &Path,
    column: usize,
    candidates: &[String],
    channel: &str,
    chip: &Chip,
    store: &TileStore,
    params: BoundsParams,
) -> Result<Option<(Vec<String>, usize)>> {
    let grid = GridReader::open(path, channel)?;
    for row in BOUNDS_PROBE_ROWS {
        let Some(image) = grid.get(row, column)? else {
            debug!(acquisition = %path.display(), row, column, "no image at probe row");
            continue;
        };
        let cat_path = catalog_path(path, &image.index);
        let mut aligner = Aligner::new(store, params.um_per_pixel);
        aligner.set_image(image);
        if !aligner.set_catalog_from_file(&cat_path)? {
            continue;
        }
        aligner.rough_align(
            candidates,
            chip.rotation_estimate(),
            chip.tile_width(),
            params.snr_threshold,
        )?;
        if !aligner.hitting_tiles.is_empty() {
            debug!(acquisition = %path.display(), row, column, "column aligned");
            let keys = aligner
                .hitting_tiles
                .iter()
                .map(|t| t.key.clone())
                .collect();
            return Ok(Some((keys, column)));
        }
    }
    Ok(None)
}

/// Majority-vote tile key and column over the acquisitions that aligned.
fn plurality(bounds: &SideBounds) -> (String, usize) {
    let mut tile_votes: BTreeMap<&str, usize> = BTreeMap::new();
    let mut column_votes: BTreeMap<usize, usize> = BTreeMap::new();
    for (tiles, column) in bounds.values() {
        for tile in tiles {
            *tile_votes.entry(tile).or_default() += 1;
        }
        *column_votes.entry(*column).or_default() += 1;
    }
    let tile = tile_votes
        .into_iter()
        .max_by_key(|&(_, count)| count)
        .map(|(tile, _)| tile.to_string())
        .unwrap_or_default();
    let column = column_votes
        .into_iter()
        .max_by_key(|&(_, count)| count)
        .map(|(column, _)| column)
        .unwrap_or(0);
    (tile, column)
}
