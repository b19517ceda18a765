use std::collections::BTreeMap;

use crate::error::{FlowalignError, Result};

/// Candidate tiles per acquisition column, 1-3 keys each.
pub type TileMap = BTreeMap<usize, Vec<String>>;

/// Physical geometry of a supported flow cell: which tiles face the outer
/// columns, the expected stage rotation, and the tile pitch.
#[derive(Clone, Copy, Debug)]
pub enum Chip {
    Miseq { ports_on_right: bool },
}

impl Chip {
    pub fn from_name(name: &str, ports_on_right: bool) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "miseq" => Ok(Chip::Miseq { ports_on_right }),
            other => Err(FlowalignError::Pipeline(format!(
                "unknown chip type: {}",
                other
            ))),
        }
    }

    /// Tiles that can appear under the leftmost imaged column, ordered from
    /// the flow-cell edge inward.
    pub fn left_side_tile_keys(&self) -> Vec<String> {
        match self {
            Chip::Miseq { ports_on_right } => {
                if *ports_on_right {
                    (2111..=2119).rev().map(tile_key).collect()
                } else {
                    (2101..=2110).map(tile_key).collect()
                }
            }
        }
    }

    /// Tiles that can appear under the rightmost imaged column.
    pub fn right_side_tile_keys(&self) -> Vec<String> {
        match self {
            Chip::Miseq { ports_on_right } => {
                if *ports_on_right {
                    (2101..=2110).map(tile_key).collect()
                } else {
                    (2111..=2119).rev().map(tile_key).collect()
                }
            }
        }
    }

    /// Stage rotation estimate in degrees.
    pub fn rotation_estimate(&self) -> f64 {
        match self {
            Chip::Miseq { .. } => 180.0,
        }
    }

    /// Physical tile width in microns.
    pub fn tile_width(&self) -> f64 {
        match self {
            Chip::Miseq { .. } => 935.0,
        }
    }

    /// Relate each acquisition column in `[min_column, max_column]` to the
    /// tiles it most likely sees: the linear interpolation of tile numbers
    /// across the column range, plus the adjacent tile on each side that
    /// exists. Works whether or not the tile numbering is mirrored relative
    /// to the columns.
    pub fn expected_tile_map(
        &self,
        left_tiles: &[String],
        right_tiles: &[String],
        min_column: usize,
        max_column: usize,
    ) -> TileMap {
        let left_numbers: Vec<i64> = left_tiles.iter().filter_map(|k| tile_number(k)).collect();
        let right_numbers: Vec<i64> = right_tiles.iter().filter_map(|k| tile_number(k)).collect();
        let min_tile = left_numbers
            .iter()
            .chain(&right_numbers)
            .min()
            .copied()
            .unwrap_or(2101);
        let max_tile = left_numbers
            .iter()
            .chain(&right_numbers)
            .max()
            .copied()
            .unwrap_or(2119);

        // If the lowest tile number sits on the right side the associations
        // of tiles to columns run backwards.
        let invert_map = !left_numbers.contains(&min_tile);

        let span = (max_tile - min_tile) as f64;
        let range = (max_column - min_column).max(1) as f64;

        let mut tile_map = TileMap::new();
        for column in min_column..=max_column {
            let frac = (column - min_column) as f64 / range;
            let expected = min_tile + (frac * span).round() as i64;
            let map_column = if invert_map {
                max_column - (column - min_column)
            } else {
                column
            };
            let entry = tile_map.entry(map_column).or_default();
            entry.push(tile_key(expected));
            // At a boundary only the inward neighbor exists; in the middle
            // both sides get checked.
            if expected < max_tile {
                entry.push(tile_key(expected + 1));
            }
            if expected > min_tile {
                entry.push(tile_key(expected - 1));
            }
        }
        tile_map
    }
}

fn tile_key(number: i64) -> String {
    format!("lane1tile{}", number)
}

/// The numeric part of a `lane{L}tile{T}` key.
pub fn tile_number(key: &str) -> Option<i64> {
    key.rsplit("tile").next()?.parse().ok()
}
