use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ndarray::Array2;
use tracing::warn;

use crate::error::{FlowalignError, Result};
use crate::kernel::rotation_matrix;

/// A single sequencer cluster: an Illumina read name and its (r, c)
/// location in sequencer units.
#[derive(Clone, Debug)]
pub struct Read {
    pub name: String,
    pub rc: [f64; 2],
}

/// Parse the lane and tile fields out of an Illumina read name.
///
/// Fields are colon-separated; the lane is the 4th field from the right and
/// the tile the 3rd.
pub fn tile_key_for_read(name: &str) -> Result<String> {
    let fields: Vec<&str> = name.split(':').collect();
    if fields.len() < 4 {
        return Err(FlowalignError::InvalidReadName(name.to_string()));
    }
    let lane = fields[fields.len() - 4];
    let tile = fields[fields.len() - 3];
    if lane.is_empty() || tile.is_empty() {
        return Err(FlowalignError::InvalidReadName(name.to_string()));
    }
    Ok(format!("lane{}tile{}", lane, tile))
}

fn rc_for_read(name: &str) -> Result<[f64; 2]> {
    let fields: Vec<&str> = name.split(':').collect();
    if fields.len() < 2 {
        return Err(FlowalignError::InvalidReadName(name.to_string()));
    }
    let r: i64 = fields[fields.len() - 2]
        .parse()
        .map_err(|_| FlowalignError::InvalidReadName(name.to_string()))?;
    let c: i64 = fields[fields.len() - 1]
        .parse()
        .map_err(|_| FlowalignError::InvalidReadName(name.to_string()))?;
    Ok([r as f64, c as f64])
}

/// The clusters of one physical flow-cell tile, keyed `lane{L}tile{T}`.
#[derive(Clone, Debug)]
pub struct Tile {
    pub key: String,
    reads: Vec<Read>,
}

impl Tile {
    fn new(key: String, names: BTreeSet<String>) -> Result<Self> {
        let reads = names
            .into_iter()
            .map(|name| {
                let rc = rc_for_read(&name)?;
                Ok(Read { name, rc })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { key, reads })
    }

    pub fn reads(&self) -> &[Read] {
        &self.reads
    }

    pub fn points(&self) -> Vec<[f64; 2]> {
        self.reads.iter().map(|r| r.rc).collect()
    }

    /// Mean (r, c) of all reads.
    pub fn centroid(&self) -> [f64; 2] {
        let n = self.reads.len() as f64;
        let mut sum = [0.0, 0.0];
        for read in &self.reads {
            sum[0] += read.rc[0];
            sum[1] += read.rc[1];
        }
        [sum[0] / n, sum[1] / n]
    }

    /// Extent of the tile along the c axis in sequencer units.
    pub fn width(&self) -> f64 {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for read in &self.reads {
            min = min.min(read.rc[1]);
            max = max.max(read.rc[1]);
        }
        (max - min).max(1.0)
    }
}

/// Rasterize `points` rotated by `theta` degrees and scaled by `scale` into a
/// float canvas with a unit impulse per point. Returns the canvas and the
/// (r, c) minimum that was subtracted to place the cloud at the origin, so
/// the full render transform is `q = scale * R(theta) * p - min`.
pub fn render(points: &[[f64; 2]], theta: f64, scale: f64) -> (Array2<f32>, [f64; 2]) {
    let m = rotation_matrix(theta);
    let transformed: Vec<[f64; 2]> = points
        .iter()
        .map(|p| {
            [
                scale * (m[0][0] * p[0] + m[0][1] * p[1]),
                scale * (m[1][0] * p[0] + m[1][1] * p[1]),
            ]
        })
        .collect();

    let mut min = [f64::INFINITY, f64::INFINITY];
    let mut max = [f64::NEG_INFINITY, f64::NEG_INFINITY];
    for q in &transformed {
        min[0] = min[0].min(q[0]);
        min[1] = min[1].min(q[1]);
        max[0] = max[0].max(q[0]);
        max[1] = max[1].max(q[1]);
    }
    let min = [min[0].floor(), min[1].floor()];
    let shape = (
        (max[0] - min[0]).floor() as usize + 1,
        (max[1] - min[1]).floor() as usize + 1,
    );

    let mut canvas = Array2::<f32>::zeros(shape);
    for q in &transformed {
        let r = (q[0] - min[0]).floor() as usize;
        let c = (q[1] - min[1]).floor() as usize;
        canvas[[r, c]] += 1.0;
    }
    (canvas, min)
}

/// Like [`render`] but into a caller-provided canvas shape with a fixed
/// origin shift; points falling outside the canvas are dropped.
pub fn render_into(
    points: &[[f64; 2]],
    theta: f64,
    scale: f64,
    min: [f64; 2],
    shape: (usize, usize),
) -> Array2<f32> {
    let m = rotation_matrix(theta);
    let mut canvas = Array2::<f32>::zeros(shape);
    for p in points {
        let qr = scale * (m[0][0] * p[0] + m[0][1] * p[1]) - min[0];
        let qc = scale * (m[1][0] * p[0] + m[1][1] * p[1]) - min[1];
        if qr >= 0.0 && qc >= 0.0 {
            let r = qr.floor() as usize;
            let c = qc.floor() as usize;
            if r < shape.0 && c < shape.1 {
                canvas[[r, c]] += 1.0;
            }
        }
    }
    canvas
}

/// All tiles of a flow cell, loaded once and shared read-only across workers.
#[derive(Clone, Debug, Default)]
pub struct TileStore {
    tiles: BTreeMap<String, Tile>,
}

impl TileStore {
    /// Parse a reads file with one Illumina read name per line, grouping the
    /// names by `lane{L}tile{T}`. Invalid lines are skipped with a warning;
    /// duplicate names within a tile are collapsed.
    pub fn load_reads(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut names: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let name = line.trim();
            if name.is_empty() {
                continue;
            }
            match tile_key_for_read(name).and_then(|key| rc_for_read(name).map(|_| key)) {
                Ok(key) => {
                    names.entry(key).or_default().insert(name.to_string());
                }
                Err(_) => {
                    warn!(file = %path.display(), line = name, "skipping invalid read name");
                }
            }
        }
        Self::from_names(names)
    }

    fn from_names(names: BTreeMap<String, BTreeSet<String>>) -> Result<Self> {
        let tiles = names
            .into_iter()
            .map(|(key, names)| Ok((key.clone(), Tile::new(key, names)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self { tiles })
    }

    pub fn get(&self, key: &str) -> Option<&Tile> {
        self.tiles.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.tiles.keys()
    }

    /// Union of two stores, collapsing duplicate read names per tile. Used to
    /// combine the aligning reads with the unclassified reads for output.
    pub fn merged_with(&self, other: &TileStore) -> Result<Self> {
        let mut names: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for store in [self, other] {
            for tile in store.tiles.values() {
                let entry = names.entry(tile.key.clone()).or_default();
                for read in tile.reads() {
                    entry.insert(read.name.clone());
                }
            }
        }
        Self::from_names(names)
    }
}
