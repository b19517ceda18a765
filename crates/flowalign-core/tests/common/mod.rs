#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::Rng;

use flowalign_core::pose::Pose;
use flowalign_core::reads::TileStore;

/// Background level of synthetic images; spots sit well above it so the
/// median normalization leaves a clean point signal.
pub const BACKGROUND: f32 = 100.0;
pub const SPOT: f32 = 1000.0;

/// Generate `n` synthetic Illumina read names for one tile, with integer
/// cluster coordinates drawn uniformly from `[0, extent)`.
pub fn synthetic_read_names(
    lane: u32,
    tile: u32,
    n: usize,
    extent: (i64, i64),
    rng: &mut StdRng,
) -> Vec<String> {
    (0..n)
        .map(|_| {
            let r = rng.gen_range(0..extent.0);
            let c = rng.gen_range(0..extent.1);
            format!("SIM01:7:FCX:{}:{}:{}:{}", lane, tile, r, c)
        })
        .collect()
}

/// Write read names to a file and load them back through the parser.
pub fn store_from_names(dir: &Path, names: &[String]) -> TileStore {
    let path = dir.join("reads.txt");
    fs::write(&path, names.join("\n")).unwrap();
    TileStore::load_reads(&path).unwrap()
}

/// Render a point cloud into a microscope-like image: constant background
/// with one bright pixel per transformed point, plus the jittered float
/// positions that a source extractor would report.
pub fn synthetic_image_and_catalog(
    points: &[[f64; 2]],
    pose: &Pose,
    shape: (usize, usize),
    jitter: f64,
    rng: &mut StdRng,
) -> (Array2<f32>, Vec<[f64; 2]>) {
    let mut image = Array2::<f32>::from_elem(shape, BACKGROUND);
    let mut catalog = Vec::new();
    for p in points {
        let q = pose.apply(*p);
        let q = [
            q[0] + jitter * gaussian(rng),
            q[1] + jitter * gaussian(rng),
        ];
        let r = q[0].round();
        let c = q[1].round();
        if r >= 0.0 && c >= 0.0 && (r as usize) < shape.0 && (c as usize) < shape.1 {
            image[[r as usize, c as usize]] += SPOT;
            catalog.push(q);
        }
    }
    (image, catalog)
}

/// Box-Muller standard normal deviate.
pub fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Write a `.cat` file for the given (r, c) catalog points, in the
/// source-extractor column convention (x, y) = (c, r).
pub fn write_catalog(path: &Path, points: &[[f64; 2]]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let lines: String = points
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{} 1.0 {:.4} {:.4}\n", i + 1, p[1], p[0]))
        .collect();
    fs::write(path, format!("# 1 NUMBER\n# 2 FLUX\n# 3 X_IMAGE\n# 4 Y_IMAGE\n{}", lines)).unwrap();
}

/// Create an acquisition HDF5 file with the given channel images at their
/// grid positions.
pub fn write_acquisition(
    path: &Path,
    channel: &str,
    images: &[(usize, usize, &Array2<f32>)],
) -> PathBuf {
    let file = hdf5::File::create(path).unwrap();
    let group = file.create_group(channel).unwrap();
    for (row, column, data) in images {
        group
            .new_dataset_builder()
            .with_data(*data)
            .create(format!("(Major, minor) = ({}, {})", column, row).as_str())
            .unwrap();
    }
    path.to_path_buf()
}
