use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::align::hits::{classify_hits, HitSummary};
use crate::align::lstsq::fit_similarity;
use crate::catalog::Catalog;
use crate::consts::{MAX_PRECISION_ITERATIONS, MIN_TILE_HITS, NOISE_SHUFFLE_COUNT};
use crate::error::{FlowalignError, Result};
use crate::image::Image;
use crate::kernel::fft::{conjugate_product, fft2d_forward, ifft2d_inverse};
use crate::kernel::{max_2d_idx, pad_to_size};
use crate::pose::Pose;
use crate::reads::{render, render_into, TileStore};
use crate::stats::{alignment_score, AlignmentStats};

/// A candidate tile whose rough-alignment correlation peak cleared the SNR
/// threshold, together with the pose implied by that peak.
#[derive(Clone, Debug)]
pub struct HittingTile {
    pub key: String,
    pub snr: f64,
    pub pose: Pose,
}

/// Two-stage registration of one microscope image against the cluster point
/// clouds of candidate flow-cell tiles.
///
/// Holds at most one image at a time; binding a new image resets all
/// alignment state from the previous one.
pub struct Aligner<'a> {
    store: &'a TileStore,
    um_per_pixel: f64,
    image: Option<Image>,
    catalog: Option<Catalog>,
    pub hitting_tiles: Vec<HittingTile>,
    stats: Option<AlignmentStats>,
}

impl<'a> Aligner<'a> {
    pub fn new(store: &'a TileStore, um_per_pixel: f64) -> Self {
        Self {
            store,
            um_per_pixel,
            image: None,
            catalog: None,
            hitting_tiles: Vec::new(),
            stats: None,
        }
    }

    /// Bind an image, invalidating any previous alignment state.
    pub fn set_image(&mut self, image: Image) {
        self.image = Some(image);
        self.catalog = None;
        self.hitting_tiles.clear();
        self.stats = None;
    }

    pub fn set_catalog(&mut self, catalog: Catalog) {
        self.catalog = Some(catalog);
    }

    /// Load the detection catalog for the bound image. Returns `false`
    /// without error when the file does not exist; the caller skips the
    /// image in that case.
    pub fn set_catalog_from_file(&mut self, path: &Path) -> Result<bool> {
        if !path.is_file() {
            debug!(path = %path.display(), "no catalog for image");
            return Ok(false);
        }
        self.catalog = Some(Catalog::from_file(path)?);
        Ok(true)
    }

    pub fn image(&self) -> Option<&Image> {
        self.image.as_ref()
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    pub fn stats(&self) -> Option<&AlignmentStats> {
        self.stats.as_ref()
    }

    /// FFT cross-correlation of the image against each candidate tile's
    /// rendered point cloud, with a per-tile SNR test against angular
    /// shuffles of the read positions.
    ///
    /// Tiles whose correlation peak clears `snr_threshold` land in
    /// `hitting_tiles`, ordered by descending SNR. Without a bound catalog
    /// this is a no-op: the image has no detections to refine against, so
    /// there is no point spending FFTs on it.
    pub fn rough_align(
        &mut self,
        candidate_keys: &[String],
        rotation_estimate: f64,
        tile_width: f64,
        snr_threshold: f64,
    ) -> Result<()> {
        let image = self
            .image
            .as_mut()
            .ok_or_else(|| FlowalignError::Pipeline("rough_align without an image".into()))?;
        self.hitting_tiles.clear();
        self.stats = None;
        if self.catalog.is_none() {
            return Ok(());
        }

        let (image_h, image_w) = image.shape();
        for key in candidate_keys {
            let Some(tile) = self.store.get(key) else {
                warn!(tile = %key, "candidate tile has no loaded reads");
                continue;
            };
            let scale = (tile_width / self.um_per_pixel) / tile.width();
            let points = tile.points();
            let (tile_canvas, render_min) = render(&points, rotation_estimate, scale);
            let pad = tile_canvas.dim();

            let image_fft = image.fft(pad)?;
            let canvas = image_fft.dim();
            let tile_fft = fft2d_forward(&pad_to_size(&tile_canvas, canvas)?);
            let corr = ifft2d_inverse(&conjugate_product(&tile_fft, image_fft));
            let (peak_r, peak_c, peak) = max_2d_idx(&corr);

            // Noise floor: re-correlate against clouds with the same radial
            // distribution but randomized angles about the tile centroid.
            let centroid = tile.centroid();
            let mut rng = StdRng::seed_from_u64(shuffle_seed(key));
            let mut noise_peaks = Vec::with_capacity(NOISE_SHUFFLE_COUNT);
            for _ in 0..NOISE_SHUFFLE_COUNT {
                let shuffled = angular_shuffle(&points, centroid, &mut rng);
                let noise_canvas =
                    render_into(&shuffled, rotation_estimate, scale, render_min, pad);
                let noise_fft = fft2d_forward(&pad_to_size(&noise_canvas, canvas)?);
                let noise_corr = ifft2d_inverse(&conjugate_product(&noise_fft, image_fft));
                noise_peaks.push(max_2d_idx(&noise_corr).2);
            }
            let mean = noise_peaks.iter().sum::<f64>() / noise_peaks.len() as f64;
            let var = noise_peaks.iter().map(|p| (p - mean).powi(2)).sum::<f64>()
                / noise_peaks.len() as f64;
            let std = var.sqrt();
            let snr = if std > 0.0 {
                (peak - mean) / std
            } else if peak > mean {
                f64::INFINITY
            } else {
                0.0
            };

            debug!(tile = %key, snr, peak, "rough correlation");
            if snr < snr_threshold {
                continue;
            }

            // The image was left/top padded by the tile canvas size, so the
            // peak location minus that padding is the tile-canvas origin in
            // image pixels. Peaks past the image edge wrapped around the
            // FFT canvas.
            let mut t_r = peak_r as f64 - pad.0 as f64;
            if t_r > image_h as f64 {
                t_r -= canvas.0 as f64;
            }
            let mut t_c = peak_c as f64 - pad.1 as f64;
            if t_c > image_w as f64 {
                t_c -= canvas.1 as f64;
            }
            self.hitting_tiles.push(HittingTile {
                key: key.clone(),
                snr,
                pose: Pose::new(
                    rotation_estimate,
                    scale,
                    [t_r - render_min[0], t_c - render_min[1]],
                ),
            });
        }
        self.hitting_tiles
            .sort_by(|a, b| b.snr.total_cmp(&a.snr));
        Ok(())
    }

    /// Refine each hitting tile's pose by iterated least squares on
    /// mutual-nearest-neighbor pairs against the catalog, then record the
    /// result in `stats`.
    ///
    /// Tiles contributing fewer than [`MIN_TILE_HITS`] hits are dropped; if
    /// the surviving hit set is smaller than `min_hits` the whole alignment
    /// fails with `InsufficientHits`.
    pub fn precision_align(&mut self, min_hits: usize) -> Result<()> {
        let catalog = self
            .catalog
            .as_ref()
            .ok_or_else(|| FlowalignError::Pipeline("precision_align without a catalog".into()))?;
        let cat_points = catalog.points();

        let mut kept: Vec<HittingTile> = Vec::new();
        let mut summaries: Vec<HitSummary> = Vec::new();
        let mut residuals_r: Vec<f64> = Vec::new();
        let mut residuals_c: Vec<f64> = Vec::new();

        for hitting in &self.hitting_tiles {
            let Some(tile) = self.store.get(&hitting.key) else {
                continue;
            };
            let rc = tile.points();
            let mut pose = hitting.pose;
            let mut summary = HitSummary::default();
            let mut prev_pairs: Option<Vec<(usize, usize)>> = None;

            for _ in 0..MAX_PRECISION_ITERATIONS {
                let transformed: Vec<[f64; 2]> = rc.iter().map(|p| pose.apply(*p)).collect();
                summary = classify_hits(&transformed, cat_points);
                if prev_pairs.as_ref() == Some(&summary.pairs) {
                    break;
                }
                if summary.pairs.len() < MIN_TILE_HITS {
                    break;
                }
                prev_pairs = Some(summary.pairs.clone());
                let src: Vec<[f64; 2]> = summary.pairs.iter().map(|&(i, _)| rc[i]).collect();
                let dst: Vec<[f64; 2]> =
                    summary.pairs.iter().map(|&(_, j)| cat_points[j]).collect();
                match fit_similarity(&src, &dst) {
                    Some(refined) => pose = refined,
                    None => break,
                }
            }

            if summary.hit_count() < MIN_TILE_HITS {
                debug!(tile = %hitting.key, hits = summary.hit_count(), "tile dropped");
                continue;
            }
            for &(i, j) in &summary.pairs {
                let q = pose.apply(rc[i]);
                residuals_r.push((q[0] - cat_points[j][0]).abs());
                residuals_c.push((q[1] - cat_points[j][1]).abs());
            }
            kept.push(HittingTile {
                key: hitting.key.clone(),
                snr: hitting.snr,
                pose,
            });
            summaries.push(summary);
        }

        let hits: usize = summaries.iter().map(|s| s.hit_count()).sum();
        if hits < min_hits {
            self.stats = None;
            return Err(FlowalignError::InsufficientHits { hits, min_hits });
        }

        let exclusive_hits: usize = summaries.iter().map(|s| s.exclusive).sum();
        let good_mutual_hits: usize = summaries.iter().map(|s| s.good_mutual).sum();
        self.stats = Some(AlignmentStats {
            tile_keys: kept.iter().map(|t| t.key.clone()).collect(),
            offsets: kept.iter().map(|t| t.pose.offset).collect(),
            rotations: kept.iter().map(|t| t.pose.theta).collect(),
            scales: kept.iter().map(|t| t.pose.scale).collect(),
            exclusive_hits,
            good_mutual_hits,
            bad_mutual_hits: summaries.iter().map(|s| s.bad_mutual).sum(),
            non_mutual_hits: summaries.iter().map(|s| s.non_mutual).sum(),
            r_residual: median(&mut residuals_r),
            c_residual: median(&mut residuals_c),
            score: alignment_score(exclusive_hits, good_mutual_hits),
        });
        self.hitting_tiles = kept;
        Ok(())
    }

    /// Seed the aligner from a persisted stats record so a new image in
    /// another channel can go straight to precision alignment.
    pub fn load_alignment(&mut self, stats: &AlignmentStats) {
        self.hitting_tiles = (0..stats.tile_keys.len())
            .map(|idx| HittingTile {
                key: stats.tile_keys[idx].clone(),
                snr: f64::NAN,
                pose: stats.pose(idx),
            })
            .collect();
        self.stats = None;
    }

    /// Transformed (r, c) image coordinates for every read of every hitting
    /// tile in `all_store`, one `(name, point)` pair per read.
    pub fn all_read_rcs(&self, all_store: &TileStore) -> Vec<(String, [f64; 2])> {
        let mut out = Vec::new();
        for hitting in &self.hitting_tiles {
            let Some(tile) = all_store.get(&hitting.key) else {
                continue;
            };
            for read in tile.reads() {
                out.push((read.name.clone(), hitting.pose.apply(read.rc)));
            }
        }
        out
    }
}

/// Keep each point's distance to the centroid but randomize its angle.
fn angular_shuffle(
    points: &[[f64; 2]],
    centroid: [f64; 2],
    rng: &mut StdRng,
) -> Vec<[f64; 2]> {
    points
        .iter()
        .map(|p| {
            let radius = ((p[0] - centroid[0]).powi(2) + (p[1] - centroid[1]).powi(2)).sqrt();
            let angle: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
            [
                centroid[0] + radius * angle.sin(),
                centroid[1] + radius * angle.cos(),
            ]
        })
        .collect()
}

fn shuffle_seed(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}
