use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::consts::GOOD_MUTUAL_WEIGHT;
use crate::error::{FlowalignError, Result};
use crate::pose::Pose;

/// The persisted record of one successful image alignment.
///
/// `tile_keys`, `offsets`, `rotations` and `scales` run in parallel: one
/// entry per hitting tile, ordered by descending rough-alignment SNR.
#[derive(Clone, Debug, PartialEq)]
pub struct AlignmentStats {
    pub tile_keys: Vec<String>,
    pub offsets: Vec<[f64; 2]>,
    pub rotations: Vec<f64>,
    pub scales: Vec<f64>,
    pub exclusive_hits: usize,
    pub good_mutual_hits: usize,
    pub bad_mutual_hits: usize,
    pub non_mutual_hits: usize,
    pub r_residual: f64,
    pub c_residual: f64,
    pub score: f64,
}

/// Scalar used to compare rival alignments of the same image; higher wins.
pub fn alignment_score(exclusive_hits: usize, good_mutual_hits: usize) -> f64 {
    exclusive_hits as f64 + GOOD_MUTUAL_WEIGHT * good_mutual_hits as f64
}

impl AlignmentStats {
    /// Pose of the tile at `idx`, reconstructed from the stored parameters.
    pub fn pose(&self, idx: usize) -> Pose {
        Pose::new(self.rotations[idx], self.scales[idx], self.offsets[idx])
    }

    pub fn serialized(&self) -> String {
        let mut out = String::new();
        writeln!(out, "tile:{}", self.tile_keys.join(",")).unwrap();
        let offsets: Vec<String> = self
            .offsets
            .iter()
            .map(|o| format!("({:.4},{:.4})", o[0], o[1]))
            .collect();
        writeln!(out, "rc_offset:{}", offsets.join(",")).unwrap();
        writeln!(out, "rotation:{}", join_floats(&self.rotations, 6)).unwrap();
        writeln!(out, "scale:{}", join_floats(&self.scales, 6)).unwrap();
        writeln!(out, "exclusive_hits:{}", self.exclusive_hits).unwrap();
        writeln!(out, "good_mutual_hits:{}", self.good_mutual_hits).unwrap();
        writeln!(out, "bad_mutual_hits:{}", self.bad_mutual_hits).unwrap();
        writeln!(out, "non_mutual_hits:{}", self.non_mutual_hits).unwrap();
        writeln!(out, "r_residual:{:.4}", self.r_residual).unwrap();
        writeln!(out, "c_residual:{:.4}", self.c_residual).unwrap();
        writeln!(out, "score:{:.2}", self.score).unwrap();
        out
    }

    pub fn parse(text: &str) -> Result<Self> {
        let corrupt = |what: &str| FlowalignError::CorruptStats(what.to_string());

        let mut tile_keys = None;
        let mut offsets = None;
        let mut rotations = None;
        let mut scales = None;
        let mut exclusive_hits = None;
        let mut good_mutual_hits = None;
        let mut bad_mutual_hits = 0;
        let mut non_mutual_hits = 0;
        let mut r_residual = 0.0;
        let mut c_residual = 0.0;
        let mut score = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line.split_once(':').ok_or_else(|| corrupt(line))?;
            let value = value.trim();
            match key.trim() {
                "tile" => {
                    tile_keys = Some(value.split(',').map(|s| s.trim().to_string()).collect());
                }
                "rc_offset" => offsets = Some(parse_offsets(value)?),
                "rotation" => rotations = Some(parse_floats(value)?),
                "scale" => scales = Some(parse_floats(value)?),
                "exclusive_hits" => exclusive_hits = Some(parse_count(value)?),
                "good_mutual_hits" => good_mutual_hits = Some(parse_count(value)?),
                "bad_mutual_hits" => bad_mutual_hits = parse_count(value)?,
                "non_mutual_hits" => non_mutual_hits = parse_count(value)?,
                "r_residual" => r_residual = parse_float(value)?,
                "c_residual" => c_residual = parse_float(value)?,
                "score" => score = Some(parse_float(value)?),
                // Tolerate keys written by newer versions.
                _ => {}
            }
        }

        let tile_keys: Vec<String> = tile_keys.ok_or_else(|| corrupt("missing tile"))?;
        let offsets: Vec<[f64; 2]> = offsets.ok_or_else(|| corrupt("missing rc_offset"))?;
        let rotations: Vec<f64> = rotations.ok_or_else(|| corrupt("missing rotation"))?;
        let scales: Vec<f64> = scales.ok_or_else(|| corrupt("missing scale"))?;
        if tile_keys.is_empty()
            || tile_keys.len() != offsets.len()
            || tile_keys.len() != rotations.len()
            || tile_keys.len() != scales.len()
        {
            return Err(corrupt("tile/pose arity mismatch"));
        }

        Ok(Self {
            tile_keys,
            offsets,
            rotations,
            scales,
            exclusive_hits: exclusive_hits.ok_or_else(|| corrupt("missing exclusive_hits"))?,
            good_mutual_hits: good_mutual_hits
                .ok_or_else(|| corrupt("missing good_mutual_hits"))?,
            bad_mutual_hits,
            non_mutual_hits,
            r_residual,
            c_residual,
            score: score.ok_or_else(|| corrupt("missing score"))?,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }
}

/// Score stored in a stats file, or 0 when the file is absent or corrupt so
/// any successful new alignment replaces it.
pub fn load_existing_score(path: &Path) -> f64 {
    match AlignmentStats::from_file(path) {
        Ok(stats) => stats.score,
        Err(_) => 0.0,
    }
}

fn join_floats(values: &[f64], precision: usize) -> String {
    values
        .iter()
        .map(|v| format!("{:.*}", precision, v))
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_float(value: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .map_err(|_| FlowalignError::CorruptStats(value.to_string()))
}

fn parse_count(value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| FlowalignError::CorruptStats(value.to_string()))
}

fn parse_floats(value: &str) -> Result<Vec<f64>> {
    value.split(',').map(parse_float).collect()
}

/// Parse one or more `(r,c)` tuples separated by commas.
fn parse_offsets(value: &str) -> Result<Vec<[f64; 2]>> {
    let corrupt = || FlowalignError::CorruptStats(value.to_string());
    let mut offsets = Vec::new();
    for tuple in value.split("),") {
        let tuple = tuple
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .trim_start_matches(',')
            .trim_start_matches('(');
        let (r, c) = tuple.split_once(',').ok_or_else(corrupt)?;
        offsets.push([parse_float(r)?, parse_float(c)?]);
    }
    if offsets.is_empty() {
        return Err(corrupt());
    }
    Ok(offsets)
}
