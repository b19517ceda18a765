use std::fs;

use approx::assert_abs_diff_eq;
use tempfile::tempdir;

use flowalign_core::stats::{alignment_score, load_existing_score, AlignmentStats};

fn sample_stats() -> AlignmentStats {
    AlignmentStats {
        tile_keys: vec!["lane1tile2111".into(), "lane1tile2112".into()],
        offsets: vec![[881.26, -22.14], [880.92, -20.07]],
        rotations: vec![180.0231, 180.0198],
        scales: vec![0.3734, 0.3729],
        exclusive_hits: 142,
        good_mutual_hits: 31,
        bad_mutual_hits: 12,
        non_mutual_hits: 44,
        r_residual: 0.21,
        c_residual: 0.19,
        score: alignment_score(142, 31),
    }
}

#[test]
fn test_serialize_parse_roundtrip() {
    let stats = sample_stats();
    let parsed = AlignmentStats::parse(&stats.serialized()).unwrap();
    assert_eq!(parsed.tile_keys, stats.tile_keys);
    assert_eq!(parsed.exclusive_hits, 142);
    assert_eq!(parsed.good_mutual_hits, 31);
    assert_eq!(parsed.bad_mutual_hits, 12);
    assert_eq!(parsed.non_mutual_hits, 44);
    for (a, b) in parsed.offsets.iter().zip(&stats.offsets) {
        assert_abs_diff_eq!(a[0], b[0], epsilon = 1e-4);
        assert_abs_diff_eq!(a[1], b[1], epsilon = 1e-4);
    }
    assert_abs_diff_eq!(parsed.rotations[1], 180.0198, epsilon = 1e-6);
    assert_abs_diff_eq!(parsed.score, stats.score, epsilon = 1e-2);
}

#[test]
fn test_score_weighting() {
    // Good-mutual hits count, but strictly less than exclusive ones.
    assert!(alignment_score(10, 0) > alignment_score(9, 1));
    assert!(alignment_score(9, 1) > alignment_score(9, 0));
}

#[test]
fn test_single_tile_serialization() {
    let mut stats = sample_stats();
    stats.tile_keys.truncate(1);
    stats.offsets.truncate(1);
    stats.rotations.truncate(1);
    stats.scales.truncate(1);
    let parsed = AlignmentStats::parse(&stats.serialized()).unwrap();
    assert_eq!(parsed.tile_keys.len(), 1);
    assert_abs_diff_eq!(parsed.offsets[0][1], -22.14, epsilon = 1e-4);
}

#[test]
fn test_corrupt_stats_score_zero() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("phix_3_0_stats.txt");

    assert_eq!(load_existing_score(&path), 0.0);

    fs::write(&path, "this is not a stats file\n").unwrap();
    assert_eq!(load_existing_score(&path), 0.0);
    assert!(AlignmentStats::from_file(&path).is_err());

    fs::write(&path, sample_stats().serialized()).unwrap();
    assert!(load_existing_score(&path) > 100.0);
}

#[test]
fn test_parse_rejects_arity_mismatch() {
    let text = "tile:lane1tile2111,lane1tile2112\n\
                rc_offset:(1.0,2.0)\n\
                rotation:180.0\n\
                scale:0.37\n\
                exclusive_hits:5\n\
                good_mutual_hits:2\n\
                score:6.80\n";
    assert!(AlignmentStats::parse(text).is_err());
}
