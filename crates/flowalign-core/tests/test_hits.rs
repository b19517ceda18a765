use flowalign_core::align::classify_hits;

#[test]
fn test_exclusive_hit_is_one_to_one() {
    let reads = vec![[10.0, 10.0], [50.0, 50.0]];
    let catalog = vec![[10.5, 10.0], [50.0, 50.5]];
    let summary = classify_hits(&reads, &catalog);
    assert_eq!(summary.exclusive, 2);
    assert_eq!(summary.good_mutual, 0);
    assert_eq!(summary.pairs, vec![(0, 0), (1, 1)]);
}

#[test]
fn test_crowded_mutual_pair_is_not_exclusive() {
    // Two catalog points inside the exclusive radius of one read: still a
    // mutual pair, but demoted to good-mutual.
    let reads = vec![[10.0, 10.0], [80.0, 80.0]];
    let catalog = vec![[10.5, 10.0], [10.0, 10.8], [80.0, 80.0]];
    let summary = classify_hits(&reads, &catalog);
    assert_eq!(summary.exclusive, 1);
    assert_eq!(summary.good_mutual, 1);
    assert_eq!(summary.hit_count(), 2);
}

#[test]
fn test_distant_mutual_pair_is_bad() {
    let reads = vec![[0.0, 0.0]];
    let catalog = vec![[5.0, 5.0]];
    let summary = classify_hits(&reads, &catalog);
    assert_eq!(summary.exclusive, 0);
    assert_eq!(summary.good_mutual, 0);
    assert_eq!(summary.bad_mutual, 1);
    assert!(summary.pairs.is_empty());
}

#[test]
fn test_non_mutual_read_is_counted() {
    // Both reads are nearest to the same catalog point; only one is mutual.
    let reads = vec![[10.0, 10.0], [11.5, 10.0]];
    let catalog = vec![[10.4, 10.0]];
    let summary = classify_hits(&reads, &catalog);
    assert_eq!(summary.exclusive + summary.good_mutual, 1);
    assert_eq!(summary.non_mutual, 1);
}

#[test]
fn test_empty_inputs() {
    assert_eq!(classify_hits(&[], &[[1.0, 1.0]]).hit_count(), 0);
    assert_eq!(classify_hits(&[[1.0, 1.0]], &[]).hit_count(), 0);
}
