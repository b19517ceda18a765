use approx::assert_abs_diff_eq;
use ndarray::Array2;

use flowalign_core::kernel::fft::{conjugate_product, fft2d_forward, ifft2d_inverse};
use flowalign_core::kernel::{
    max_2d_idx, median_normalize, nearest_neighbors, next_pow2, pad_to_power_of_two, pad_to_size,
    rotation_matrix,
};

#[test]
fn test_next_pow2() {
    assert_eq!(next_pow2(1), 1);
    assert_eq!(next_pow2(2), 2);
    assert_eq!(next_pow2(3), 4);
    assert_eq!(next_pow2(512), 512);
    assert_eq!(next_pow2(513), 1024);
    assert_eq!(next_pow2(1537), 2048);
}

#[test]
fn test_median_normalize_background_at_zero() {
    let mut img = Array2::<f32>::from_elem((8, 8), 50.0);
    img[[2, 3]] = 500.0;
    let normalized = median_normalize(&img);
    assert_abs_diff_eq!(normalized[[0, 0]], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(normalized[[2, 3]], 9.0, epsilon = 1e-5);
}

#[test]
fn test_pad_to_power_of_two_dimensions() {
    let img = Array2::<f32>::ones((512, 512));
    let padded = pad_to_power_of_two(&img, (300, 200)).unwrap();
    let (h, w) = padded.dim();
    assert!(h.is_power_of_two() && w.is_power_of_two());
    assert_eq!((h, w), (1024, 1024));
    // Content is shifted by the pad amount.
    assert_eq!(padded[[299, 199]], 0.0);
    assert_eq!(padded[[300, 200]], 1.0);
    assert_eq!(padded[[300 + 511, 200 + 511]], 1.0);
    assert_eq!(padded[[300 + 512, 200 + 512]], 0.0);
}

#[test]
fn test_pad_to_size_rejects_shrinking() {
    let img = Array2::<f32>::ones((16, 16));
    assert!(pad_to_size(&img, (8, 32)).is_err());
    let padded = pad_to_size(&img, (32, 32)).unwrap();
    assert_eq!(padded.dim(), (32, 32));
    assert_eq!(padded[[15, 15]], 1.0);
    assert_eq!(padded[[16, 16]], 0.0);
}

#[test]
fn test_rotation_matrix_is_right_handed() {
    let m = rotation_matrix(90.0);
    assert_abs_diff_eq!(m[0][0], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(m[0][1], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(m[1][0], -1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(m[1][1], 0.0, epsilon = 1e-12);
}

#[test]
fn test_fft_roundtrip() {
    let mut img = Array2::<f32>::zeros((16, 16));
    img[[3, 5]] = 2.0;
    img[[10, 12]] = -1.0;
    let spectrum = fft2d_forward(&img);
    let back = ifft2d_inverse(&spectrum);
    for r in 0..16 {
        for c in 0..16 {
            assert_abs_diff_eq!(back[[r, c]], img[[r, c]] as f64, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_correlation_peak_at_shift() {
    // A delta at the origin correlated with a delta at (4, 6) peaks at the
    // displacement between them.
    let mut a = Array2::<f32>::zeros((32, 32));
    a[[0, 0]] = 1.0;
    let mut b = Array2::<f32>::zeros((32, 32));
    b[[4, 6]] = 1.0;
    let corr = ifft2d_inverse(&conjugate_product(&fft2d_forward(&a), &fft2d_forward(&b)));
    let (r, c, peak) = max_2d_idx(&corr);
    assert_eq!((r, c), (4, 6));
    assert!(peak > 0.9);
}

#[test]
fn test_nearest_neighbors() {
    let a = vec![[0.0, 0.0], [10.0, 10.0]];
    let b = vec![[9.0, 10.0], [0.5, 0.0], [50.0, 50.0]];
    let nn = nearest_neighbors(&a, &b);
    assert_eq!(nn[0].0, 1);
    assert_abs_diff_eq!(nn[0].1, 0.5, epsilon = 1e-12);
    assert_eq!(nn[1].0, 0);
    assert_abs_diff_eq!(nn[1].1, 1.0, epsilon = 1e-12);
}
