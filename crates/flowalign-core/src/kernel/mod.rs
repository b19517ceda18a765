pub mod fft;

use kiddo::{ImmutableKdTree, SquaredEuclidean};
use ndarray::Array2;

use crate::error::{FlowalignError, Result};

/// Smallest power of two greater than or equal to `n`. Undefined for `n == 0`.
pub fn next_pow2(n: usize) -> usize {
    n.next_power_of_two()
}

/// Divide by the global median and subtract one, so that the multiplicative
/// background of the image becomes zero.
pub fn median_normalize(img: &Array2<f32>) -> Array2<f32> {
    let med = median(img);
    img.mapv(|v| v / med - 1.0)
}

fn median(img: &Array2<f32>) -> f32 {
    let mut values: Vec<f32> = img.iter().copied().collect();
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

/// Pad `img` by `pad` on the top/left and with zeros on the bottom/right so
/// the canvas reaches the next power of two in both dimensions.
pub fn pad_to_power_of_two(img: &Array2<f32>, pad: (usize, usize)) -> Result<Array2<f32>> {
    let (h, w) = img.dim();
    let canvas = (next_pow2(pad.0 + h), next_pow2(pad.1 + w));
    if !canvas.0.is_power_of_two() || !canvas.1.is_power_of_two() {
        return Err(FlowalignError::InvalidShape(format!(
            "FFT canvas {}x{} is not a power of two",
            canvas.0, canvas.1
        )));
    }
    let mut out = Array2::<f32>::zeros(canvas);
    out.slice_mut(ndarray::s![pad.0..pad.0 + h, pad.1..pad.1 + w])
        .assign(img);
    Ok(out)
}

/// Zero-pad `img` on the bottom/right to exactly `size`.
pub fn pad_to_size(img: &Array2<f32>, size: (usize, usize)) -> Result<Array2<f32>> {
    let (h, w) = img.dim();
    if h > size.0 || w > size.1 {
        return Err(FlowalignError::InvalidShape(format!(
            "cannot pad {}x{} down to {}x{}",
            h, w, size.0, size.1
        )));
    }
    let mut out = Array2::<f32>::zeros(size);
    out.slice_mut(ndarray::s![..h, ..w]).assign(img);
    Ok(out)
}

/// Right-handed 2x2 rotation matrix `[[cos, sin], [-sin, cos]]` for an angle
/// in degrees.
pub fn rotation_matrix(degrees: f64) -> [[f64; 2]; 2] {
    let rad = degrees.to_radians();
    let (sin, cos) = rad.sin_cos();
    [[cos, sin], [-sin, cos]]
}

/// For every point in `a`, the index of its nearest neighbor in `b` and the
/// Euclidean distance to it. Returns an empty vector when `b` is empty.
pub fn nearest_neighbors(a: &[[f64; 2]], b: &[[f64; 2]]) -> Vec<(usize, f64)> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let tree: ImmutableKdTree<f64, 2> = ImmutableKdTree::new_from_slice(b);
    a.iter()
        .map(|p| {
            let nn = tree.nearest_one::<SquaredEuclidean>(p);
            (nn.item as usize, nn.distance.sqrt())
        })
        .collect()
}

/// Row/column index of the maximum entry.
pub fn max_2d_idx(data: &Array2<f64>) -> (usize, usize, f64) {
    let (h, w) = data.dim();
    let mut best_row = 0;
    let mut best_col = 0;
    let mut best_val = f64::NEG_INFINITY;

    for row in 0..h {
        for col in 0..w {
            if data[[row, col]] > best_val {
                best_val = data[[row, col]];
                best_row = row;
                best_col = col;
            }
        }
    }

    (best_row, best_col, best_val)
}
