use ndarray::Array2;
use num_complex::Complex;
use rayon::prelude::*;
use rustfft::FftPlanner;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// 2D forward FFT with parallel row/column passes for large canvases.
pub fn fft2d_forward(data: &Array2<f32>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut work = Array2::<Complex<f64>>::zeros((h, w));
    for row in 0..h {
        for col in 0..w {
            work[[row, col]] = Complex::new(data[[row, col]] as f64, 0.0);
        }
    }

    let mut planner = FftPlanner::new();
    let fft_row = planner.plan_fft_forward(w);
    let fft_col = planner.plan_fft_forward(h);
    transform_rows(&mut work, &fft_row);
    transform_cols(&mut work, &fft_col);
    work
}

/// 2D inverse FFT, returning the real part normalized by `1/(h*w)`.
pub fn ifft2d_inverse(data: &Array2<Complex<f64>>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let ifft_row = planner.plan_fft_inverse(w);
    let ifft_col = planner.plan_fft_inverse(h);

    let mut work = data.clone();
    transform_cols(&mut work, &ifft_col);
    transform_rows(&mut work, &ifft_row);

    let scale = 1.0 / (h * w) as f64;
    work.mapv(|v| v.re * scale)
}

/// Elementwise `conj(a) * b`, the cross-correlation spectrum.
pub fn conjugate_product(
    a: &Array2<Complex<f64>>,
    b: &Array2<Complex<f64>>,
) -> Array2<Complex<f64>> {
    let mut out = a.clone();
    out.zip_mut_with(b, |av, &bv| *av = av.conj() * bv);
    out
}

fn transform_rows(work: &mut Array2<Complex<f64>>, fft: &std::sync::Arc<dyn rustfft::Fft<f64>>) {
    let (h, w) = work.dim();
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        let rows: Vec<Vec<Complex<f64>>> = (0..h)
            .into_par_iter()
            .map(|row| {
                let mut row_data: Vec<Complex<f64>> = (0..w).map(|c| work[[row, c]]).collect();
                fft.process(&mut row_data);
                row_data
            })
            .collect();
        for (row, row_data) in rows.into_iter().enumerate() {
            for (col, val) in row_data.into_iter().enumerate() {
                work[[row, col]] = val;
            }
        }
    } else {
        for row in 0..h {
            let mut row_data: Vec<Complex<f64>> = (0..w).map(|c| work[[row, c]]).collect();
            fft.process(&mut row_data);
            for col in 0..w {
                work[[row, col]] = row_data[col];
            }
        }
    }
}

fn transform_cols(work: &mut Array2<Complex<f64>>, fft: &std::sync::Arc<dyn rustfft::Fft<f64>>) {
    let (h, w) = work.dim();
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        let cols: Vec<Vec<Complex<f64>>> = (0..w)
            .into_par_iter()
            .map(|col| {
                let mut col_data: Vec<Complex<f64>> = (0..h).map(|r| work[[r, col]]).collect();
                fft.process(&mut col_data);
                col_data
            })
            .collect();
        for (col, col_data) in cols.into_iter().enumerate() {
            for (row, val) in col_data.into_iter().enumerate() {
                work[[row, col]] = val;
            }
        }
    } else {
        for col in 0..w {
            let mut col_data: Vec<Complex<f64>> = (0..h).map(|r| work[[r, col]]).collect();
            fft.process(&mut col_data);
            for row in 0..h {
                work[[row, col]] = col_data[row];
            }
        }
    }
}
