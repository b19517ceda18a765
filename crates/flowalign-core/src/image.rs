use ndarray::Array2;
use num_complex::Complex;

use crate::consts::IMAGE_TILE_SIZE;
use crate::error::{FlowalignError, Result};
use crate::kernel::fft::fft2d_forward;
use crate::kernel::{median_normalize, pad_to_power_of_two};

/// One microscope field of view from an acquisition grid.
///
/// Pixel data is median-normalized at construction so the multiplicative
/// background sits at zero. The FFT is computed lazily per padding request
/// because the canvas size depends on the candidate tile being correlated.
#[derive(Clone, Debug)]
pub struct Image {
    pub data: Array2<f32>,
    pub row: usize,
    pub column: usize,
    /// Index string `{channel}_{row}_{column}`, used for catalog and output
    /// file names.
    pub index: String,
    fft: Option<(/* pad */ (usize, usize), Array2<Complex<f64>>)>,
}

impl Image {
    pub fn new(data: Array2<f32>, channel: &str, row: usize, column: usize) -> Result<Self> {
        let (h, w) = data.dim();
        if h == 0 || w == 0 || h % IMAGE_TILE_SIZE != 0 || w % IMAGE_TILE_SIZE != 0 {
            return Err(FlowalignError::InvalidShape(format!(
                "image is {}x{}, sides must be non-zero multiples of {}",
                h, w, IMAGE_TILE_SIZE
            )));
        }
        Ok(Self {
            data: median_normalize(&data),
            row,
            column,
            index: format!("{}_{}_{}", channel, row, column),
            fft: None,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// FFT of the image over a canvas padded by `pad` on the top/left and
    /// grown to the next power of two. Cached until the pad changes.
    pub fn fft(&mut self, pad: (usize, usize)) -> Result<&Array2<Complex<f64>>> {
        let stale = match &self.fft {
            Some((cached_pad, _)) => *cached_pad != pad,
            None => true,
        };
        if stale {
            let padded = pad_to_power_of_two(&self.data, pad)?;
            self.fft = Some((pad, fft2d_forward(&padded)));
        }
        Ok(&self.fft.as_ref().unwrap().1)
    }
}
