//! Radix-2 two-dimensional FFT
//!
//! Rows are transformed in place, the matrix is transposed, rows are
//! transformed again and the matrix is transposed back. Both sides must
//! be powers of two.

use num_complex::Complex64;
use rayon::prelude::*;

use super::types::{DeskewError, Result};

/// Row-major complex matrix
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexMatrix {
    width: usize,
    height: usize,
    data: Vec<Complex64>,
}

impl ComplexMatrix {
    /// Zero matrix; both sides must be powers of two
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if !width.is_power_of_two() || !height.is_power_of_two() {
            return Err(DeskewError::NotPowerOfTwo {
                width: width as u32,
                height: height as u32,
            });
        }
        Ok(Self {
            width,
            height,
            data: vec![Complex64::new(0.0, 0.0); width * height],
        })
    }

    /// Matrix from `f(x, y)`
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> Complex64,
    ) -> Result<Self> {
        let mut matrix = Self::new(width, height)?;
        for y in 0..height {
            for x in 0..width {
                matrix.data[y * width + x] = f(x, y);
            }
        }
        Ok(matrix)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Complex64 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: Complex64) {
        self.data[y * self.width + x] = value;
    }

    fn transform_rows(&mut self, parallel: bool) {
        if parallel {
            self.data.par_chunks_mut(self.width).for_each(fft_in_place);
        } else {
            self.data.chunks_mut(self.width).for_each(fft_in_place);
        }
    }

    fn transpose(&mut self) {
        let mut transposed = Vec::with_capacity(self.data.len());
        for x in 0..self.width {
            for y in 0..self.height {
                transposed.push(self.data[y * self.width + x]);
            }
        }
        self.data = transposed;
        std::mem::swap(&mut self.width, &mut self.height);
    }

    /// Forward 2D transform in place
    pub fn fft_2d(&mut self, parallel: bool) {
        self.transform_rows(parallel);
        self.transpose();
        self.transform_rows(parallel);
        self.transpose();
    }
}

/// Reorder `buf` by bit-reversed index
fn bit_reverse_permute(buf: &mut [Complex64]) {
    let n = buf.len();
    if n <= 2 {
        return;
    }
    let shift = usize::BITS - n.trailing_zeros();
    for i in 0..n {
        let j = i.reverse_bits() >> shift;
        if j > i {
            buf.swap(i, j);
        }
    }
}

/// Forward 1D FFT in place; `buf.len()` must be a power of two
pub fn fft_in_place(buf: &mut [Complex64]) {
    let n = buf.len();
    debug_assert!(n.is_power_of_two(), "FFT length {n} is not a power of two");
    bit_reverse_permute(buf);

    let mut len = 2;
    while len <= n {
        let half = len / 2;
        let step = -2.0 * std::f64::consts::PI / len as f64;
        let twiddles: Vec<Complex64> = (0..half)
            .map(|k| Complex64::from_polar(1.0, step * k as f64))
            .collect();
        for chunk in buf.chunks_mut(len) {
            for k in 0..half {
                let even = chunk[k];
                let odd = chunk[k + half] * twiddles[k];
                chunk[k] = even + odd;
                chunk[k + half] = even - odd;
            }
        }
        len <<= 1;
    }
}
