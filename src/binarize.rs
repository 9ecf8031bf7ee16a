//! Binarization
//!
//! Otsu thresholding over the 256-bin intensity histogram, the
//! [`BinaryMask`] it produces, and background flattening used before
//! spectral analysis.

use tracing::debug;

use crate::raster::{PixelFormat, RasterImage, Rect, Result, WHITE};

/// Class probabilities closer than this to 0 or 1 do not form a split
pub const OTSU_CLASS_EPSILON: f64 = 1e-15;

/// Width x height grid of ink flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl BinaryMask {
    /// All-background mask
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    /// Build a mask by evaluating `f(x, y)` for every pixel
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut mask = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    mask.set(x, y, true);
                }
            }
        }
        mask
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "mask cell ({x}, {y}) outside {}x{}",
            self.width,
            self.height
        );
        y as usize * self.width as usize + x as usize
    }

    /// Ink flag at `(x, y)`; panics outside the mask
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, ink: bool) {
        let i = self.index(x, y);
        self.bits[i] = ink;
    }

    /// Number of ink cells
    pub fn count_ink(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Number of ink cells inside `rect`
    pub fn count_ink_in(&self, rect: &Rect) -> usize {
        let mut count = 0;
        for y in rect.top..rect.bottom().min(self.height) {
            for x in rect.left..rect.right().min(self.width) {
                count += usize::from(self.get(x, y));
            }
        }
        count
    }

    /// Copy turned a quarter turn clockwise (dimensions swap)
    ///
    /// Cell `(x, y)` moves to `(height - 1 - y, x)`.
    pub fn rotate_clockwise(&self) -> BinaryMask {
        let mut turned = BinaryMask::new(self.height, self.width);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) {
                    turned.set(self.height - 1 - y, x, true);
                }
            }
        }
        turned
    }

    /// Render as an 8-bit image, ink black on white
    pub fn to_raster(&self) -> RasterImage {
        let mut image = RasterImage::blank(self.width, self.height, PixelFormat::Gray8);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) {
                    image.set_pixel(x, y, 0);
                }
            }
        }
        image
    }
}

/// 256-bin intensity histogram of an 8-bit gray image
pub fn histogram(image: &RasterImage) -> Result<[u64; 256]> {
    image.require_format(PixelFormat::Gray8, "histogram")?;
    let mut hist = [0u64; 256];
    for y in 0..image.height() {
        for &v in image.row(y) {
            hist[v as usize] += 1;
        }
    }
    Ok(hist)
}

/// Otsu's threshold over a histogram
///
/// Maximizes the between-class variance `q1 * q2 * (mu1 - mu2)^2`.
/// Returns 0 when no split has both classes populated.
pub fn otsu_threshold_from_histogram(hist: &[u64; 256]) -> u8 {
    otsu_split(hist).unwrap_or(0)
}

/// Otsu's split, `None` when no split has both classes populated
pub fn otsu_split(hist: &[u64; 256]) -> Option<u8> {
    let total: u64 = hist.iter().sum();
    if total == 0 {
        return None;
    }
    let total = total as f64;

    let mean: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64 / total)
        .sum();

    let mut best: Option<u8> = None;
    let mut max_variance = 0.0f64;
    let mut q1 = 0.0f64;
    let mut weighted_sum = 0.0f64;

    for (t, &count) in hist.iter().enumerate() {
        let p = count as f64 / total;
        q1 += p;
        weighted_sum += t as f64 * p;

        if q1 < OTSU_CLASS_EPSILON || q1 > 1.0 - OTSU_CLASS_EPSILON {
            continue;
        }
        let q2 = 1.0 - q1;
        let mu1 = weighted_sum / q1;
        let mu2 = (mean - weighted_sum) / q2;
        let variance = q1 * q2 * (mu1 - mu2).powi(2);

        if best.is_none() || variance > max_variance {
            max_variance = variance;
            best = Some(t as u8);
        }
    }

    best
}

/// Otsu's threshold of an 8-bit gray image
pub fn otsu_threshold(image: &RasterImage) -> Result<u8> {
    Ok(otsu_threshold_from_histogram(&histogram(image)?))
}

/// Binarize with an explicit threshold: ink where pixel <= threshold
pub fn binarize_with(image: &RasterImage, threshold: u8) -> Result<BinaryMask> {
    image.require_format(PixelFormat::Gray8, "binarize")?;
    let mut mask = BinaryMask::new(image.width(), image.height());
    for y in 0..image.height() {
        for (x, &v) in image.row(y).iter().enumerate() {
            if v <= threshold {
                mask.set(x as u32, y, true);
            }
        }
    }
    Ok(mask)
}

/// Binarize with Otsu's threshold
pub fn binarize(image: &RasterImage) -> Result<BinaryMask> {
    let threshold = otsu_threshold(image)?;
    debug!(threshold, "otsu binarization");
    binarize_with(image, threshold)
}

/// Whiten the background in place
///
/// A second Otsu pass over the ink class of the first one finds the ink
/// core; everything lighter becomes white. The ink class is every level
/// at or below the first threshold, the same class [`binarize`] marks. An ink class of a single
/// level has no split and keeps the first threshold.
pub fn flatten_background(image: &mut RasterImage) -> Result<()> {
    let mut hist = histogram(image)?;
    let first = otsu_threshold_from_histogram(&hist);
    for count in hist.iter_mut().skip(first as usize + 1) {
        *count = 0;
    }
    let second = otsu_split(&hist).unwrap_or(first);
    debug!(first, second, "flattening background");

    for y in 0..image.height() {
        for v in image.row_mut(y) {
            if *v > second {
                *v = WHITE;
            }
        }
    }
    Ok(())
}
