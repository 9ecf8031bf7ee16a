//! Frequency-domain skew estimation
//!
//! Text lines concentrate spectral energy along the direction
//! perpendicular to them. The strongest cells of the centered magnitude
//! spectrum vote for lines through the center; the peak of the vote
//! histogram, refined to a weighted mean, is the skew.
//!
//! Pipeline: transform → sample → vote → refine.

use rayon::prelude::*;
use tracing::debug;

use super::fft::ComplexMatrix;
use super::types::{DeskewError, DeskewOptions, Result, FLAT_SPECTRUM_EPSILON, PEAK_BAND_LEVEL};
use crate::raster::{PixelFormat, RasterImage};
use crate::util;
use num_complex::Complex64;

/// One selected spectrum cell, as an offset from the spectrum center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralSample {
    pub x: f64,
    pub y: f64,
    /// Radially weighted magnitude
    pub magnitude: f64,
}

/// Skew estimator over square power-of-two gray previews
#[derive(Debug, Clone)]
pub struct SkewEstimator {
    sample_count: usize,
    angle_step: f64,
    line_tolerance: f64,
    monotone_tolerance: usize,
    parallel: bool,
}

impl Default for SkewEstimator {
    fn default() -> Self {
        Self::from_options(&DeskewOptions::default())
    }
}

impl SkewEstimator {
    pub fn from_options(options: &DeskewOptions) -> Self {
        Self {
            sample_count: options.sample_count.max(1),
            angle_step: options.angle_step,
            line_tolerance: options.line_tolerance,
            monotone_tolerance: options.monotone_tolerance,
            parallel: options.parallel_fft,
        }
    }

    /// Clockwise skew of the content in radians, within (-π/4, π/4]
    pub fn estimate(&self, image: &RasterImage) -> Result<f64> {
        let spectrum = self.transform(image)?;
        let samples = self.sample(&spectrum)?;
        let histogram = self.vote(&samples);
        let angle = self.refine(&histogram)?;
        debug!(
            size = image.width(),
            samples = samples.len(),
            angle,
            "spectral skew estimate"
        );
        Ok(angle)
    }

    /// Centered spectrum of the ink intensity `1 - v / 255`
    ///
    /// The checkerboard sign flip moves the zero frequency to the middle
    /// cell.
    pub fn transform(&self, image: &RasterImage) -> Result<ComplexMatrix> {
        image.require_format(PixelFormat::Gray8, "skew estimation")?;
        let (width, height) = image.dimensions();
        if width != height {
            return Err(DeskewError::NotPowerOfTwo { width, height });
        }

        let mut matrix = ComplexMatrix::from_fn(width as usize, height as usize, |x, y| {
            let ink = 1.0 - image.get_pixel(x as u32, y as u32) as f64 / 255.0;
            let sign = if (x + y) % 2 == 0 { 1.0 } else { -1.0 };
            Complex64::new(ink * sign, 0.0)
        })?;
        matrix.fft_2d(self.parallel);
        Ok(matrix)
    }

    /// Strongest cells after weighting by distance from the center
    ///
    /// The weight `min(1, 0.5 + 0.5 * d² / dmax²)` damps the low
    /// frequencies shared by every direction.
    pub fn sample(&self, spectrum: &ComplexMatrix) -> Result<Vec<SpectralSample>> {
        let (width, height) = (spectrum.width(), spectrum.height());
        let (cx, cy) = ((width / 2) as f64, (height / 2) as f64);
        let d_max = (width.min(height) / 2).max(1) as f64;

        let mut samples = Vec::with_capacity(width * height);
        let mut strongest = 0.0f64;
        for y in 0..height {
            for x in 0..width {
                let (dx, dy) = (x as f64 - cx, y as f64 - cy);
                let weight = (0.5 + 0.5 * (dx * dx + dy * dy) / (d_max * d_max)).min(1.0);
                let magnitude = spectrum.get(x, y).norm() * weight;
                strongest = strongest.max(magnitude);
                if magnitude > 0.0 {
                    samples.push(SpectralSample {
                        x: dx,
                        y: dy,
                        magnitude,
                    });
                }
            }
        }

        if strongest <= FLAT_SPECTRUM_EPSILON {
            return Err(DeskewError::FlatSpectrum);
        }
        if samples.is_empty() {
            return Err(DeskewError::NoSpectralSamples);
        }

        if samples.len() > self.sample_count {
            samples.select_nth_unstable_by(self.sample_count - 1, |a, b| {
                b.magnitude.total_cmp(&a.magnitude)
            });
            samples.truncate(self.sample_count);
        }
        Ok(samples)
    }

    /// Number of angle buckets covering [0, π)
    fn bucket_count(&self) -> usize {
        ((std::f64::consts::PI / self.angle_step).round() as usize).max(1)
    }

    fn votes_for(&self, angle: f64, samples: &[SpectralSample]) -> u64 {
        let (sin, cos) = angle.sin_cos();
        samples
            .iter()
            .filter(|s| {
                let to_line = (s.x * sin - s.y * cos).abs();
                let to_perpendicular = (s.x * cos + s.y * sin).abs();
                to_line <= self.line_tolerance || to_perpendicular <= self.line_tolerance
            })
            .count() as u64
    }

    /// Votes per bucket for lines through the center (or their
    /// perpendiculars) passing near each sample
    pub fn vote(&self, samples: &[SpectralSample]) -> Vec<u64> {
        let buckets = self.bucket_count();
        let angle_of = |b: usize| b as f64 * self.angle_step;
        if self.parallel {
            (0..buckets)
                .into_par_iter()
                .map(|b| self.votes_for(angle_of(b), samples))
                .collect()
        } else {
            (0..buckets)
                .map(|b| self.votes_for(angle_of(b), samples))
                .collect()
        }
    }

    /// Weighted mean of the band of buckets around the peak
    ///
    /// The band holds the buckets next to the peak that stay above
    /// [`PEAK_BAND_LEVEL`] of its height over the floor; each weighs its
    /// excess over that level.
    pub fn refine(&self, histogram: &[u64]) -> Result<f64> {
        let n = histogram.len();
        let (Some(&min), Some(&max)) = (histogram.iter().min(), histogram.iter().max()) else {
            return Err(DeskewError::DegenerateHistogram);
        };
        if min == max {
            return Err(DeskewError::DegenerateHistogram);
        }

        let peak = histogram.iter().position(|&c| c == max).unwrap_or(0);
        let center = n / 2;
        // bucket `i` of the view is `i - center` buckets away from the peak
        let view: Vec<u64> = (0..n).map(|i| histogram[(peak + n + i - center) % n]).collect();
        let level = min as f64 + (max - min) as f64 * PEAK_BAND_LEVEL;

        let lower = self.band_edge(view[..center].iter().rev().copied(), max, level);
        let upper = self.band_edge(view[center + 1..].iter().copied(), max, level);

        let mut weight_sum = 0.0;
        let mut offset_sum = 0.0;
        for i in center - lower..=center + upper {
            let weight = view[i] as f64 - level;
            weight_sum += weight;
            offset_sum += weight * (i as f64 - center as f64);
        }
        if weight_sum <= 0.0 {
            return Err(DeskewError::EmptyPeakBand);
        }

        let bucket = peak as f64 + offset_sum / weight_sum;
        let angle = util::fold_quarter_turn(util::reduce_acute(bucket * self.angle_step));
        debug!(peak, lower, upper, angle, "refined angle histogram peak");
        Ok(angle)
    }

    /// Buckets accepted walking away from the peak
    ///
    /// The walk ends at the first count below `level`. Counts may stay
    /// level or drop; each rise uses up one tolerated step, and the walk
    /// also ends once they are exhausted.
    fn band_edge(&self, counts: impl Iterator<Item = u64>, peak: u64, level: f64) -> usize {
        let mut last = peak;
        let mut rises = 0;
        let mut accepted = 0;
        for count in counts {
            if (count as f64) < level {
                break;
            }
            if count <= last {
                last = count;
            } else {
                rises += 1;
                if rises > self.monotone_tolerance {
                    break;
                }
            }
            accepted += 1;
        }
        accepted
    }
}
