//! Deskew module core types
//!
//! Errors, options and results shared by the skew estimator and the page
//! pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::margin::MarginError;
use crate::orientation::OrientationCorrection;
use crate::raster::{RasterError, RasterImage, Rect};

// ============================================================
// Constants
// ============================================================

/// Number of strongest spectrum cells that vote for an angle
pub const SPECTRAL_SAMPLE_COUNT: usize = 3000;

/// Width of one angle histogram bucket (radians)
pub const ANGLE_STEP: f64 = 0.01;

/// Distance from a candidate line within which a sample votes (pixels)
pub const VOTE_DISTANCE: f64 = 3.0;

/// Non-descending steps tolerated on each side of the histogram peak
pub const MONOTONE_TOLERANCE_STEPS: usize = 10;

/// Height, between the histogram floor and the peak, below which the
/// refined band ends
pub const PEAK_BAND_LEVEL: f64 = 0.5;

/// Spectra whose strongest weighted cell is below this are flat
pub const FLAT_SPECTRUM_EPSILON: f64 = 1e-9;

/// Largest side of the analysis previews (pixels, power of two)
pub const DEFAULT_PREVIEW_MAX_SIDE: u32 = 1024;

/// Smallest accepted preview side (pixels)
pub const MIN_PREVIEW_SIDE: u32 = 64;

/// Images above this resolution are downsampled before analysis (DPI)
pub const DEFAULT_MAX_ANALYSIS_DPI: f64 = 150.0;

// ============================================================
// Error Types
// ============================================================

/// Deskew error types
#[derive(Debug, Error)]
pub enum DeskewError {
    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),

    #[error("Border trimming failed: {0}")]
    Margin(#[from] MarginError),

    #[error("FFT size must be a power of two, got {width}x{height}")]
    NotPowerOfTwo { width: u32, height: u32 },

    #[error("Spectrum is flat: no dominant direction")]
    FlatSpectrum,

    #[error("No spectrum cells selected for voting")]
    NoSpectralSamples,

    #[error("Angle histogram is degenerate: every direction got the same votes")]
    DegenerateHistogram,

    #[error("Angle histogram peak band is empty")]
    EmptyPeakBand,
}

/// Coarse classification of a [`DeskewError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input holds no usable signal; callers usually treat the page
    /// as straight
    Indeterminate,
    /// The caller passed something the operation does not accept
    Precondition,
}

impl DeskewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeskewError::Raster(_) | DeskewError::NotPowerOfTwo { .. } => ErrorKind::Precondition,
            DeskewError::Margin(_)
            | DeskewError::FlatSpectrum
            | DeskewError::NoSpectralSamples
            | DeskewError::DegenerateHistogram
            | DeskewError::EmptyPeakBand => ErrorKind::Indeterminate,
        }
    }

    /// True when the page simply has nothing to measure
    pub fn is_indeterminate(&self) -> bool {
        self.kind() == ErrorKind::Indeterminate
    }
}

pub type Result<T> = std::result::Result<T, DeskewError>;

// ============================================================
// Options
// ============================================================

/// Deskew pipeline options
#[derive(Debug, Clone, PartialEq)]
pub struct DeskewOptions {
    /// Classify and correct quarter-turn orientation after deskewing
    pub detect_orientation: bool,
    /// Run FFT rows on the rayon pool
    pub parallel_fft: bool,
    /// Largest side of the analysis previews (power of two)
    pub preview_max_side: u32,
    /// Images above this resolution are downsampled for analysis (DPI)
    pub max_analysis_dpi: f64,
    /// Spectrum cells that vote for an angle
    pub sample_count: usize,
    /// Angle histogram bucket width (radians)
    pub angle_step: f64,
    /// Vote distance from a candidate line (pixels)
    pub line_tolerance: f64,
    /// Non-descending steps tolerated per side of the peak
    pub monotone_tolerance: usize,
}

impl Default for DeskewOptions {
    fn default() -> Self {
        Self {
            detect_orientation: true,
            parallel_fft: true,
            preview_max_side: DEFAULT_PREVIEW_MAX_SIDE,
            max_analysis_dpi: DEFAULT_MAX_ANALYSIS_DPI,
            sample_count: SPECTRAL_SAMPLE_COUNT,
            angle_step: ANGLE_STEP,
            line_tolerance: VOTE_DISTANCE,
            monotone_tolerance: MONOTONE_TOLERANCE_STEPS,
        }
    }
}

impl DeskewOptions {
    /// Create a new options builder
    pub fn builder() -> DeskewOptionsBuilder {
        DeskewOptionsBuilder::default()
    }

    /// Create options optimized for fast processing
    pub fn fast() -> Self {
        Self {
            preview_max_side: 512,
            sample_count: 1500,
            ..Default::default()
        }
    }

    /// Create options optimized for accuracy
    pub fn accurate() -> Self {
        Self {
            max_analysis_dpi: 300.0,
            sample_count: 5000,
            angle_step: 0.005,
            monotone_tolerance: 20,
            ..Default::default()
        }
    }
}

/// Builder for DeskewOptions
#[derive(Debug, Default)]
pub struct DeskewOptionsBuilder {
    options: DeskewOptions,
}

impl DeskewOptionsBuilder {
    /// Enable or disable orientation correction
    #[must_use]
    pub fn detect_orientation(mut self, enabled: bool) -> Self {
        self.options.detect_orientation = enabled;
        self
    }

    /// Enable or disable parallel FFT rows
    #[must_use]
    pub fn parallel_fft(mut self, enabled: bool) -> Self {
        self.options.parallel_fft = enabled;
        self
    }

    /// Set the preview side (rounded down to a power of two, at least 64)
    #[must_use]
    pub fn preview_max_side(mut self, side: u32) -> Self {
        let side = side.max(MIN_PREVIEW_SIDE);
        self.options.preview_max_side = 1 << (u32::BITS - 1 - side.leading_zeros());
        self
    }

    /// Set the analysis resolution limit (DPI)
    #[must_use]
    pub fn max_analysis_dpi(mut self, dpi: f64) -> Self {
        if dpi.is_finite() && dpi > 0.0 {
            self.options.max_analysis_dpi = dpi;
        }
        self
    }

    /// Set the number of voting spectrum cells (at least 1)
    #[must_use]
    pub fn sample_count(mut self, count: usize) -> Self {
        self.options.sample_count = count.max(1);
        self
    }

    /// Set the angle bucket width (radians)
    #[must_use]
    pub fn angle_step(mut self, step: f64) -> Self {
        let step = step.abs();
        if step.is_finite() && step > 0.0 {
            self.options.angle_step = step;
        }
        self
    }

    /// Set the vote distance (pixels)
    #[must_use]
    pub fn line_tolerance(mut self, distance: f64) -> Self {
        self.options.line_tolerance = distance.abs();
        self
    }

    /// Set the tolerated non-descending steps around the peak
    #[must_use]
    pub fn monotone_tolerance(mut self, steps: usize) -> Self {
        self.options.monotone_tolerance = steps;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> DeskewOptions {
        self.options
    }
}

// ============================================================
// Result Types
// ============================================================

/// Geometry of one pipeline run, for callers that transform coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeskewParameters {
    pub source_width: u32,
    pub source_height: u32,
    pub target_width: u32,
    pub target_height: u32,
    /// Composed rotation in radians; the output is the input turned by
    /// its negative
    pub angle: f64,
}

/// Deskew operation result
#[derive(Debug, Clone)]
pub struct DeskewOutcome {
    /// Corrected 8-bit gray image
    pub image: RasterImage,
    /// Final angle in (-π, π]
    pub angle: f64,
    /// Estimated skew before orientation correction
    pub skew_angle: f64,
    /// Quarter-turn correction applied after deskewing
    pub orientation: OrientationCorrection,
    /// Content rectangle in the deskewed (uncorrected) image
    pub content_rect: Rect,
    pub parameters: DeskewParameters,
}

// ============================================================
// Deskewer Trait
// ============================================================

/// Deskewer trait
pub trait Deskewer {
    /// Estimate the skew angle of a page (radians, clockwise positive)
    fn detect_skew(image: &RasterImage, options: &DeskewOptions) -> Result<f64>;

    /// Deskew and orient a page
    fn deskew(image: &RasterImage, options: &DeskewOptions) -> Result<DeskewOutcome>;

    /// Batch processing
    fn deskew_batch(images: &[RasterImage], options: &DeskewOptions) -> Vec<Result<DeskewOutcome>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deskew_options_default() {
        let opts = DeskewOptions::default();
        assert!(opts.detect_orientation);
        assert!(opts.parallel_fft);
        assert_eq!(opts.preview_max_side, 1024);
        assert_eq!(opts.max_analysis_dpi, 150.0);
        assert_eq!(opts.sample_count, 3000);
        assert_eq!(opts.angle_step, 0.01);
        assert_eq!(opts.line_tolerance, 3.0);
        assert_eq!(opts.monotone_tolerance, 10);
    }

    #[test]
    fn test_deskew_options_fast() {
        let opts = DeskewOptions::fast();
        assert_eq!(opts.preview_max_side, 512);
        assert_eq!(opts.sample_count, 1500);
        assert!(opts.detect_orientation);
    }

    #[test]
    fn test_deskew_options_accurate() {
        let opts = DeskewOptions::accurate();
        assert_eq!(opts.angle_step, 0.005);
        assert_eq!(opts.max_analysis_dpi, 300.0);
        assert!(opts.sample_count > SPECTRAL_SAMPLE_COUNT);
    }

    #[test]
    fn test_deskew_options_builder() {
        let opts = DeskewOptions::builder()
            .detect_orientation(false)
            .parallel_fft(false)
            .preview_max_side(512)
            .max_analysis_dpi(200.0)
            .sample_count(100)
            .angle_step(0.02)
            .line_tolerance(2.0)
            .monotone_tolerance(4)
            .build();

        assert!(!opts.detect_orientation);
        assert!(!opts.parallel_fft);
        assert_eq!(opts.preview_max_side, 512);
        assert_eq!(opts.max_analysis_dpi, 200.0);
        assert_eq!(opts.sample_count, 100);
        assert_eq!(opts.angle_step, 0.02);
        assert_eq!(opts.line_tolerance, 2.0);
        assert_eq!(opts.monotone_tolerance, 4);
    }

    #[test]
    fn test_builder_preview_side_power_of_two() {
        let opts = DeskewOptions::builder().preview_max_side(1000).build();
        assert_eq!(opts.preview_max_side, 512);

        let opts = DeskewOptions::builder().preview_max_side(3).build();
        assert_eq!(opts.preview_max_side, MIN_PREVIEW_SIDE);
    }

    #[test]
    fn test_builder_ignores_invalid_values() {
        let opts = DeskewOptions::builder()
            .angle_step(0.0)
            .max_analysis_dpi(-5.0)
            .sample_count(0)
            .build();
        assert_eq!(opts.angle_step, ANGLE_STEP);
        assert_eq!(opts.max_analysis_dpi, DEFAULT_MAX_ANALYSIS_DPI);
        assert_eq!(opts.sample_count, 1);

        let opts = DeskewOptions::builder().angle_step(-0.02).build();
        assert_eq!(opts.angle_step, 0.02);
    }

    #[test]
    fn test_error_kinds() {
        assert!(DeskewError::FlatSpectrum.is_indeterminate());
        assert!(DeskewError::NoSpectralSamples.is_indeterminate());
        assert!(DeskewError::DegenerateHistogram.is_indeterminate());
        assert!(DeskewError::EmptyPeakBand.is_indeterminate());
        assert!(DeskewError::from(MarginError::BlankImage).is_indeterminate());

        let err = DeskewError::NotPowerOfTwo {
            width: 3,
            height: 4,
        };
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(err.to_string().contains("3x4"));

        let err: DeskewError = RasterError::InvalidRaster("bad".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn test_parameters_serde() {
        let params = DeskewParameters {
            source_width: 640,
            source_height: 480,
            target_width: 700,
            target_height: 560,
            angle: -0.05,
        };
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"target_width\":700"));
        let back: DeskewParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
