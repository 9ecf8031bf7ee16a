//! Deskew (Skew Correction) module
//!
//! Estimates page skew in the frequency domain and runs the full
//! correction pipeline: rotation, content trimming and orientation.
//!
//! # Features
//!
//! - Radix-2 FFT with rows on the rayon pool
//! - Angle voting over the strongest spectrum cells
//! - Quarter-turn orientation correction
//! - Batch processing support
//!
//! # Example
//!
//! ```rust
//! use superbook_deskew::{DeskewOptions, PageDeskewer, PixelFormat, RasterImage};
//!
//! let options = DeskewOptions::builder()
//!     .preview_max_side(512)
//!     .build();
//!
//! let page = RasterImage::blank(64, 64, PixelFormat::Gray8);
//! match PageDeskewer::deskew(&page, &options) {
//!     Ok(outcome) => println!("angle: {:.4} rad", outcome.angle),
//!     Err(e) if e.is_indeterminate() => println!("nothing to straighten"),
//!     Err(e) => eprintln!("deskew failed: {e}"),
//! }
//! ```

// Submodules
mod algorithm;
pub mod fft;
pub mod spectrum;
mod types;

// Re-export public API
pub use algorithm::PageDeskewer;
pub use spectrum::{SkewEstimator, SpectralSample};
pub use types::{
    DeskewError, DeskewOptions, DeskewOptionsBuilder, DeskewOutcome, DeskewParameters, Deskewer,
    ErrorKind, Result, ANGLE_STEP, DEFAULT_MAX_ANALYSIS_DPI, DEFAULT_PREVIEW_MAX_SIDE,
    FLAT_SPECTRUM_EPSILON, MIN_PREVIEW_SIDE, MONOTONE_TOLERANCE_STEPS, PEAK_BAND_LEVEL,
    SPECTRAL_SAMPLE_COUNT, VOTE_DISTANCE,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{PixelFormat, RasterImage};

    #[test]
    fn test_default_options() {
        let opts = DeskewOptions::default();
        assert_eq!(opts.sample_count, SPECTRAL_SAMPLE_COUNT);
        assert_eq!(opts.angle_step, ANGLE_STEP);
        assert_eq!(opts.line_tolerance, VOTE_DISTANCE);
        assert_eq!(opts.monotone_tolerance, MONOTONE_TOLERANCE_STEPS);
    }

    #[test]
    fn test_presets_differ_from_default() {
        assert_ne!(DeskewOptions::fast(), DeskewOptions::default());
        assert_ne!(DeskewOptions::accurate(), DeskewOptions::default());
    }

    #[test]
    fn test_trait_dispatch() {
        fn detect<D: Deskewer>(image: &RasterImage) -> Result<f64> {
            D::detect_skew(image, &DeskewOptions::default())
        }
        let blank = RasterImage::blank(32, 32, PixelFormat::Gray8);
        let err = detect::<PageDeskewer>(&blank).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Indeterminate);
    }

    #[test]
    fn test_estimator_from_options() {
        let opts = DeskewOptions::fast();
        let estimator = SkewEstimator::from_options(&opts);
        let blank = RasterImage::blank(64, 64, PixelFormat::Gray8);
        assert!(matches!(
            estimator.estimate(&blank),
            Err(DeskewError::FlatSpectrum)
        ));
    }
}
