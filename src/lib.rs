//! superbook-deskew - Skew and orientation correction for scanned pages
//!
//! Straightens scanned book pages and turns them upright, working on
//! in-memory raster buffers.
//!
//! # Features
//!
//! - **Rasters** ([`raster`]) - Strided pixel buffers in 1, 8, 24 and 32 bit formats
//! - **Binarization** ([`binarize`]) - Otsu thresholding and background flattening
//! - **Resampling** ([`resample`]) - Rotation, scaling, padding and cropping
//! - **Border Trimming** ([`margin`]) - Content rectangle of a binary page
//! - **Text Segmentation** ([`segment`]) - Glyph boxes, text lines and words
//! - **Skew Estimation** ([`deskew`]) - FFT angle voting and the page pipeline
//! - **Orientation** ([`orientation`]) - Quarter-turn and upside-down detection
//! - **Configuration** ([`config`]) - TOML settings files
//!
//! # Quick Start
//!
//! ```rust
//! use superbook_deskew::{DeskewOptions, PageDeskewer, PixelFormat, RasterImage};
//!
//! let mut page = RasterImage::blank(256, 256, PixelFormat::Gray8).with_dpi(150.0, 150.0);
//! for y in (60..200).filter(|y| y % 10 < 3) {
//!     for x in 40..220 {
//!         page.set_pixel(x, y, 0);
//!     }
//! }
//!
//! let angle = PageDeskewer::detect_skew(&page, &DeskewOptions::default()).unwrap();
//! assert!(angle.abs() < 0.02);
//! ```
//!
//! ## Using Builder Patterns
//!
//! ```rust
//! use superbook_deskew::DeskewOptions;
//!
//! let options = DeskewOptions::builder()
//!     .preview_max_side(512)
//!     .detect_orientation(false)
//!     .build();
//!
//! // Or use presets
//! let fast = DeskewOptions::fast();
//! let accurate = DeskewOptions::accurate();
//! ```
//!
//! # Architecture
//!
//! ```text
//! Page -> Gray -> Analysis DPI -> Power-of-two preview -> FFT skew estimate
//!                                                              |
//!                      Full resolution rotation <--------------+
//!                                 |
//!             Trim preview -> Content rectangle -> Orientation -> Output
//! ```
//!
//! The library installs no `tracing` subscriber; applications choose how
//! to collect its events.

pub mod binarize;
pub mod config;
pub mod deskew;
pub mod margin;
pub mod orientation;
pub mod raster;
pub mod resample;
pub mod segment;
pub mod util;

// Re-exports for convenience
pub use binarize::{binarize, flatten_background, otsu_threshold, BinaryMask};
pub use config::{Config, ConfigError};
pub use deskew::{
    DeskewError, DeskewOptions, DeskewOptionsBuilder, DeskewOutcome, DeskewParameters, Deskewer,
    ErrorKind, PageDeskewer, SkewEstimator,
};
pub use margin::{find_content_rectangle, MarginError};
pub use orientation::{analyze_orientation, classify_orientation, OrientationCorrection};
pub use raster::{PixelFormat, RasterError, RasterImage, Rect};
pub use resample::{Placement, RotationFrame};
pub use segment::{classify_and_group, find_boxes, Segmentation, TextLine, Word};
