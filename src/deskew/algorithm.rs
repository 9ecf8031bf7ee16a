//! Deskew Algorithm Implementation
//!
//! Contains the PageDeskewer pipeline: skew estimation on a flattened
//! power-of-two preview, full resolution rotation, content trimming on a
//! small preview and orientation correction.

use rayon::prelude::*;
use tracing::{debug, info};

use super::spectrum::SkewEstimator;
use super::types::{DeskewOptions, DeskewOutcome, DeskewParameters, Deskewer, Result};
use crate::binarize;
use crate::margin;
use crate::orientation::{self, OrientationCorrection};
use crate::raster::{RasterImage, Rect};
use crate::resample::{self, rect_corners, RotationFrame};
use crate::util;

/// Deskew pipeline over [`RasterImage`] pages
pub struct PageDeskewer;

impl PageDeskewer {
    /// Gray copy reduced to at most `max_dpi` per axis
    pub fn analysis_image(gray: &RasterImage, max_dpi: f64) -> Result<RasterImage> {
        let factor_x = (max_dpi / gray.dpi_x()).min(1.0);
        let factor_y = (max_dpi / gray.dpi_y()).min(1.0);
        if factor_x >= 1.0 && factor_y >= 1.0 {
            return Ok(gray.clone());
        }
        let width = ((gray.width() as f64 * factor_x).round() as u32).max(1);
        let height = ((gray.height() as f64 * factor_y).round() as u32).max(1);
        debug!(width, height, "downsampling for analysis");
        Ok(resample::scale(gray, width, height)?)
    }

    /// Square power-of-two preview with a whitened background
    fn skew_preview(analysis: &RasterImage, options: &DeskewOptions) -> Result<RasterImage> {
        let (mut preview, placement) =
            resample::pad_to_power_of_two(analysis, options.preview_max_side)?;
        binarize::flatten_background(&mut preview)?;
        debug!(
            side = preview.width(),
            scale = placement.scale_x,
            "skew preview"
        );
        Ok(preview)
    }

    fn estimate(analysis: &RasterImage, options: &DeskewOptions) -> Result<f64> {
        let preview = Self::skew_preview(analysis, options)?;
        SkewEstimator::from_options(options).estimate(&preview)
    }

    /// Detect the skew angle of a page
    ///
    /// Radians, clockwise positive; rotating by the negative deskews.
    pub fn detect_skew(image: &RasterImage, options: &DeskewOptions) -> Result<f64> {
        let gray = image.to_gray8();
        let analysis = Self::analysis_image(&gray, options.max_analysis_dpi)?;
        Self::estimate(&analysis, options)
    }

    /// Content rectangle of the deskewed page, in deskewed coordinates
    ///
    /// Trimming runs on a small preview turned by the same angle; the
    /// preview rectangle is mapped back to the source and then forward
    /// onto the full-resolution canvas.
    fn content_rectangle(
        gray: &RasterImage,
        skew: f64,
        full_frame: &RotationFrame,
        options: &DeskewOptions,
    ) -> Result<Rect> {
        let (width, height) = gray.dimensions();
        let longest = width.max(height).max(1);
        let factor = (options.preview_max_side as f64 / longest as f64).min(1.0);
        let small_w = ((width as f64 * factor).round() as u32).max(1);
        let small_h = ((height as f64 * factor).round() as u32).max(1);
        let small = if (small_w, small_h) == (width, height) {
            gray.clone()
        } else {
            resample::scale(gray, small_w, small_h)?
        };
        let scale_x = small_w as f64 / width as f64;
        let scale_y = small_h as f64 / height as f64;

        let small_frame = RotationFrame::new(-skew, small_w, small_h);
        let turned = resample::rotate(&small, -skew)?;
        let mask = binarize::binarize(&turned)?;
        let trimmed = margin::find_content_rectangle(&mask)?;

        let corners: Vec<(f64, f64)> = rect_corners(&trimmed)
            .iter()
            .map(|&p| {
                let (x, y) = small_frame.inverse(p);
                full_frame.forward((x / scale_x, y / scale_y))
            })
            .collect();
        let (full_w, full_h) = full_frame.target_dimensions();
        let mapped = resample::bounding_rect(&corners, full_w, full_h);

        let pad_x = (1.0 / scale_x).ceil() as u32;
        let pad_y = (1.0 / scale_y).ceil() as u32;
        let rect = Rect::from_edges(
            mapped.left.saturating_sub(pad_x),
            mapped.top.saturating_sub(pad_y),
            (mapped.right() + pad_x).min(full_w),
            (mapped.bottom() + pad_y).min(full_h),
        );
        debug!(?trimmed, ?rect, "content rectangle mapped to full resolution");
        Ok(rect)
    }

    /// Orientation of the trimmed content at analysis resolution
    fn orientation(
        deskewed: &RasterImage,
        content_rect: &Rect,
        options: &DeskewOptions,
    ) -> Result<OrientationCorrection> {
        let content = resample::crop(deskewed, content_rect)?;
        let analysis = Self::analysis_image(&content, options.max_analysis_dpi)?;
        let mask = binarize::binarize(&analysis)?;
        Ok(orientation::classify_orientation(
            &mask,
            analysis.dpi_x(),
            analysis.dpi_y(),
        ))
    }

    /// Deskew and orient a page
    ///
    /// The output image is the input turned by `-outcome.angle`, on a
    /// canvas large enough to hold all of it.
    pub fn deskew(image: &RasterImage, options: &DeskewOptions) -> Result<DeskewOutcome> {
        let gray = image.to_gray8();
        let analysis = Self::analysis_image(&gray, options.max_analysis_dpi)?;
        let skew = Self::estimate(&analysis, options)?;

        let full_frame = RotationFrame::new(-skew, gray.width(), gray.height());
        let deskewed = resample::rotate(&gray, -skew)?;
        let content_rect = Self::content_rectangle(&gray, skew, &full_frame, options)?;

        let orientation = if options.detect_orientation {
            Self::orientation(&deskewed, &content_rect, options)?
        } else {
            OrientationCorrection::None
        };

        let output = resample::rotate_quarter_turns(&deskewed, orientation.quarter_turns())?;
        let angle = util::wrap_angle(skew - orientation.angle());
        info!(
            skew,
            angle,
            ?orientation,
            width = output.width(),
            height = output.height(),
            "page deskewed"
        );

        Ok(DeskewOutcome {
            parameters: DeskewParameters {
                source_width: image.width(),
                source_height: image.height(),
                target_width: output.width(),
                target_height: output.height(),
                angle,
            },
            image: output,
            angle,
            skew_angle: skew,
            orientation,
            content_rect,
        })
    }

    /// Deskew independent pages in parallel
    pub fn deskew_batch(
        images: &[RasterImage],
        options: &DeskewOptions,
    ) -> Vec<Result<DeskewOutcome>> {
        images
            .par_iter()
            .map(|image| Self::deskew(image, options))
            .collect()
    }
}

impl Deskewer for PageDeskewer {
    fn detect_skew(image: &RasterImage, options: &DeskewOptions) -> Result<f64> {
        PageDeskewer::detect_skew(image, options)
    }

    fn deskew(image: &RasterImage, options: &DeskewOptions) -> Result<DeskewOutcome> {
        PageDeskewer::deskew(image, options)
    }

    fn deskew_batch(images: &[RasterImage], options: &DeskewOptions) -> Vec<Result<DeskewOutcome>> {
        PageDeskewer::deskew_batch(images, options)
    }
}
