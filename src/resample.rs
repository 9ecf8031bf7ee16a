//! Geometric resampling
//!
//! Rotation, scaling, padding and cropping of [`RasterImage`] buffers by
//! inverse coordinate mapping. All sign and center conventions for
//! rotation live in [`RotationFrame`]: coordinates have y pointing down
//! and a positive angle turns content clockwise on screen.

use crate::raster::{PixelFormat, RasterError, RasterImage, Rect, Result, WHITE};
use crate::util;

/// Mapping between an image and its rotated bounding canvas
///
/// The rotated canvas is sized from the rotated half-diagonals, and both
/// images rotate around their centers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationFrame {
    angle: f64,
    cos: f64,
    sin: f64,
    source: (u32, u32),
    target: (u32, u32),
}

impl RotationFrame {
    pub fn new(angle: f64, width: u32, height: u32) -> Self {
        Self {
            angle,
            cos: angle.cos(),
            sin: angle.sin(),
            source: (width, height),
            target: Self::rotated_dimensions(angle, width, height),
        }
    }

    /// Canvas size holding a `width` x `height` image turned by `angle`
    pub fn rotated_dimensions(angle: f64, width: u32, height: u32) -> (u32, u32) {
        if width == 0 || height == 0 {
            return (width, height);
        }
        let (w, h) = (width as f64, height as f64);
        let diagonal = w.hypot(h);
        let diag_angle = (h / w).atan();

        let cos_max = (angle + diag_angle).cos().abs().max((angle - diag_angle).cos().abs());
        let sin_max = (angle + diag_angle).sin().abs().max((angle - diag_angle).sin().abs());

        let new_width = (diagonal * cos_max).round().max(1.0) as u32;
        let new_height = (diagonal * sin_max).round().max(1.0) as u32;
        (new_width, new_height)
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn source_dimensions(&self) -> (u32, u32) {
        self.source
    }

    pub fn target_dimensions(&self) -> (u32, u32) {
        self.target
    }

    /// Source coordinates to rotated-canvas coordinates
    pub fn forward(&self, (x, y): (f64, f64)) -> (f64, f64) {
        let dx = x - self.source.0 as f64 / 2.0;
        let dy = y - self.source.1 as f64 / 2.0;
        (
            dx * self.cos - dy * self.sin + self.target.0 as f64 / 2.0,
            dx * self.sin + dy * self.cos + self.target.1 as f64 / 2.0,
        )
    }

    /// Rotated-canvas coordinates back to source coordinates
    pub fn inverse(&self, (x, y): (f64, f64)) -> (f64, f64) {
        let dx = x - self.target.0 as f64 / 2.0;
        let dy = y - self.target.1 as f64 / 2.0;
        (
            dx * self.cos + dy * self.sin + self.source.0 as f64 / 2.0,
            -dx * self.sin + dy * self.cos + self.source.1 as f64 / 2.0,
        )
    }

    pub fn map_points_forward(&self, points: &[(f64, f64)]) -> Vec<(f64, f64)> {
        points.iter().map(|&p| self.forward(p)).collect()
    }

    pub fn map_points_inverse(&self, points: &[(f64, f64)]) -> Vec<(f64, f64)> {
        points.iter().map(|&p| self.inverse(p)).collect()
    }

    /// Bounding box on the rotated canvas of a source rectangle
    pub fn map_rect_forward(&self, rect: &Rect) -> Rect {
        let points = self.map_points_forward(&rect_corners(rect));
        bounding_rect(&points, self.target.0, self.target.1)
    }

    /// Bounding box in the source of a rotated-canvas rectangle
    pub fn map_rect_inverse(&self, rect: &Rect) -> Rect {
        let points = self.map_points_inverse(&rect_corners(rect));
        bounding_rect(&points, self.source.0, self.source.1)
    }
}

/// Corners of a rectangle as continuous coordinates
pub fn rect_corners(rect: &Rect) -> [(f64, f64); 4] {
    let (l, t) = (rect.left as f64, rect.top as f64);
    let (r, b) = (rect.right() as f64, rect.bottom() as f64);
    [(l, t), (r, t), (r, b), (l, b)]
}

/// Integer rectangle covering `points`, clipped to `width` x `height`
pub fn bounding_rect(points: &[(f64, f64)], width: u32, height: u32) -> Rect {
    if points.is_empty() {
        return Rect::default();
    }
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in points {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    let clip = |v: f64, hi: u32| v.clamp(0.0, hi as f64) as u32;
    Rect::from_edges(
        clip(min_x.floor(), width),
        clip(min_y.floor(), height),
        clip(max_x.ceil(), width),
        clip(max_y.ceil(), height),
    )
}

/// Rotate an 8-bit gray image by `angle` radians around its center
///
/// The canvas grows to hold the whole rotated image; uncovered pixels
/// are white. Sampling is nearest neighbour by truncating the mapped
/// pixel-center coordinate. Images with more (or less) than one byte per
/// pixel are rejected.
pub fn rotate(image: &RasterImage, angle: f64) -> Result<RasterImage> {
    if image.format().bytes_per_pixel() != Some(1) {
        return Err(RasterError::UnsupportedPixelFormat {
            format: image.format(),
            operation: "rotate",
        });
    }
    let frame = RotationFrame::new(angle, image.width(), image.height());
    let (new_width, new_height) = frame.target_dimensions();
    let (src_w, src_h) = (image.width() as f64, image.height() as f64);
    let (dpi_x, dpi_y) = image.raw_dpi();

    let mut rotated =
        RasterImage::blank(new_width, new_height, PixelFormat::Gray8).with_dpi(dpi_x, dpi_y);

    for y in 0..new_height {
        let row = rotated.row_mut(y);
        for (x, out) in row.iter_mut().enumerate() {
            let (sx, sy) = frame.inverse((x as f64 + 0.5, y as f64 + 0.5));
            *out = if sx >= 0.0 && sy >= 0.0 && sx < src_w && sy < src_h {
                image.get_pixel(sx as u32, sy as u32)
            } else {
                WHITE
            };
        }
    }

    Ok(rotated)
}

/// Nearest-neighbour resize with independent ratios per axis
pub fn scale(image: &RasterImage, new_width: u32, new_height: u32) -> Result<RasterImage> {
    image.require_byte_aligned("scale")?;
    if new_width == 0 || new_height == 0 {
        return Err(RasterError::InvalidRaster(format!(
            "cannot scale to {}x{}",
            new_width, new_height
        )));
    }
    let (width, height) = image.dimensions();
    let ratio_x = width as f64 / new_width as f64;
    let ratio_y = height as f64 / new_height as f64;
    let (dpi_x, dpi_y) = image.raw_dpi();

    let source_index = |i: u32, ratio: f64, len: u32| -> u32 {
        ((i as f64 * ratio).round() as u32).min(len.saturating_sub(1))
    };
    let columns: Vec<u32> = (0..new_width)
        .map(|x| source_index(x, ratio_x, width))
        .collect();

    let mut scaled = RasterImage::blank(new_width, new_height, image.format()).with_dpi(
        dpi_x * new_width as f64 / width.max(1) as f64,
        dpi_y * new_height as f64 / height.max(1) as f64,
    );
    for y in 0..new_height {
        let sy = source_index(y, ratio_y, height);
        for (x, &sx) in columns.iter().enumerate() {
            scaled.copy_pixel_from(x as u32, y, image, sx, sy);
        }
    }
    Ok(scaled)
}

/// Where padded content sits inside its canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl Placement {
    pub const IDENTITY: Placement = Placement {
        scale_x: 1.0,
        scale_y: 1.0,
        offset_x: 0,
        offset_y: 0,
    };

    /// Content coordinates to canvas coordinates
    pub fn to_canvas(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (
            x * self.scale_x + self.offset_x as f64,
            y * self.scale_y + self.offset_y as f64,
        )
    }

    /// Canvas coordinates to content coordinates
    pub fn to_content(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (
            (x - self.offset_x as f64) / self.scale_x,
            (y - self.offset_y as f64) / self.scale_y,
        )
    }
}

/// Center the image on a white `new_width` x `new_height` canvas
///
/// The image is scaled down uniformly when it does not fit; it is never
/// scaled up.
pub fn pad_to_size(
    image: &RasterImage,
    new_width: u32,
    new_height: u32,
) -> Result<(RasterImage, Placement)> {
    image.require_byte_aligned("pad_to_size")?;
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || new_width == 0 || new_height == 0 {
        return Err(RasterError::InvalidRaster(format!(
            "cannot pad {}x{} to {}x{}",
            width, height, new_width, new_height
        )));
    }

    let fitted;
    let content = if new_width < width || new_height < height {
        let factor = (new_width as f64 / width as f64).min(new_height as f64 / height as f64);
        let fit_w = ((width as f64 * factor).round() as u32).clamp(1, new_width);
        let fit_h = ((height as f64 * factor).round() as u32).clamp(1, new_height);
        fitted = scale(image, fit_w, fit_h)?;
        &fitted
    } else {
        image
    };

    let placement = Placement {
        scale_x: content.width() as f64 / width as f64,
        scale_y: content.height() as f64 / height as f64,
        offset_x: (new_width - content.width()) / 2,
        offset_y: (new_height - content.height()) / 2,
    };

    let (dpi_x, dpi_y) = content.raw_dpi();
    let mut canvas = RasterImage::blank(new_width, new_height, image.format()).with_dpi(dpi_x, dpi_y);
    for y in 0..content.height() {
        for x in 0..content.width() {
            canvas.copy_pixel_from(
                x + placement.offset_x,
                y + placement.offset_y,
                content,
                x,
                y,
            );
        }
    }
    Ok((canvas, placement))
}

/// Pad (or shrink) to a power-of-two square no larger than `max_side`
pub fn pad_to_power_of_two(
    image: &RasterImage,
    max_side: u32,
) -> Result<(RasterImage, Placement)> {
    let side = util::next_power_of_two_capped(image.width().max(image.height()), max_side);
    if image.width() == side && image.height() == side {
        return Ok((image.clone(), Placement::IDENTITY));
    }
    pad_to_size(image, side, side)
}

/// Copy of the part of the image inside `rect`
pub fn crop(image: &RasterImage, rect: &Rect) -> Result<RasterImage> {
    image.require_byte_aligned("crop")?;
    let area = rect.intersect(&image.bounds());
    if area.is_empty() {
        return Err(RasterError::InvalidRaster(format!(
            "crop rectangle {:?} misses the {}x{} image",
            rect,
            image.width(),
            image.height()
        )));
    }
    let (dpi_x, dpi_y) = image.raw_dpi();
    let mut cropped = RasterImage::blank(area.width, area.height, image.format()).with_dpi(dpi_x, dpi_y);
    for y in 0..area.height {
        for x in 0..area.width {
            cropped.copy_pixel_from(x, y, image, area.left + x, area.top + y);
        }
    }
    Ok(cropped)
}

/// Lossless clockwise rotation by `turns` quarter turns
pub fn rotate_quarter_turns(image: &RasterImage, turns: u32) -> Result<RasterImage> {
    image.require_byte_aligned("rotate_quarter_turns")?;
    let turns = turns % 4;
    if turns == 0 {
        return Ok(image.clone());
    }
    let (w, h) = image.dimensions();
    let (dpi_x, dpi_y) = image.raw_dpi();
    let (new_w, new_h, new_dpi) = if turns == 2 {
        (w, h, (dpi_x, dpi_y))
    } else {
        (h, w, (dpi_y, dpi_x))
    };

    let mut turned = RasterImage::blank(new_w, new_h, image.format()).with_dpi(new_dpi.0, new_dpi.1);
    for y in 0..h {
        for x in 0..w {
            let (tx, ty) = match turns {
                1 => (h - 1 - y, x),
                2 => (w - 1 - x, h - 1 - y),
                _ => (y, w - 1 - x),
            };
            turned.copy_pixel_from(tx, ty, image, x, y);
        }
    }
    Ok(turned)
}
