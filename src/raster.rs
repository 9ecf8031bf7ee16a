//! Raster image model
//!
//! [`RasterImage`] owns one contiguous pixel buffer plus its row stride,
//! so every offset computation in the crate goes through
//! [`RasterImage::get_pixel`] / [`RasterImage::set_pixel`] and friends.
//!
//! Byte layout per format:
//!
//! | Format   | Layout                                           |
//! |----------|--------------------------------------------------|
//! | `Bw1`    | MSB first, a set bit is white (paper)            |
//! | `Gray8`  | one luminance byte                               |
//! | `Rgb24`  | R, G, B                                          |
//! | `Argb32` | R, G, B, A                                       |
//!
//! Rows are padded to a 4-byte boundary by [`PixelFormat::aligned_stride`].

use image::{DynamicImage, GrayImage, Luma};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util;

/// White pixel value for 8-bit gray
pub const WHITE: u8 = 255;

/// Raster error types
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Invalid raster: {0}")]
    InvalidRaster(String),

    #[error("Unsupported pixel format {format:?} for {operation}")]
    UnsupportedPixelFormat {
        format: PixelFormat,
        operation: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, RasterError>;

/// Pixel formats understood by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 1 bit per pixel
    Bw1,
    /// 8-bit grayscale
    Gray8,
    /// 24-bit RGB
    Rgb24,
    /// 32-bit RGB with alpha
    Argb32,
}

impl PixelFormat {
    /// Bits used by one pixel
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Bw1 => 1,
            PixelFormat::Gray8 => 8,
            PixelFormat::Rgb24 => 24,
            PixelFormat::Argb32 => 32,
        }
    }

    /// Whole bytes per pixel, `None` for sub-byte formats
    pub fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            PixelFormat::Bw1 => None,
            other => Some(other.bits_per_pixel() as usize / 8),
        }
    }

    /// Smallest stride that can hold `width` pixels
    pub fn min_stride(self, width: u32) -> usize {
        (width as usize * self.bits_per_pixel() as usize).div_ceil(8)
    }

    /// Stride for `width` pixels padded to a 4-byte boundary
    pub fn aligned_stride(self, width: u32) -> usize {
        (width as usize * self.bits_per_pixel() as usize).div_ceil(32) * 4
    }
}

/// Axis-aligned rectangle in pixel coordinates
///
/// `right()` and `bottom()` are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Build from exclusive edges; inverted edges give an empty rectangle
    pub fn from_edges(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            width: right.saturating_sub(left),
            height: bottom.saturating_sub(top),
        }
    }

    #[inline]
    pub fn right(&self) -> u32 {
        self.left + self.width
    }

    #[inline]
    pub fn bottom(&self) -> u32 {
        self.top + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn center_x(&self) -> f64 {
        self.left as f64 + self.width as f64 / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.top as f64 + self.height as f64 / 2.0
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::from_edges(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Overlapping part, empty when disjoint
    pub fn intersect(&self, other: &Rect) -> Rect {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return Rect::default();
        }
        Rect::from_edges(left, top, right, bottom)
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.left && x < self.right() && y >= self.top && y < self.bottom()
    }

    /// Width / height, or height / width, whichever is larger
    pub fn elongation(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let (w, h) = (self.width as f64, self.height as f64);
        (w / h).max(h / w)
    }
}

/// Owned raster image with explicit stride
///
/// Transforms return new images; only [`crate::binarize::flatten_background`]
/// mutates in place.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
    dpi_x: f64,
    dpi_y: f64,
    data: Vec<u8>,
}

impl RasterImage {
    /// Create a white image with an aligned stride
    pub fn blank(width: u32, height: u32, format: PixelFormat) -> Self {
        let stride = format.aligned_stride(width);
        Self {
            width,
            height,
            stride,
            format,
            dpi_x: 0.0,
            dpi_y: 0.0,
            data: vec![0xFF; stride * height as usize],
        }
    }

    /// Wrap an existing buffer, validating stride and length
    pub fn from_raw(
        width: u32,
        height: u32,
        stride: usize,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self> {
        if stride < format.min_stride(width) {
            return Err(RasterError::InvalidRaster(format!(
                "stride {} is smaller than {} bytes needed for {} {:?} pixels",
                stride,
                format.min_stride(width),
                width,
                format
            )));
        }
        let needed = stride * height as usize;
        if data.len() < needed {
            return Err(RasterError::InvalidRaster(format!(
                "buffer holds {} bytes, {} needed",
                data.len(),
                needed
            )));
        }
        Ok(Self {
            width,
            height,
            stride,
            format,
            dpi_x: 0.0,
            dpi_y: 0.0,
            data,
        })
    }

    /// 8-bit gray image from tightly packed rows
    pub fn from_gray(width: u32, height: u32, pixels: &[u8]) -> Result<Self> {
        let mut image = Self::blank(width, height, PixelFormat::Gray8);
        if pixels.len() < width as usize * height as usize {
            return Err(RasterError::InvalidRaster(format!(
                "{} gray pixels supplied for a {}x{} image",
                pixels.len(),
                width,
                height
            )));
        }
        if width > 0 {
            for (y, src) in pixels.chunks_exact(width as usize).take(height as usize).enumerate() {
                image.row_mut(y as u32).copy_from_slice(src);
            }
        }
        Ok(image)
    }

    /// Set the resolution (DPI)
    #[must_use]
    pub fn with_dpi(mut self, dpi_x: f64, dpi_y: f64) -> Self {
        self.dpi_x = dpi_x;
        self.dpi_y = dpi_y;
        self
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

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Horizontal resolution, falling back to [`util::DEFAULT_DPI`]
    pub fn dpi_x(&self) -> f64 {
        util::effective_dpi(self.dpi_x)
    }

    /// Vertical resolution, falling back to [`util::DEFAULT_DPI`]
    pub fn dpi_y(&self) -> f64 {
        util::effective_dpi(self.dpi_y)
    }

    /// Resolution as stored, 0 when unknown
    pub fn raw_dpi(&self) -> (f64, f64) {
        (self.dpi_x, self.dpi_y)
    }

    /// Whole image as a rectangle
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// Fail with a precondition error unless the format matches
    pub fn require_format(&self, format: PixelFormat, operation: &'static str) -> Result<()> {
        if self.format == format {
            Ok(())
        } else {
            Err(RasterError::UnsupportedPixelFormat {
                format: self.format,
                operation,
            })
        }
    }

    /// Bytes per pixel, or a precondition error for sub-byte formats
    pub fn require_byte_aligned(&self, operation: &'static str) -> Result<usize> {
        self.format
            .bytes_per_pixel()
            .ok_or(RasterError::UnsupportedPixelFormat {
                format: self.format,
                operation,
            })
    }

    /// Byte offset of a pixel; panics outside the image
    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} image",
            self.width,
            self.height
        );
        let bits = x as usize * self.format.bits_per_pixel() as usize;
        y as usize * self.stride + bits / 8
    }

    /// Luminance at `(x, y)` for any format
    ///
    /// # Panics
    /// When `(x, y)` is outside the image.
    pub fn get_pixel(&self, x: u32, y: u32) -> u8 {
        let i = self.offset(x, y);
        match self.format {
            PixelFormat::Bw1 => {
                let bit = 7 - (x % 8);
                if (self.data[i] >> bit) & 1 == 1 {
                    WHITE
                } else {
                    0
                }
            }
            PixelFormat::Gray8 => self.data[i],
            PixelFormat::Rgb24 | PixelFormat::Argb32 => {
                luma(self.data[i], self.data[i + 1], self.data[i + 2])
            }
        }
    }

    /// Luminance at `(x, y)`, `None` outside the image
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        (x < self.width && y < self.height).then(|| self.get_pixel(x, y))
    }

    /// Write a gray level at `(x, y)`
    ///
    /// Color formats receive the level on every color channel; 1-bit
    /// images store white for levels of 128 and above.
    ///
    /// # Panics
    /// When `(x, y)` is outside the image.
    pub fn set_pixel(&mut self, x: u32, y: u32, value: u8) {
        let i = self.offset(x, y);
        match self.format {
            PixelFormat::Bw1 => {
                let mask = 1u8 << (7 - (x % 8));
                if value >= 128 {
                    self.data[i] |= mask;
                } else {
                    self.data[i] &= !mask;
                }
            }
            PixelFormat::Gray8 => self.data[i] = value,
            PixelFormat::Rgb24 => self.data[i..i + 3].fill(value),
            PixelFormat::Argb32 => {
                self.data[i..i + 3].fill(value);
                self.data[i + 3] = 0xFF;
            }
        }
    }

    /// Raw bytes of one pixel for byte-aligned formats
    pub fn pixel_bytes(&self, x: u32, y: u32) -> &[u8] {
        let i = self.offset(x, y);
        let bpp = self.format.bytes_per_pixel().unwrap_or(1);
        &self.data[i..i + bpp]
    }

    fn pixel_bytes_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let i = self.offset(x, y);
        let bpp = self.format.bytes_per_pixel().unwrap_or(1);
        &mut self.data[i..i + bpp]
    }

    /// Copy one pixel from another image of the same format
    pub(crate) fn copy_pixel_from(&mut self, x: u32, y: u32, src: &RasterImage, sx: u32, sy: u32) {
        debug_assert_eq!(self.format, src.format);
        let bytes = src.pixel_bytes(sx, sy);
        self.pixel_bytes_mut(x, y).copy_from_slice(bytes);
    }

    /// Meaningful bytes of row `y` (stride padding excluded)
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.format.min_stride(self.width)]
    }

    /// Mutable meaningful bytes of row `y`
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let len = self.format.min_stride(self.width);
        &mut self.data[start..start + len]
    }

    /// Convert to 8-bit grayscale; a clone when already gray
    pub fn to_gray8(&self) -> RasterImage {
        if self.format == PixelFormat::Gray8 {
            return self.clone();
        }
        let mut gray = RasterImage::blank(self.width, self.height, PixelFormat::Gray8)
            .with_dpi(self.dpi_x, self.dpi_y);
        for y in 0..self.height {
            for x in 0..self.width {
                let v = self.get_pixel(x, y);
                gray.set_pixel(x, y, v);
            }
        }
        gray
    }

    /// Build from an `image` crate buffer of any color type
    ///
    /// Gray, RGB and RGBA buffers keep their format; other types go
    /// through RGBA.
    pub fn from_dynamic(img: &DynamicImage) -> Self {
        match img {
            DynamicImage::ImageLuma8(gray) => Self::from(gray),
            DynamicImage::ImageRgb8(rgb) => {
                Self::from_packed(rgb.width(), rgb.height(), PixelFormat::Rgb24, rgb.as_raw())
            }
            other => {
                let rgba = other.to_rgba8();
                Self::from_packed(rgba.width(), rgba.height(), PixelFormat::Argb32, rgba.as_raw())
            }
        }
    }

    fn from_packed(width: u32, height: u32, format: PixelFormat, packed: &[u8]) -> Self {
        let mut image = Self::blank(width, height, format);
        let row_len = format.min_stride(width);
        if row_len > 0 {
            for (y, src) in packed.chunks_exact(row_len).take(height as usize).enumerate() {
                image.row_mut(y as u32).copy_from_slice(src);
            }
        }
        image
    }

    /// Grayscale copy as an `image` crate buffer
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| Luma([self.get_pixel(x, y)]))
    }
}

impl From<&GrayImage> for RasterImage {
    fn from(gray: &GrayImage) -> Self {
        Self::from_packed(gray.width(), gray.height(), PixelFormat::Gray8, gray.as_raw())
    }
}

/// ITU-R BT.601 luma
#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_stride() {
        assert_eq!(PixelFormat::Gray8.aligned_stride(5), 8);
        assert_eq!(PixelFormat::Gray8.aligned_stride(8), 8);
        assert_eq!(PixelFormat::Rgb24.aligned_stride(3), 12);
        assert_eq!(PixelFormat::Bw1.aligned_stride(33), 8);
        assert_eq!(PixelFormat::Bw1.min_stride(9), 2);
        assert_eq!(PixelFormat::Bw1.bytes_per_pixel(), None);
        assert_eq!(PixelFormat::Argb32.bytes_per_pixel(), Some(4));
    }

    #[test]
    fn test_from_raw_rejects_short_stride() {
        let result = RasterImage::from_raw(10, 2, 9, PixelFormat::Gray8, vec![0; 20]);
        assert!(matches!(result, Err(RasterError::InvalidRaster(_))));
    }

    #[test]
    fn test_from_raw_rejects_short_buffer() {
        let result = RasterImage::from_raw(4, 4, 4, PixelFormat::Gray8, vec![0; 15]);
        assert!(matches!(result, Err(RasterError::InvalidRaster(_))));
    }

    #[test]
    fn test_get_set_pixel_respects_stride() {
        let mut img = RasterImage::blank(5, 3, PixelFormat::Gray8);
        assert_eq!(img.stride(), 8);
        img.set_pixel(4, 2, 17);
        assert_eq!(img.get_pixel(4, 2), 17);
        assert_eq!(img.data()[2 * 8 + 4], 17);
        assert_eq!(img.get(5, 0), None);
    }

    #[test]
    #[should_panic]
    fn test_get_pixel_out_of_bounds_panics() {
        let img = RasterImage::blank(2, 2, PixelFormat::Gray8);
        img.get_pixel(2, 0);
    }

    #[test]
    fn test_bw1_pixels() {
        let mut img = RasterImage::blank(10, 1, PixelFormat::Bw1);
        assert_eq!(img.get_pixel(9, 0), WHITE);
        img.set_pixel(9, 0, 0);
        assert_eq!(img.get_pixel(9, 0), 0);
        assert_eq!(img.get_pixel(8, 0), WHITE);
        assert_eq!(img.data()[1], 0b1011_1111);
    }

    #[test]
    fn test_rgb_luma_conversion() {
        let mut img = RasterImage::blank(2, 1, PixelFormat::Rgb24);
        img.set_pixel(0, 0, 0);
        let gray = img.to_gray8();
        assert_eq!(gray.format(), PixelFormat::Gray8);
        assert_eq!(gray.get_pixel(0, 0), 0);
        assert_eq!(gray.get_pixel(1, 0), 255);
    }

    #[test]
    fn test_image_crate_round_trip() {
        let gray = GrayImage::from_fn(7, 3, |x, y| Luma([(x * 10 + y) as u8]));
        let raster = RasterImage::from(&gray);
        assert_eq!(raster.get_pixel(6, 2), 62);
        assert_eq!(raster.to_gray_image(), gray);

        let dynamic = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            3,
            2,
            image::Rgb([255, 255, 255]),
        ));
        let raster = RasterImage::from_dynamic(&dynamic);
        assert_eq!(raster.format(), PixelFormat::Rgb24);
        assert_eq!(raster.get_pixel(2, 1), 255);
    }

    #[test]
    fn test_rect_union_and_intersect() {
        let a = Rect::new(0, 0, 4, 4);
        let b = Rect::new(2, 3, 5, 5);
        assert_eq!(a.union(&b), Rect::new(0, 0, 7, 8));
        assert_eq!(a.intersect(&b), Rect::new(2, 3, 2, 1));
        assert!(a.intersect(&Rect::new(10, 10, 1, 1)).is_empty());
        assert_eq!(Rect::default().union(&b), b);
    }

    #[test]
    fn test_rect_elongation() {
        assert_eq!(Rect::new(0, 0, 100, 5).elongation(), 20.0);
        assert_eq!(Rect::new(0, 0, 5, 100).elongation(), 20.0);
        assert_eq!(Rect::new(0, 0, 0, 3).elongation(), 0.0);
    }
}
