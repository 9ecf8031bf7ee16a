//! Border trimming
//!
//! Finds the content rectangle of a binarized page by peeling off, from
//! each side, the leading band of monotone lines: columns or rows whose
//! every pixel has the same ink value. A solid scanner border and the
//! blank margin inside it are peeled in one run.

use thiserror::Error;
use tracing::debug;

use crate::binarize::BinaryMask;
use crate::raster::Rect;

/// Margin error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarginError {
    #[error("Image is blank: no content detected")]
    BlankImage,
}

pub type Result<T> = std::result::Result<T, MarginError>;

/// True when every pixel of the line has the same ink value
fn monotone(mut pixels: impl Iterator<Item = bool>) -> bool {
    match pixels.next() {
        Some(first) => pixels.all(|p| p == first),
        None => false,
    }
}

/// Length of the leading run of monotone lines
fn leading_run(lines: impl Iterator<Item = bool>) -> u32 {
    lines.take_while(|&m| m).count() as u32
}

fn column_is_monotone(mask: &BinaryMask, x: u32) -> bool {
    monotone((0..mask.height()).map(|y| mask.get(x, y)))
}

fn row_is_monotone(mask: &BinaryMask, y: u32, left: u32, right: u32) -> bool {
    monotone((left..right).map(|x| mask.get(x, y)))
}

/// Find the non-blank content rectangle of a binary page
///
/// Left and right scans test whole columns; top and bottom scans test
/// rows between the columns found. Fails with
/// [`MarginError::BlankImage`] when every column, or every row of that
/// extent, is monotone.
pub fn find_content_rectangle(mask: &BinaryMask) -> Result<Rect> {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return Err(MarginError::BlankImage);
    }

    let left = leading_run((0..width).map(|x| column_is_monotone(mask, x)));
    if left >= width {
        return Err(MarginError::BlankImage);
    }
    let right = width - leading_run((0..width).rev().map(|x| column_is_monotone(mask, x)));

    let top = leading_run((0..height).map(|y| row_is_monotone(mask, y, left, right)));
    let bottom_run =
        leading_run((0..height).rev().map(|y| row_is_monotone(mask, y, left, right)));
    if bottom_run >= height {
        return Err(MarginError::BlankImage);
    }
    let bottom = height - bottom_run;

    let rect = Rect::from_edges(left, top, right, bottom);
    debug!(?rect, "content rectangle");
    Ok(rect)
}
