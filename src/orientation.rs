//! Page orientation classification
//!
//! Decides which clockwise quarter-turn rotation makes a deskewed page
//! readable.
//!
//! # Algorithm
//!
//! 1. Segment the page as is and turned a quarter turn; the reading with
//!    more characters per line has horizontal lines
//! 2. In every wide enough line, find the dense band of rows spanning
//!    the whole line (the x-height band)
//! 3. Compare the ink above the band (ascenders) with the ink below it
//!    (descenders); more ink below means the page is upside down

use std::borrow::Cow;
use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::binarize::BinaryMask;
use crate::raster::Rect;
use crate::segment::{self, Segmentation, TextLine};
use crate::util;

/// Scores closer to zero than this do not flip the page
pub const MIN_ORIENTATION_CONFIDENCE: f64 = 0.011;

/// Readings whose chars per line differ by less than this are tied
pub const READING_TIE_EPSILON: f64 = 0.01;

/// Row gaps shorter than this many line heights are bridged
pub const GAP_BRIDGE_RATIO: f64 = 2.0;

/// Smallest dense band height (pixels)
pub const MIN_DENSE_BAND_ROWS: u32 = 2;

/// Smallest dense band height relative to the line height
pub const MIN_DENSE_BAND_FRACTION: f64 = 0.2;

/// Lines narrower than this many line heights are not scored
pub const MIN_LINE_ASPECT: f64 = 2.0;

// ============================================================
// Correction
// ============================================================

/// Clockwise rotation that makes a page upright
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrientationCorrection {
    #[default]
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl OrientationCorrection {
    pub fn from_quarter_turns(turns: u32) -> Self {
        match turns % 4 {
            0 => OrientationCorrection::None,
            1 => OrientationCorrection::Rotate90,
            2 => OrientationCorrection::Rotate180,
            _ => OrientationCorrection::Rotate270,
        }
    }

    /// Clockwise quarter turns
    pub fn quarter_turns(self) -> u32 {
        match self {
            OrientationCorrection::None => 0,
            OrientationCorrection::Rotate90 => 1,
            OrientationCorrection::Rotate180 => 2,
            OrientationCorrection::Rotate270 => 3,
        }
    }

    /// Rotation in radians, clockwise positive
    pub fn angle(self) -> f64 {
        self.quarter_turns() as f64 * FRAC_PI_2
    }

    /// This rotation followed by `other`
    pub fn then(self, other: OrientationCorrection) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + other.quarter_turns())
    }
}

/// Details of an orientation decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationAnalysis {
    pub correction: OrientationCorrection,
    /// Mean ascender-minus-descender score, 0 when nothing was scored
    pub score: f64,
    pub lines_scored: usize,
    /// Lines were found in the quarter-turned reading
    pub turned_reading: bool,
}

impl OrientationAnalysis {
    fn unchanged() -> Self {
        Self {
            correction: OrientationCorrection::None,
            score: 0.0,
            lines_scored: 0,
            turned_reading: false,
        }
    }
}

// ============================================================
// Classification
// ============================================================

/// Box of a `width` x `height` image after a clockwise quarter turn
fn turn_box_clockwise(rect: &Rect, height: u32) -> Rect {
    Rect::new(height - rect.top - rect.height, rect.left, rect.height, rect.width)
}

/// True when `turned` reads better than `upright`
fn prefers_turned(upright: &Segmentation, turned: &Segmentation) -> bool {
    if !turned.detection_succeeded() {
        return false;
    }
    let upright_chars = upright.average_chars_per_line();
    let turned_chars = turned.average_chars_per_line();
    if (turned_chars - upright_chars).abs() < READING_TIE_EPSILON {
        turned.average_line_width() > upright.average_line_width()
    } else {
        turned_chars > upright_chars
    }
}

/// Covered columns of row `y` between `left` and `right`, with gaps
/// shorter than `bridge` filled and longer gaps counted as one column;
/// `None` for a row without ink
fn row_span(mask: &BinaryMask, y: u32, left: u32, right: u32, bridge: f64) -> Option<u32> {
    let mut span = 0;
    let mut gap = 0u32;
    let mut inked = false;
    let close_gap = |gap: u32| if (gap as f64) < bridge { gap } else { 1 };

    for x in left..right {
        if mask.get(x, y) {
            span += close_gap(gap) + 1;
            gap = 0;
            inked = true;
        } else {
            gap += 1;
        }
    }
    if !inked {
        return None;
    }
    Some(span + if gap > 0 { close_gap(gap) } else { 0 })
}

/// Longest run of rows whose span covers the whole line, as `top..bottom`
fn dense_band(mask: &BinaryMask, bounds: &Rect) -> Option<(u32, u32)> {
    let bridge = GAP_BRIDGE_RATIO * bounds.height as f64;
    let mut best: Option<(u32, u32)> = None;
    let mut start = None;

    for y in bounds.top..=bounds.bottom() {
        let full = y < bounds.bottom()
            && row_span(mask, y, bounds.left, bounds.right(), bridge) == Some(bounds.width);
        match (full, start) {
            (true, None) => start = Some(y),
            (false, Some(s)) => {
                if best.map_or(true, |(bs, be)| y - s > be - bs) {
                    best = Some((s, y));
                }
                start = None;
            }
            _ => {}
        }
    }
    best
}

/// Ascender-minus-descender score of one line, `None` when the line is
/// too narrow or has no clear x-height band
fn line_score(mask: &BinaryMask, line: &TextLine, max_char_height: u32) -> Option<f64> {
    let bounds = line.bounds();
    let line_height = bounds.height as f64;
    if (bounds.width as f64) < MIN_LINE_ASPECT * line_height {
        return None;
    }

    let (band_top, band_bottom) = dense_band(mask, &bounds)?;
    let band_height = band_bottom - band_top;
    if (band_height as f64) < (MIN_DENSE_BAND_ROWS as f64).max(MIN_DENSE_BAND_FRACTION * line_height)
    {
        return None;
    }

    let ink = |y: u32| mask.count_ink_in(&Rect::new(bounds.left, y, bounds.width, 1)) as f64;
    let upper: f64 = (bounds.top..band_top)
        .filter(|&y| band_top - y <= max_char_height)
        .map(|y| ink(y) * (band_top - y) as f64)
        .sum();
    let lower: f64 = (band_bottom..bounds.bottom())
        .filter(|&y| y - band_bottom < max_char_height)
        .map(|y| ink(y) * (y - band_bottom + 1) as f64)
        .sum();

    Some((upper - lower) / line_height)
}

/// Mean line score and number of lines scored
fn upright_score(mask: &BinaryMask, segmentation: &Segmentation) -> (f64, usize) {
    let scores: Vec<f64> = segmentation
        .lines
        .iter()
        .filter_map(|line| line_score(mask, line, segmentation.max_char_height))
        .collect();
    (util::mean(&scores), scores.len())
}

/// Full orientation analysis of a deskewed page
pub fn analyze_orientation(mask: &BinaryMask, dpi_x: f64, dpi_y: f64) -> OrientationAnalysis {
    let boxes = segment::find_boxes(mask);
    let upright = segment::classify_and_group(&boxes, dpi_y);
    let turned_boxes: Vec<Rect> = boxes
        .iter()
        .map(|b| turn_box_clockwise(b, mask.height()))
        .collect();
    let turned = segment::classify_and_group(&turned_boxes, dpi_x);

    let turned_reading = prefers_turned(&upright, &turned);
    debug!(
        upright_chars = upright.average_chars_per_line(),
        turned_chars = turned.average_chars_per_line(),
        turned_reading,
        "orientation reading"
    );

    let (segmentation, reading_mask, base) = if turned_reading {
        (
            turned,
            Cow::Owned(mask.rotate_clockwise()),
            OrientationCorrection::Rotate90,
        )
    } else {
        (
            upright,
            Cow::Borrowed(mask),
            OrientationCorrection::None,
        )
    };

    if !segmentation.detection_succeeded() {
        warn!("no text lines found, orientation left unchanged");
        return OrientationAnalysis::unchanged();
    }
    if segmentation.lines.iter().all(|l| l.len() <= 1) {
        debug!("only single-character lines, orientation left unchanged");
        return OrientationAnalysis::unchanged();
    }

    let (score, lines_scored) = upright_score(&reading_mask, &segmentation);
    let flip = score < 0.0 && score.abs() >= MIN_ORIENTATION_CONFIDENCE;
    let correction = if flip {
        base.then(OrientationCorrection::Rotate180)
    } else {
        base
    };
    debug!(score, lines_scored, ?correction, "orientation score");

    OrientationAnalysis {
        correction,
        score,
        lines_scored,
        turned_reading,
    }
}

/// Clockwise rotation that makes a deskewed page upright
pub fn classify_orientation(mask: &BinaryMask, dpi_x: f64, dpi_y: f64) -> OrientationCorrection {
    analyze_orientation(mask, dpi_x, dpi_y).correction
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three lines of 20 chars: x-height 12, every 4th char an 18px
    /// ascender, 8px wide with 4px gaps
    fn text_page() -> BinaryMask {
        let mut mask = BinaryMask::new(300, 160);
        for baseline in [40u32, 80, 120] {
            for i in 0..20u32 {
                let top = if i % 4 == 0 { baseline - 18 } else { baseline - 12 };
                let left = 20 + i * 12;
                for y in top..baseline {
                    for x in left..left + 8 {
                        mask.set(x, y, true);
                    }
                }
            }
        }
        mask
    }

    fn turned(mask: &BinaryMask, turns: u32) -> BinaryMask {
        (0..turns).fold(mask.clone(), |m, _| m.rotate_clockwise())
    }

    #[test]
    fn test_correction_quarter_turns() {
        assert_eq!(OrientationCorrection::from_quarter_turns(5), OrientationCorrection::Rotate90);
        assert_eq!(OrientationCorrection::Rotate270.quarter_turns(), 3);
        assert_eq!(
            OrientationCorrection::Rotate90.then(OrientationCorrection::Rotate180),
            OrientationCorrection::Rotate270
        );
        assert_eq!(
            OrientationCorrection::Rotate270.then(OrientationCorrection::Rotate180),
            OrientationCorrection::Rotate90
        );
        assert!((OrientationCorrection::Rotate180.angle() - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn test_turn_box_matches_mask_turn() {
        let mut mask = BinaryMask::new(30, 20);
        let rect = Rect::new(4, 2, 5, 3);
        for y in rect.top..rect.bottom() {
            for x in rect.left..rect.right() {
                mask.set(x, y, true);
            }
        }
        let boxes = segment::find_boxes(&mask.rotate_clockwise());
        assert_eq!(boxes, vec![turn_box_clockwise(&rect, 20)]);
    }

    #[test]
    fn test_row_span_bridges_small_gaps() {
        let mask = BinaryMask::from_fn(20, 1, |x, _| x == 2 || x == 5 || x == 19);
        // gaps 2, 2, 13 (bridge 4): 3 ink + 2 + 2 + 1
        assert_eq!(row_span(&mask, 0, 0, 20, 4.0), Some(8));
        assert_eq!(row_span(&mask, 0, 0, 20, 20.0), Some(20));
        let empty = BinaryMask::new(10, 1);
        assert_eq!(row_span(&empty, 0, 0, 10, 4.0), None);
    }

    #[test]
    fn test_upright_page() {
        let analysis = analyze_orientation(&text_page(), 150.0, 150.0);
        assert_eq!(analysis.correction, OrientationCorrection::None);
        assert!(!analysis.turned_reading);
        assert_eq!(analysis.lines_scored, 3);
        assert!(analysis.score > MIN_ORIENTATION_CONFIDENCE);
    }

    #[test]
    fn test_upside_down_page() {
        let page = turned(&text_page(), 2);
        assert_eq!(
            classify_orientation(&page, 150.0, 150.0),
            OrientationCorrection::Rotate180
        );
    }

    #[test]
    fn test_single_descender_per_line_flips_page() {
        // x-height glyphs only, one char per line with a 1px descender
        let mut mask = BinaryMask::new(300, 160);
        for baseline in [40u32, 80, 120] {
            for i in 0..20u32 {
                let bottom = if i == 7 { baseline + 1 } else { baseline };
                let left = 20 + i * 12;
                for y in baseline - 12..bottom {
                    for x in left..left + 8 {
                        mask.set(x, y, true);
                    }
                }
            }
        }
        let analysis = analyze_orientation(&mask, 150.0, 150.0);
        assert_eq!(analysis.lines_scored, 3);
        // 8 descender pixels one row below the band, over a 13px line
        assert!((analysis.score + 8.0 / 13.0).abs() < 1e-9, "{}", analysis.score);
        assert_eq!(analysis.correction, OrientationCorrection::Rotate180);
    }

    #[test]
    fn test_page_turned_clockwise() {
        let page = turned(&text_page(), 1);
        let analysis = analyze_orientation(&page, 150.0, 150.0);
        assert!(analysis.turned_reading);
        assert_eq!(analysis.correction, OrientationCorrection::Rotate270);
    }

    #[test]
    fn test_page_turned_counter_clockwise() {
        let page = turned(&text_page(), 3);
        assert_eq!(
            classify_orientation(&page, 150.0, 150.0),
            OrientationCorrection::Rotate90
        );
    }

    #[test]
    fn test_blank_page_is_unchanged() {
        let analysis = analyze_orientation(&BinaryMask::new(100, 100), 150.0, 150.0);
        assert_eq!(analysis, OrientationAnalysis::unchanged());
    }

    #[test]
    fn test_single_char_lines_are_unchanged() {
        let mask = BinaryMask::from_fn(200, 200, |x, y| {
            let cell = |v: u32| v % 60 >= 20 && v % 60 < 32;
            cell(x) && cell(y)
        });
        assert_eq!(
            classify_orientation(&mask, 150.0, 150.0),
            OrientationCorrection::None
        );
    }
}
