//! Connected-component text segmentation
//!
//! Ink blobs are flood-filled into bounding boxes, classified by height
//! against the histogram of all box heights, and grouped into text lines
//! and words.
//!
//! # Algorithm
//!
//! 1. Estimate plausible glyph heights from the vertical DPI (3-150 pt)
//! 2. Build a box-height histogram and cut it into rise-then-fall waves
//!    ([`HeightPartition`])
//! 3. Keep boxes between the first wave and the tallest frequent wave as
//!    characters; shorter ones are noise
//! 4. Chain characters left to right into lines, pull punctuation out,
//!    split lines at wide gaps, then split words

use std::collections::VecDeque;
use std::ops::Range;

use tracing::debug;

use crate::binarize::BinaryMask;
use crate::raster::Rect;
use crate::util;

/// Smallest font size considered text (points)
pub const MIN_FONT_POINTS: f64 = 3.0;

/// Largest font size considered text (points)
pub const MAX_FONT_POINTS: f64 = 150.0;

/// Minimum ratio of boxes above the DPI-based minimum height to boxes
/// below it; under this the image is assumed to have a wrong DPI
pub const MIN_DISTRIBUTION_RATIO: f64 = 0.02;

/// Lower limit for the minimum character height (pixels)
pub const MIN_CHAR_HEIGHT_FLOOR: u32 = 2;

/// Share of all character-sized boxes a height wave needs, counted from
/// the tallest wave down, to still be text. Approximates the inverse of
/// an average sentence length.
pub const SENTENCE_SHARE: f64 = 0.018;

/// Boxes this many times shorter than the tallest char of their line are
/// punctuation
pub const PUNCTUATION_HEIGHT_RATIO: f64 = 1.7;

/// Punctuation lines with fewer boxes are dropped
pub const MIN_PUNCTUATION_LINE_CHARS: usize = 2;

/// Gaps this many times the average gap of a line separate words
pub const WORD_GAP_RATIO: f64 = 1.5;

/// Single-char lines more elongated than this are rules, not text
pub const MAX_SINGLE_CHAR_ELONGATION: f64 = 10.0;

// ============================================================
// Connected components
// ============================================================

/// Bounding boxes of the 8-connected ink components of `mask`
///
/// Components are reported in row-major order of their first pixel.
pub fn find_boxes(mask: &BinaryMask) -> Vec<Rect> {
    let (width, height) = mask.dimensions();
    let mut visited = vec![false; width as usize * height as usize];
    let mut queue = VecDeque::new();
    let mut boxes = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let i = y as usize * width as usize + x as usize;
            if visited[i] || !mask.get(x, y) {
                continue;
            }
            boxes.push(flood_fill(mask, &mut visited, &mut queue, (x, y)));
        }
    }

    debug!(count = boxes.len(), "connected components");
    boxes
}

/// Breadth-first fill from `start`, marking `visited`; returns the bounds
fn flood_fill(
    mask: &BinaryMask,
    visited: &mut [bool],
    queue: &mut VecDeque<(u32, u32)>,
    start: (u32, u32),
) -> Rect {
    let (width, height) = mask.dimensions();
    let index = |x: u32, y: u32| y as usize * width as usize + x as usize;

    visited[index(start.0, start.1)] = true;
    queue.push_back(start);
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (start.0, start.1, start.0, start.1);

    while let Some((x, y)) = queue.pop_front() {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);

        for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                let i = index(nx, ny);
                if visited[i] || !mask.get(nx, ny) {
                    continue;
                }
                visited[i] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    Rect::from_edges(min_x, min_y, max_x + 1, max_y + 1)
}

// ============================================================
// Lines and words
// ============================================================

/// A run of characters inside a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub rect: Rect,
    /// Indices into [`TextLine::chars`]
    pub chars: Range<usize>,
}

/// Character boxes ordered left to right with their union
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    chars: Vec<Rect>,
    bounds: Rect,
    words: Vec<Word>,
}

impl TextLine {
    /// Line holding a single seed box
    pub fn new(seed: Rect) -> Self {
        Self {
            chars: vec![seed],
            bounds: seed,
            words: vec![Word {
                rect: seed,
                chars: 0..1,
            }],
        }
    }

    /// Line from arbitrary boxes; they are sorted left to right
    pub fn from_chars(mut chars: Vec<Rect>) -> Self {
        chars.sort_by_key(|r| (r.left, r.top));
        let bounds = chars.iter().fold(Rect::default(), |acc, r| acc.union(r));
        let words = if chars.is_empty() {
            Vec::new()
        } else {
            vec![Word {
                rect: bounds,
                chars: 0..chars.len(),
            }]
        };
        Self {
            chars,
            bounds,
            words,
        }
    }

    /// Append a box at the right end
    fn push(&mut self, rect: Rect) {
        self.chars.push(rect);
        self.bounds = self.bounds.union(&rect);
        self.words = vec![Word {
            rect: self.bounds,
            chars: 0..self.chars.len(),
        }];
    }

    pub fn chars(&self) -> &[Rect] {
        &self.chars
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Height of the tallest character
    pub fn tallest(&self) -> u32 {
        self.chars.iter().map(|r| r.height).max().unwrap_or(0)
    }

    pub fn average_char_height(&self) -> f64 {
        if self.chars.is_empty() {
            return 0.0;
        }
        self.chars.iter().map(|r| r.height as f64).sum::<f64>() / self.chars.len() as f64
    }

    /// Horizontal gap before each character after the first, measured
    /// from the right edge of everything to its left
    fn gaps(&self) -> Vec<i64> {
        let mut right = match self.chars.first() {
            Some(first) => first.right(),
            None => return Vec::new(),
        };
        self.chars[1..]
            .iter()
            .map(|c| {
                let gap = c.left as i64 - right as i64;
                right = right.max(c.right());
                gap
            })
            .collect()
    }

    /// Split into pieces wherever the gap exceeds `max_gap`
    fn split_at_gaps(self, max_gap: f64) -> Vec<TextLine> {
        let gaps = self.gaps();
        let mut pieces = Vec::new();
        let mut current: Vec<Rect> = Vec::new();
        for (i, rect) in self.chars.into_iter().enumerate() {
            if i > 0 && gaps[i - 1] as f64 > max_gap {
                pieces.push(TextLine::from_chars(std::mem::take(&mut current)));
            }
            current.push(rect);
        }
        if !current.is_empty() {
            pieces.push(TextLine::from_chars(current));
        }
        pieces
    }

    /// Recompute words: gaps above [`WORD_GAP_RATIO`] times the average
    /// positive gap start a new word
    fn split_words(&mut self) {
        let gaps = self.gaps();
        let positive: Vec<f64> = gaps.iter().filter(|&&g| g > 0).map(|&g| g as f64).collect();
        let limit = util::mean(&positive) * WORD_GAP_RATIO;

        let mut words = Vec::new();
        let mut start = 0;
        for (i, &gap) in gaps.iter().enumerate() {
            if !positive.is_empty() && gap as f64 > limit {
                words.push(self.word(start..i + 1));
                start = i + 1;
            }
        }
        if start < self.chars.len() {
            words.push(self.word(start..self.chars.len()));
        }
        self.words = words;
    }

    fn word(&self, chars: Range<usize>) -> Word {
        let rect = self.chars[chars.clone()]
            .iter()
            .fold(Rect::default(), |acc, r| acc.union(r));
        Word { rect, chars }
    }
}

// ============================================================
// Height classification
// ============================================================

/// One wave of the box-height histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightPartition {
    /// Smallest populated height
    pub lower: u32,
    /// Largest populated height
    pub upper: u32,
    /// Most frequent height
    pub height: u32,
    /// Boxes in the wave
    pub count: u64,
}

impl HeightPartition {
    pub fn contains(&self, height: f64) -> bool {
        height >= self.lower as f64 && height <= self.upper as f64
    }
}

/// Result of [`classify_and_group`]
#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    pub lines: Vec<TextLine>,
    /// Boxes shorter than the minimum character height
    pub noise: Vec<Rect>,
    pub partitions: Vec<HeightPartition>,
    pub min_char_height: u32,
    pub max_char_height: u32,
}

impl Segmentation {
    pub fn detection_succeeded(&self) -> bool {
        !self.lines.is_empty()
    }

    pub fn average_chars_per_line(&self) -> f64 {
        if self.lines.is_empty() {
            return 0.0;
        }
        self.lines.iter().map(TextLine::len).sum::<usize>() as f64 / self.lines.len() as f64
    }

    pub fn average_line_width(&self) -> f64 {
        if self.lines.is_empty() {
            return 0.0;
        }
        self.lines.iter().map(|l| l.bounds().width as f64).sum::<f64>() / self.lines.len() as f64
    }
}

/// Plausible (min, max) glyph heights in pixels for a resolution
pub fn height_estimates(vertical_dpi: f64) -> (u32, u32) {
    let min = (util::points_to_pixels(MIN_FONT_POINTS, vertical_dpi).floor() as u32)
        .max(MIN_CHAR_HEIGHT_FLOOR);
    let max = util::points_to_pixels(MAX_FONT_POINTS, vertical_dpi).ceil() as u32;
    (min, max.max(min))
}

fn height_histogram(boxes: &[Rect], max_height: u32) -> Vec<u64> {
    let mut hist = vec![0u64; max_height as usize + 1];
    for b in boxes {
        if b.height <= max_height {
            hist[b.height as usize] += 1;
        }
    }
    hist
}

/// Lower the minimum height when almost nothing reaches it
///
/// The new minimum is the upper end of the widest empty stretch of the
/// histogram that lies below the minimum and is followed by boxes.
fn adjust_min_height(hist: &[u64], min_height: u32) -> u32 {
    let min = (min_height as usize).min(hist.len());
    let above: u64 = hist[min..].iter().sum();
    let below: u64 = hist[..min].iter().sum();
    if below == 0 || above as f64 / below as f64 >= MIN_DISTRIBUTION_RATIO {
        return min_height;
    }

    let floor = MIN_CHAR_HEIGHT_FLOOR as usize;
    let mut best: Option<(usize, usize)> = None;
    let mut gap_start = None;
    for h in floor..min {
        if hist[h] == 0 {
            gap_start.get_or_insert(h);
        } else if let Some(start) = gap_start.take() {
            if best.map_or(true, |(s, e)| h - start >= e - s) {
                best = Some((start, h));
            }
        }
    }

    let adjusted = best.map_or(MIN_CHAR_HEIGHT_FLOOR, |(_, end)| end as u32);
    debug!(
        from = min_height,
        to = adjusted,
        "too few boxes above minimum height, assuming different DPI"
    );
    adjusted.max(MIN_CHAR_HEIGHT_FLOOR)
}

/// Cut the histogram from `min_height` up into rise-then-fall waves
fn partition_heights(hist: &[u64], min_height: u32) -> Vec<HeightPartition> {
    let n = hist.len();
    let mut partitions = Vec::new();
    let mut i = min_height as usize;

    while i < n {
        let start = i;
        while i + 1 < n && hist[i + 1] >= hist[i] {
            i += 1;
        }
        while i + 1 < n && hist[i + 1] <= hist[i] {
            i += 1;
        }
        let wave = start..i + 1;
        i += 1;

        let count: u64 = hist[wave.clone()].iter().sum();
        if count == 0 {
            continue;
        }
        let mut populated = wave.clone().filter(|&h| hist[h] > 0);
        let lower = populated.next().unwrap_or(start);
        let upper = populated.last().unwrap_or(lower);
        let mut peak = lower;
        for h in wave.clone() {
            if hist[h] > hist[peak] {
                peak = h;
            }
        }
        partitions.push(HeightPartition {
            lower: lower as u32,
            upper: upper as u32,
            height: peak as u32,
            count,
        });
    }

    partitions
}

/// Upper bound of the tallest wave that, together with the waves above
/// it, holds [`SENTENCE_SHARE`] of all boxes
fn max_char_height(partitions: &[HeightPartition]) -> u32 {
    let total: u64 = partitions.iter().map(|p| p.count).sum();
    let needed = total as f64 * SENTENCE_SHARE;
    let mut cumulative = 0u64;
    for p in partitions.iter().rev() {
        cumulative += p.count;
        if cumulative as f64 >= needed {
            return p.upper;
        }
    }
    partitions.last().map_or(0, |p| p.upper)
}

/// Height used to judge gaps in a line
fn real_height(average: f64, partitions: &[HeightPartition]) -> f64 {
    partitions
        .iter()
        .find(|p| p.contains(average))
        .map_or(average, |p| p.height as f64)
}

/// Chain boxes into lines
///
/// Each unassigned box seeds a line. Later boxes (by x) whose vertical
/// center lies strictly inside the line join it while their gap to the
/// line's right edge stays below `max(box height, line height)`; the
/// first box too far away ends the line.
pub fn group_lines(boxes: &[Rect]) -> Vec<TextLine> {
    let mut sorted = boxes.to_vec();
    sorted.sort_by_key(|r| (r.left, r.top));
    let mut assigned = vec![false; sorted.len()];
    let mut lines = Vec::new();

    for i in 0..sorted.len() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;
        let mut line = TextLine::new(sorted[i]);

        for j in i + 1..sorted.len() {
            if assigned[j] {
                continue;
            }
            let candidate = sorted[j];
            let bounds = line.bounds();
            let center = candidate.center_y();
            if center <= bounds.top as f64 || center >= bounds.bottom() as f64 {
                continue;
            }
            let gap = candidate.left as i64 - bounds.right() as i64;
            if gap >= candidate.height.max(bounds.height) as i64 {
                break;
            }
            line.push(candidate);
            assigned[j] = true;
        }

        lines.push(line);
    }

    lines
}

/// Remove punctuation-sized boxes from every line and return them
fn separate_punctuation(lines: &mut [TextLine]) -> Vec<Rect> {
    let mut punctuation = Vec::new();
    for line in lines.iter_mut() {
        let tallest = line.tallest() as f64;
        let (marks, chars): (Vec<Rect>, Vec<Rect>) = line
            .chars()
            .iter()
            .partition(|r| r.height as f64 * PUNCTUATION_HEIGHT_RATIO < tallest);
        if !marks.is_empty() {
            punctuation.extend(marks);
            *line = TextLine::from_chars(chars);
        }
    }
    punctuation
}

/// Classify boxes by height and group the characters into lines
///
/// Never fails: an image without character-sized boxes yields an empty
/// line list.
pub fn classify_and_group(boxes: &[Rect], vertical_dpi: f64) -> Segmentation {
    let (min_estimate, max_estimate) = height_estimates(vertical_dpi);
    let hist = height_histogram(boxes, max_estimate);
    let min_estimate = adjust_min_height(&hist, min_estimate);

    let partitions = partition_heights(&hist, min_estimate);
    let Some(first) = partitions.first() else {
        debug!(min_estimate, "no boxes reach the minimum character height");
        return Segmentation {
            noise: boxes
                .iter()
                .filter(|b| b.height < min_estimate)
                .copied()
                .collect(),
            min_char_height: min_estimate,
            max_char_height: max_estimate,
            ..Default::default()
        };
    };
    let min_char_height = first.lower;
    let max_char_height = max_char_height(&partitions);

    let mut chars = Vec::new();
    let mut noise = Vec::new();
    for b in boxes {
        if b.height < min_char_height {
            noise.push(*b);
        } else if b.height <= max_char_height {
            chars.push(*b);
        }
    }

    let mut raw_lines = group_lines(&chars);
    let punctuation = separate_punctuation(&mut raw_lines);
    raw_lines.extend(
        group_lines(&punctuation)
            .into_iter()
            .filter(|l| l.len() >= MIN_PUNCTUATION_LINE_CHARS),
    );

    let mut lines: Vec<TextLine> = raw_lines
        .into_iter()
        .filter(|l| !l.is_empty())
        .flat_map(|line| {
            let max_gap = real_height(line.average_char_height(), &partitions);
            line.split_at_gaps(max_gap)
        })
        .collect();
    for line in &mut lines {
        line.split_words();
    }
    lines.retain(|l| !(l.len() == 1 && l.bounds().elongation() > MAX_SINGLE_CHAR_ELONGATION));

    debug!(
        min_char_height,
        max_char_height,
        chars = chars.len(),
        noise = noise.len(),
        lines = lines.len(),
        "text segmentation"
    );

    Segmentation {
        lines,
        noise,
        partitions,
        min_char_height,
        max_char_height,
    }
}

/// Find boxes in `mask` and group them
pub fn segment_mask(mask: &BinaryMask, vertical_dpi: f64) -> Segmentation {
    classify_and_group(&find_boxes(mask), vertical_dpi)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Row of `count` boxes `w` x `h` with `gap` between them
    fn box_row(x0: u32, top: u32, count: u32, w: u32, h: u32, gap: u32) -> Vec<Rect> {
        (0..count).map(|i| Rect::new(x0 + i * (w + gap), top, w, h)).collect()
    }

    #[test]
    fn test_find_boxes_two_squares() {
        let mask = BinaryMask::from_fn(20, 20, |x, y| {
            (x < 3 && y < 3) || ((10..13).contains(&x) && (10..13).contains(&y))
        });
        let boxes = find_boxes(&mask);
        assert_eq!(boxes, vec![Rect::new(0, 0, 3, 3), Rect::new(10, 10, 3, 3)]);
    }

    #[test]
    fn test_find_boxes_is_eight_connected() {
        let mask = BinaryMask::from_fn(5, 5, |x, y| x == y);
        assert_eq!(find_boxes(&mask), vec![Rect::new(0, 0, 5, 5)]);
    }

    #[test]
    fn test_find_boxes_leaves_mask_untouched() {
        let mask = BinaryMask::from_fn(8, 8, |x, y| (x + y) % 4 == 0);
        let copy = mask.clone();
        let boxes = find_boxes(&mask);
        assert!(!boxes.is_empty());
        assert_eq!(mask, copy);
    }

    #[test]
    fn test_find_boxes_u_shape_is_one_component() {
        let mask = BinaryMask::from_fn(7, 6, |x, y| x == 0 || x == 6 || y == 5);
        assert_eq!(find_boxes(&mask), vec![Rect::new(0, 0, 7, 6)]);
    }

    #[test]
    fn test_height_estimates() {
        // 3pt and 150pt at 144 DPI
        assert_eq!(height_estimates(144.0), (6, 300));
        assert_eq!(height_estimates(24.0).0, MIN_CHAR_HEIGHT_FLOOR);
    }

    #[test]
    fn test_partition_heights_waves() {
        let hist = [0, 0, 5, 9, 3, 0, 0, 2, 6, 2, 0];
        let parts = partition_heights(&hist, 2);
        assert_eq!(
            parts,
            vec![
                HeightPartition {
                    lower: 2,
                    upper: 4,
                    height: 3,
                    count: 17
                },
                HeightPartition {
                    lower: 7,
                    upper: 9,
                    height: 8,
                    count: 10
                },
            ]
        );
    }

    #[test]
    fn test_adjust_min_height_finds_gap_before_glyphs() {
        let mut hist = vec![0u64; 40];
        hist[1] = 5;
        hist[4] = 100;
        assert_eq!(adjust_min_height(&hist, 12), 4);
    }

    #[test]
    fn test_adjust_min_height_keeps_plausible_minimum() {
        let mut hist = vec![0u64; 40];
        hist[3] = 10;
        hist[14] = 50;
        assert_eq!(adjust_min_height(&hist, 12), 12);
    }

    #[test]
    fn test_max_char_height_skips_rare_tall_waves() {
        let parts = [
            HeightPartition {
                lower: 10,
                upper: 14,
                height: 12,
                count: 100,
            },
            HeightPartition {
                lower: 80,
                upper: 82,
                height: 81,
                count: 1,
            },
        ];
        assert_eq!(max_char_height(&parts), 14);
    }

    #[test]
    fn test_classify_two_lines() {
        let mut boxes = box_row(10, 20, 10, 8, 12, 4);
        boxes.extend(box_row(10, 60, 10, 8, 12, 4));
        let seg = classify_and_group(&boxes, 150.0);

        assert!(seg.detection_succeeded());
        assert_eq!(seg.lines.len(), 2);
        assert!(seg.lines.iter().all(|l| l.len() == 10));
        assert_eq!(seg.lines[0].bounds(), Rect::new(10, 20, 116, 12));
        assert_eq!(seg.min_char_height, 12);
        assert_eq!(seg.max_char_height, 12);
    }

    #[test]
    fn test_line_bounds_is_union_of_chars() {
        let boxes = vec![
            Rect::new(0, 10, 8, 12),
            Rect::new(11, 4, 8, 18),
            Rect::new(22, 10, 8, 12),
        ];
        let seg = classify_and_group(&boxes, 150.0);
        assert_eq!(seg.lines.len(), 1);
        let line = &seg.lines[0];
        let union = line.chars().iter().fold(Rect::default(), |a, r| a.union(r));
        assert_eq!(line.bounds(), union);
        assert_eq!(line.bounds(), Rect::new(0, 4, 30, 18));
    }

    #[test]
    fn test_words_split_at_wide_gaps() {
        let mut boxes = box_row(0, 30, 5, 8, 12, 4);
        boxes.extend(box_row(64, 30, 5, 8, 12, 4));
        let seg = classify_and_group(&boxes, 150.0);
        assert_eq!(seg.lines.len(), 1);
        let words = seg.lines[0].words();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].chars, 0..5);
        assert_eq!(words[1].chars, 5..10);
        assert_eq!(words[1].rect, Rect::new(64, 30, 56, 12));
    }

    #[test]
    fn test_wide_gap_starts_new_line() {
        let mut boxes = box_row(0, 30, 4, 8, 12, 4);
        boxes.extend(box_row(100, 30, 4, 8, 12, 4));
        let seg = classify_and_group(&boxes, 150.0);
        assert_eq!(seg.lines.len(), 2);
        assert_eq!(seg.lines[1].bounds().left, 100);
    }

    #[test]
    fn test_line_split_after_punctuation_leaves_gap() {
        // a mark bridges two runs of chars; without it the gap is 18px
        let mut boxes = box_row(0, 20, 4, 8, 12, 4);
        boxes.push(Rect::new(52, 26, 3, 6));
        boxes.extend(box_row(62, 20, 4, 8, 12, 4));
        assert_eq!(group_lines(&boxes).len(), 1);

        let seg = classify_and_group(&boxes, 150.0);
        assert_eq!(seg.lines.len(), 2);
        assert_eq!(seg.lines[0].bounds(), Rect::new(0, 20, 44, 12));
        assert_eq!(seg.lines[1].bounds(), Rect::new(62, 20, 44, 12));
    }

    #[test]
    fn test_punctuation_forms_own_line() {
        let mut boxes = box_row(0, 20, 8, 8, 12, 4);
        // two small marks after the last char, sitting on the baseline
        boxes.push(Rect::new(100, 26, 3, 6));
        boxes.push(Rect::new(105, 26, 3, 6));
        let seg = classify_and_group(&boxes, 150.0);

        assert_eq!(seg.lines.len(), 2);
        assert_eq!(seg.lines[0].len(), 8);
        assert_eq!(seg.lines[0].tallest(), 12);
        assert_eq!(seg.lines[1].len(), 2);
        assert_eq!(seg.lines[1].bounds(), Rect::new(100, 26, 8, 6));
    }

    #[test]
    fn test_single_punctuation_mark_is_dropped() {
        let mut boxes = box_row(0, 20, 8, 8, 12, 4);
        boxes.push(Rect::new(100, 26, 3, 6));
        let seg = classify_and_group(&boxes, 150.0);
        assert_eq!(seg.lines.len(), 1);
        assert_eq!(seg.lines[0].len(), 8);
    }

    #[test]
    fn test_rule_line_is_discarded() {
        let mut boxes = box_row(0, 20, 8, 8, 12, 4);
        boxes.push(Rect::new(0, 200, 300, 12));
        let seg = classify_and_group(&boxes, 150.0);
        assert_eq!(seg.lines.len(), 1);
        assert_eq!(seg.lines[0].len(), 8);
    }

    #[test]
    fn test_noise_is_exposed() {
        let mut boxes = box_row(0, 20, 8, 8, 12, 4);
        boxes.push(Rect::new(50, 100, 1, 1));
        boxes.push(Rect::new(70, 120, 2, 2));
        let seg = classify_and_group(&boxes, 150.0);
        assert_eq!(seg.noise.len(), 2);
        assert_eq!(seg.lines.len(), 1);
    }

    #[test]
    fn test_no_char_sized_boxes_fails_gracefully() {
        let boxes = vec![Rect::new(0, 0, 1, 1), Rect::new(5, 5, 1, 1)];
        let seg = classify_and_group(&boxes, 300.0);
        assert!(!seg.detection_succeeded());
        assert!(seg.lines.is_empty());
        assert_eq!(seg.noise.len(), 2);

        let seg = classify_and_group(&[], 300.0);
        assert!(!seg.detection_succeeded());
    }

    #[test]
    fn test_unexpected_dpi_is_tolerated() {
        // glyphs 4px tall on an image claiming 300 DPI
        let mut boxes = box_row(0, 10, 12, 3, 4, 1);
        boxes.push(Rect::new(80, 40, 1, 1));
        let seg = classify_and_group(&boxes, 300.0);
        assert_eq!(seg.min_char_height, 4);
        assert_eq!(seg.lines.len(), 1);
        assert_eq!(seg.lines[0].len(), 12);
    }

    #[test]
    fn test_segment_mask() {
        let mask = BinaryMask::from_fn(200, 60, |x, y| {
            (20..32).contains(&y) && x >= 10 && x < 130 && (x - 10) % 12 < 8
        });
        let seg = segment_mask(&mask, 150.0);
        assert_eq!(seg.lines.len(), 1);
        assert_eq!(seg.lines[0].len(), 10);
    }
}
