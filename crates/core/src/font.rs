//! Font size estimation for display groups.
//!
//! A group must fit a fixed canvas both horizontally (its widest line) and
//! vertically (its stacked lines). Widths are estimated from per-character
//! weights rather than real font metrics: anything outside 7-bit ASCII counts
//! as full-width (1.0), ASCII counts as narrow (0.55).

use serde::{Deserialize, Serialize};

/// Horizontal capacity of the lyric box, in font-size units.
pub const DEFAULT_SAFE_WIDTH: f64 = 610.0;

/// Vertical capacity of the lyric box, in font-size units.
pub const DEFAULT_SAFE_HEIGHT: f64 = 230.0;

/// Line height as a multiple of the font size.
pub const DEFAULT_LINE_HEIGHT: f64 = 1.15;

/// Largest size ever returned.
pub const DEFAULT_MAX_SIZE: u32 = 54;

/// Smallest size ever returned; denser groups rely on wrapping.
pub const DEFAULT_MIN_SIZE: u32 = 24;

const FULL_WIDTH_WEIGHT: f64 = 1.0;
const NARROW_WEIGHT: f64 = 0.55;

/// Visual width weight of one character.
pub fn char_weight(c: char) -> f64 {
    if c.is_ascii() {
        NARROW_WEIGHT
    } else {
        FULL_WIDTH_WEIGHT
    }
}

/// Estimated visual width of a line, in visual width units.
pub fn visual_width(line: &str) -> f64 {
    line.chars().map(char_weight).sum()
}

/// Computes the largest font size that keeps a group inside the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontSizeEstimator {
    pub safe_width: f64,
    pub safe_height: f64,
    pub line_height: f64,
    pub max_size: u32,
    pub min_size: u32,
}

impl Default for FontSizeEstimator {
    fn default() -> Self {
        Self {
            safe_width: DEFAULT_SAFE_WIDTH,
            safe_height: DEFAULT_SAFE_HEIGHT,
            line_height: DEFAULT_LINE_HEIGHT,
            max_size: DEFAULT_MAX_SIZE,
            min_size: DEFAULT_MIN_SIZE,
        }
    }
}

impl FontSizeEstimator {
    /// Create an estimator with the default canvas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the width and height budgets.
    pub fn with_canvas(mut self, safe_width: f64, safe_height: f64) -> Self {
        self.safe_width = safe_width;
        self.safe_height = safe_height;
        self
    }

    /// Set the ceiling and floor.
    pub fn with_bounds(mut self, min_size: u32, max_size: u32) -> Self {
        self.min_size = min_size;
        self.max_size = max_size;
        self
    }

    /// Estimate the font size, in points, for a group of lines.
    ///
    /// An empty group gets the ceiling size.
    pub fn estimate<S: AsRef<str>>(&self, lines: &[S]) -> u32 {
        if lines.is_empty() {
            return self.max_size;
        }

        let max_width = lines
            .iter()
            .map(|l| visual_width(l.as_ref()))
            .fold(0.0_f64, f64::max)
            .max(1.0);
        let line_count = lines.len().max(1) as f64;

        let width_limited = (self.safe_width / max_width).floor();
        let height_limited = (self.safe_height / (line_count * self.line_height)).floor();

        let size = width_limited
            .min(height_limited)
            .min(f64::from(self.max_size));

        // Negative or NaN budgets saturate to 0 and end up on the floor.
        (size as u32).max(self.min_size)
    }
}
