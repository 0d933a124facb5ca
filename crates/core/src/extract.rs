//! Lyric extraction from parsed source decks.
//!
//! Song decks in a library conventionally put the lyrics in the upper part
//! of each slide and captions or attributions below. Only shapes whose top
//! edge lies inside the upper region are read.

use crate::clean::split_lines;
use crate::types::{DisplayGroup, SourceDeck, SourceShape, SourceSlide};
use serde::{Deserialize, Serialize};

/// Default fraction of the slide height, measured from the top, that is read.
pub const DEFAULT_UPPER_FRACTION: f64 = 0.9;

/// Order in which shapes on one slide contribute lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeOrder {
    /// Top-to-bottom, then left-to-right.
    #[default]
    Position,
    /// Order of appearance in the slide document.
    Document,
}

/// Extracts per-slide groups of lyric lines from a deck.
#[derive(Debug, Clone)]
pub struct LyricExtractor {
    upper_fraction: f64,
    order: ShapeOrder,
}

impl Default for LyricExtractor {
    fn default() -> Self {
        Self {
            upper_fraction: DEFAULT_UPPER_FRACTION,
            order: ShapeOrder::default(),
        }
    }
}

impl LyricExtractor {
    /// Create an extractor reading the upper 90% of each slide.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fraction of the slide height that is read.
    pub fn with_upper_fraction(mut self, fraction: f64) -> Self {
        self.upper_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Set how shapes on one slide are ordered.
    pub fn with_order(mut self, order: ShapeOrder) -> Self {
        self.order = order;
        self
    }

    /// One group per slide that keeps at least one lyric line.
    pub fn extract(&self, deck: &SourceDeck) -> Vec<DisplayGroup> {
        let limit = deck.slide_height * self.upper_fraction;

        deck.slides
            .iter()
            .filter_map(|slide| {
                let group = DisplayGroup::from_lines(self.slide_lines(slide, limit));
                if group.is_none() {
                    log::debug!("Slide {} of '{}' has no lyrics", slide.number, deck.filename);
                }
                group
            })
            .collect()
    }

    /// All lyric lines of a deck, flattened across slides.
    pub fn extract_lines(&self, deck: &SourceDeck) -> Vec<String> {
        flatten(&self.extract(deck))
    }

    fn slide_lines(&self, slide: &SourceSlide, limit: f64) -> Vec<String> {
        let shapes: Vec<&SourceShape> = match self.order {
            ShapeOrder::Position => slide.shapes_by_position(),
            ShapeOrder::Document => slide.shapes.iter().collect(),
        };

        shapes
            .into_iter()
            .filter(|shape| is_in_region(shape, limit))
            .flat_map(|shape| split_lines(&shape.text))
            .collect()
    }
}

/// Whether a shape's top edge lies above `limit`.
///
/// A shape with inherited geometry has no known offset and is kept.
fn is_in_region(shape: &SourceShape, limit: f64) -> bool {
    shape.y_position.map_or(true, |y| y < limit)
}

/// Flatten groups into one line sequence.
pub fn flatten(groups: &[DisplayGroup]) -> Vec<String> {
    groups
        .iter()
        .flat_map(|g| g.lines().iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEIGHT: f64 = 1000.0;

    fn deck(slides: Vec<SourceSlide>) -> SourceDeck {
        let mut deck = SourceDeck::new("test.pptx", HEIGHT);
        for slide in slides {
            deck.add_slide(slide);
        }
        deck
    }

    fn group_lines(groups: &[DisplayGroup]) -> Vec<Vec<&str>> {
        groups
            .iter()
            .map(|g| g.lines().iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_extract_upper_region_only() {
        let mut slide = SourceSlide::new(1);
        slide.add_shape_with_position("奇異恩典\u{000B}何等甘甜", 100.0, 0.0);
        slide.add_shape_with_position("《奇異恩典》", 950.0, 0.0);

        let groups = LyricExtractor::new().extract(&deck(vec![slide]));
        assert_eq!(group_lines(&groups), vec![vec!["奇異恩典", "何等甘甜"]]);
    }

    #[test]
    fn test_extract_configurable_fraction() {
        let mut slide = SourceSlide::new(1);
        slide.add_shape_with_position("top", 100.0, 0.0);
        slide.add_shape_with_position("middle", 600.0, 0.0);

        let groups = LyricExtractor::new()
            .with_upper_fraction(0.5)
            .extract(&deck(vec![slide]));
        assert_eq!(group_lines(&groups), vec![vec!["top"]]);
    }

    #[test]
    fn test_slides_without_lyrics_omitted() {
        let mut empty = SourceSlide::new(1);
        empty.add_shape_with_position("  \n\x07", 10.0, 0.0);
        let mut caption_only = SourceSlide::new(2);
        caption_only.add_shape_with_position("caption", 990.0, 0.0);
        let mut lyrics = SourceSlide::new(3);
        lyrics.add_shape_with_position("line", 10.0, 0.0);

        let groups = LyricExtractor::new().extract(&deck(vec![empty, caption_only, lyrics]));
        assert_eq!(group_lines(&groups), vec![vec!["line"]]);
    }

    #[test]
    fn test_extract_orders_by_position() {
        let mut slide = SourceSlide::new(1);
        slide.add_shape_with_position("second", 400.0, 0.0);
        slide.add_shape_with_position("first", 100.0, 0.0);

        let by_position = LyricExtractor::new().extract(&deck(vec![slide.clone()]));
        assert_eq!(group_lines(&by_position), vec![vec!["first", "second"]]);

        let by_document = LyricExtractor::new()
            .with_order(ShapeOrder::Document)
            .extract(&deck(vec![slide]));
        assert_eq!(group_lines(&by_document), vec![vec!["second", "first"]]);
    }

    #[test]
    fn test_inherited_geometry_kept() {
        let mut slide = SourceSlide::new(1);
        slide.add_shape("placeholder text");

        let groups = LyricExtractor::new().extract(&deck(vec![slide]));
        assert_eq!(group_lines(&groups), vec![vec!["placeholder text"]]);
    }

    #[test]
    fn test_extract_lines_flattens() {
        let mut one = SourceSlide::new(1);
        one.add_shape_with_position("a\nb", 0.0, 0.0);
        let mut two = SourceSlide::new(2);
        two.add_shape_with_position("  c\t\td ", 0.0, 0.0);

        let lines = LyricExtractor::new().extract_lines(&deck(vec![one, two]));
        assert_eq!(lines, vec!["a", "b", "c d"]);
    }
}
