//! Run configuration.
//!
//! Everything a run needs is carried by one [`PipelineConfig`] value passed
//! in at call time. Every field has a default, so a JSON config file only
//! has to name what it changes.

use serde::{Deserialize, Serialize};
use setlist_core::extract::DEFAULT_UPPER_FRACTION;
use setlist_core::reflow::DEFAULT_LINES_PER_GROUP;
use setlist_core::{FontSizeEstimator, LyricExtractor, LyricReflow, MarkerTable, ShapeOrder};
use setlist_docx::TranscriptWriter;
use setlist_pptx::{DeckStyle, DeckWriter};
use std::path::{Path, PathBuf};

/// Configuration of a preview or generate run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root of the song deck library.
    pub library_root: PathBuf,

    /// Maximum lines per display group when re-flowing supplied lines.
    pub lines_per_group: usize,

    /// Fraction of the slide height, from the top, that holds lyrics.
    pub upper_fraction: f64,

    /// Order of shapes within a slide.
    pub shape_order: ShapeOrder,

    /// Section markers for re-flow and bold transcript lines.
    pub markers: MarkerTable,

    /// Canvas and bounds for font sizing.
    pub font: FontSizeEstimator,

    /// Projection deck style.
    pub deck: DeckStyle,

    /// File name of the transcript inside the output directory.
    pub transcript_name: String,

    /// Optional `.docx` whose styles and parts the transcript is built on.
    pub template: Option<PathBuf>,

    /// File name of the projection deck inside the output directory.
    pub deck_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            library_root: PathBuf::new(),
            lines_per_group: DEFAULT_LINES_PER_GROUP,
            upper_fraction: DEFAULT_UPPER_FRACTION,
            shape_order: ShapeOrder::default(),
            markers: MarkerTable::default(),
            font: FontSizeEstimator::default(),
            deck: DeckStyle::default(),
            transcript_name: TranscriptWriter::DEFAULT_FILE_NAME.to_string(),
            template: None,
            deck_name: DeckWriter::DEFAULT_FILE_NAME.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Default configuration over a library root.
    pub fn new(library_root: impl AsRef<Path>) -> Self {
        Self {
            library_root: library_root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Lyric extractor for this run.
    pub fn extractor(&self) -> LyricExtractor {
        LyricExtractor::new()
            .with_upper_fraction(self.upper_fraction)
            .with_order(self.shape_order)
    }

    /// Re-flow for supplied lines.
    pub fn reflow(&self) -> LyricReflow {
        LyricReflow::new()
            .with_max_lines(self.lines_per_group)
            .with_markers(self.markers.clone())
    }

    /// Transcript sink.
    pub fn transcript_writer(&self) -> TranscriptWriter {
        TranscriptWriter::new()
            .with_markers(self.markers.clone())
            .with_font_face(self.deck.font_face.clone())
            .with_file_name(self.transcript_name.clone())
            .with_template(self.template.clone())
    }

    /// Slide sink.
    pub fn deck_writer(&self) -> DeckWriter {
        DeckWriter::new()
            .with_style(self.deck.clone())
            .with_file_name(self.deck_name.clone())
    }
}
