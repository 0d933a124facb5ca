//! Core domain types, lyric cleaning, re-flow, font sizing and song
//! resolution for worship set list generation.

pub mod clean;
pub mod error;
pub mod extract;
pub mod font;
pub mod markers;
pub mod reflow;
pub mod resolve;
pub mod sink;
pub mod types;

pub use error::{Error, Result};
pub use extract::{LyricExtractor, ShapeOrder};
pub use font::FontSizeEstimator;
pub use markers::MarkerTable;
pub use reflow::LyricReflow;
pub use resolve::SongResolver;
pub use sink::ArtifactSink;
pub use types::{
    DisplayGroup, ExtractedSong, ExtractionOutcome, PresentationFormat, SongRequest, SongStatus,
    SourceDeck, SourceShape, SourceSlide,
};
