//! Domain types for song requests, source decks and extracted lyrics.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;

/// One entry of a requested set list.
///
/// Deserialized untagged: a record carrying a line list is taken as
/// [`SongRequest::WithLines`], anything else must name the song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SongRequest {
    /// Lines were supplied by the caller (for example after a preview edit).
    WithLines {
        #[serde(alias = "name")]
        title: String,
        #[serde(alias = "lyrics")]
        lines: Vec<String>,
    },
    /// The song must be looked up in the deck library.
    ByReference {
        #[serde(default)]
        id: Option<u64>,
        #[serde(alias = "title")]
        name: String,
    },
}

impl SongRequest {
    /// Create a request that resolves against the library.
    pub fn by_reference(id: Option<u64>, name: impl Into<String>) -> Self {
        Self::ByReference {
            id,
            name: name.into(),
        }
    }

    /// Create a request with pre-supplied lines.
    pub fn with_lines<I, S>(title: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::WithLines {
            title: title.into(),
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Display title of the song.
    pub fn title(&self) -> &str {
        match self {
            Self::WithLines { title, .. } => title,
            Self::ByReference { name, .. } => name,
        }
    }
}

/// The format of a source deck file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentationFormat {
    /// Modern PPTX (Office Open XML).
    Pptx,
    /// Legacy PPT (OLE/CFB binary). Detected, never parsed.
    Ppt,
}

impl PresentationFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" => Some(Self::Pptx),
            "ppt" => Some(Self::Ppt),
            _ => None,
        }
    }

    /// Detect format from file magic bytes.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PPTX is a ZIP file (PK\x03\x04)
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some(Self::Pptx);
        }

        // PPT is an OLE/CFB file (D0 CF 11 E0 A1 B1 1A E1)
        if bytes.len() >= 8
            && bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1])
        {
            return Some(Self::Ppt);
        }

        None
    }
}

/// A parsed source deck: slides with positioned text shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDeck {
    /// Original filename (without path).
    pub filename: String,

    /// Slide height in EMU.
    pub slide_height: f64,

    /// Slides in presentation order.
    pub slides: Vec<SourceSlide>,
}

impl SourceDeck {
    /// Default 4:3 slide height in EMU, used when the deck does not declare one.
    pub const DEFAULT_SLIDE_HEIGHT: f64 = 6_858_000.0;

    /// Create an empty deck.
    pub fn new(filename: impl Into<String>, slide_height: f64) -> Self {
        Self {
            filename: filename.into(),
            slide_height,
            slides: Vec::new(),
        }
    }

    /// Add a slide to the deck.
    pub fn add_slide(&mut self, slide: SourceSlide) {
        self.slides.push(slide);
    }
}

/// A single slide of a source deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSlide {
    /// 1-based slide number.
    pub number: usize,

    /// Text-bearing shapes in document order.
    pub shapes: Vec<SourceShape>,
}

impl SourceSlide {
    /// Create a new slide with the given number.
    pub fn new(number: usize) -> Self {
        Self {
            number,
            shapes: Vec::new(),
        }
    }

    /// Add a shape without position information.
    pub fn add_shape(&mut self, text: impl Into<String>) {
        self.shapes.push(SourceShape::new(text));
    }

    /// Add a shape with position information.
    pub fn add_shape_with_position(&mut self, text: impl Into<String>, y: f64, x: f64) {
        self.shapes.push(SourceShape::with_position(text, y, x));
    }

    /// Shapes sorted top-to-bottom, then left-to-right.
    ///
    /// Shapes with unknown position sort first; the sort is stable.
    pub fn shapes_by_position(&self) -> Vec<&SourceShape> {
        let mut shapes: Vec<&SourceShape> = self.shapes.iter().collect();
        shapes.sort_by(|a, b| {
            let y_cmp = cmp_position(a.y_position, b.y_position);
            if y_cmp == Ordering::Equal {
                cmp_position(a.x_position, b.x_position)
            } else {
                y_cmp
            }
        });
        shapes
    }
}

fn cmp_position(a: Option<f64>, b: Option<f64>) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Text payload of one shape, with its offset from the slide's top-left corner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceShape {
    /// Raw text; paragraphs are separated by `\n`, soft breaks are `\u{000B}`.
    pub text: String,

    /// Distance from the slide top in EMU. None if the shape inherits its geometry.
    pub y_position: Option<f64>,

    /// Distance from the slide left edge in EMU.
    pub x_position: Option<f64>,
}

impl SourceShape {
    /// Create a shape without position info.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            y_position: None,
            x_position: None,
        }
    }

    /// Create a shape with position info.
    pub fn with_position(text: impl Into<String>, y: f64, x: f64) -> Self {
        Self {
            text: text.into(),
            y_position: Some(y),
            x_position: Some(x),
        }
    }
}

/// Lyric lines rendered together on one output slide.
///
/// Never empty and never holds a blank line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayGroup {
    lines: Vec<String>,
    font_size: Option<u32>,
}

impl DisplayGroup {
    /// Build a group from lines, dropping blank ones.
    ///
    /// Returns `None` when nothing is left.
    pub fn from_lines<I, S>(lines: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines
            .into_iter()
            .map(Into::into)
            .filter(|l| !l.trim().is_empty())
            .collect();

        if lines.is_empty() {
            None
        } else {
            Some(Self {
                lines,
                font_size: None,
            })
        }
    }

    /// The lines of this group.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Font size in points, once estimated.
    pub fn font_size(&self) -> Option<u32> {
        self.font_size
    }

    /// Annotate the group with a font size.
    pub fn with_font_size(mut self, size: u32) -> Self {
        self.font_size = Some(size);
        self
    }
}

/// How a song's lyrics were obtained, or why they are missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SongStatus {
    /// Extracted from a library deck.
    Extracted,
    /// Lines were supplied with the request.
    Supplied,
    /// No deck in the library matched.
    NotFound,
    /// The matching deck is in the legacy binary format.
    LegacyFormat,
    /// The matching deck could not be read.
    ExtractionFailed,
}

/// Outcome of looking a song up and extracting its lyrics.
#[derive(Debug, Clone)]
pub enum ExtractionOutcome {
    /// One group per slide that carried lyrics.
    Success {
        path: PathBuf,
        groups: Vec<DisplayGroup>,
    },
    /// No deck matched the request.
    NotFound,
    /// The deck is in a format that cannot be read.
    UnsupportedFormat { path: PathBuf },
    /// The deck was found but could not be read.
    ExtractionFailure { path: PathBuf, reason: String },
}

impl ExtractionOutcome {
    /// Status recorded for a song with this outcome.
    pub fn status(&self) -> SongStatus {
        match self {
            Self::Success { .. } => SongStatus::Extracted,
            Self::NotFound => SongStatus::NotFound,
            Self::UnsupportedFormat { .. } => SongStatus::LegacyFormat,
            Self::ExtractionFailure { .. } => SongStatus::ExtractionFailed,
        }
    }

    /// Extracted groups, empty for every outcome but success.
    pub fn into_groups(self) -> Vec<DisplayGroup> {
        match self {
            Self::Success { groups, .. } => groups,
            _ => Vec::new(),
        }
    }
}

/// A song as handed to the output sinks.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedSong {
    /// Display title.
    pub title: String,

    /// Where the lyrics came from.
    pub status: SongStatus,

    /// Display groups in order; empty when no lyrics are available.
    pub groups: Vec<DisplayGroup>,
}

impl ExtractedSong {
    /// Create a song record.
    pub fn new(title: impl Into<String>, status: SongStatus, groups: Vec<DisplayGroup>) -> Self {
        Self {
            title: title.into(),
            status,
            groups,
        }
    }

    /// Whether a source for the song was located (or lines were supplied).
    pub fn found(&self) -> bool {
        self.status != SongStatus::NotFound
    }

    /// Whether the located deck is in the legacy format.
    pub fn legacy_format(&self) -> bool {
        self.status == SongStatus::LegacyFormat
    }

    /// All lines of all groups, flattened.
    pub fn lines(&self) -> Vec<&str> {
        self.groups
            .iter()
            .flat_map(|g| g.lines().iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_with_lines_from_json() {
        let req: SongRequest =
            serde_json::from_str(r#"{"title": "Grace", "lyrics": ["a", "b"]}"#).unwrap();
        assert_eq!(req, SongRequest::with_lines("Grace", ["a", "b"]));
    }

    #[test]
    fn test_request_by_reference_from_json() {
        let req: SongRequest = serde_json::from_str(r#"{"id": 12, "name": "Grace"}"#).unwrap();
        assert_eq!(req, SongRequest::by_reference(Some(12), "Grace"));

        let req: SongRequest = serde_json::from_str(r#"{"title": "Grace"}"#).unwrap();
        assert_eq!(req, SongRequest::by_reference(None, "Grace"));
    }

    #[test]
    fn test_request_null_lyrics_is_reference() {
        let req: SongRequest =
            serde_json::from_str(r#"{"id": 3, "name": "Grace", "lyrics": null}"#).unwrap();
        assert_eq!(req, SongRequest::by_reference(Some(3), "Grace"));
    }

    #[test]
    fn test_format_from_magic() {
        assert_eq!(
            PresentationFormat::from_magic(b"PK\x03\x04rest"),
            Some(PresentationFormat::Pptx)
        );
        assert_eq!(
            PresentationFormat::from_magic(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]),
            Some(PresentationFormat::Ppt)
        );
        assert_eq!(PresentationFormat::from_magic(b"abc"), None);
        assert_eq!(PresentationFormat::from_extension("PPT"), Some(PresentationFormat::Ppt));
    }

    #[test]
    fn test_display_group_drops_blank_lines() {
        let group = DisplayGroup::from_lines(["one", "  ", "two"]).unwrap();
        assert_eq!(group.lines(), ["one", "two"]);
        assert!(DisplayGroup::from_lines(["", " \t"]).is_none());
    }

    #[test]
    fn test_shapes_by_position() {
        let mut slide = SourceSlide::new(1);
        slide.add_shape_with_position("low", 300.0, 0.0);
        slide.add_shape_with_position("right", 100.0, 50.0);
        slide.add_shape_with_position("left", 100.0, 10.0);
        slide.add_shape("inherited");

        let order: Vec<&str> = slide
            .shapes_by_position()
            .iter()
            .map(|s| s.text.as_str())
            .collect();
        assert_eq!(order, vec!["inherited", "left", "right", "low"]);
    }
}
