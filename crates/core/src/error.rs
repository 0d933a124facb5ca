//! Error types for set list processing.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading song decks or writing artifacts.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file format is not supported or could not be detected.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// Failed to parse the PPTX file structure.
    #[error("PPTX parsing error: {0}")]
    PptxParseError(String),

    /// ZIP archive error (for PPTX and DOCX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error (for PPTX).
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// A song request or run invocation is missing required fields.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The song library root cannot be used.
    #[error("Song library unavailable: {0}")]
    LibraryUnavailable(String),

    /// An output artifact could not be rendered.
    #[error("Render error: {0}")]
    RenderError(String),
}
