//! Locating and reading a song's source deck.

use setlist_core::{
    Error, ExtractionOutcome, LyricExtractor, PresentationFormat, Result, SongResolver,
};
use setlist_pptx::PptxParser;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Detect a deck's format from its magic bytes, falling back to the extension.
///
/// An OLE container behind a `.pptx` name (password-protected OOXML) is
/// not a legacy deck and is reported as unrecognized.
pub fn detect_format(path: &Path) -> Result<Option<PresentationFormat>> {
    let mut magic = Vec::with_capacity(8);
    File::open(path)?.take(8).read_to_end(&mut magic)?;

    let by_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(PresentationFormat::from_extension);

    Ok(match (PresentationFormat::from_magic(&magic), by_extension) {
        (Some(PresentationFormat::Ppt), Some(PresentationFormat::Pptx)) => None,
        (Some(format), _) => Some(format),
        (None, fallback) => fallback,
    })
}

/// Read a resolved deck into display groups, one per lyric slide.
///
/// Never fails: every problem becomes an [`ExtractionOutcome`] variant.
pub fn extract_file(path: &Path, extractor: &LyricExtractor) -> ExtractionOutcome {
    let failure = |reason: String| {
        log::warn!("Failed to extract {}: {}", path.display(), reason);
        ExtractionOutcome::ExtractionFailure {
            path: path.to_path_buf(),
            reason,
        }
    };

    let format = match detect_format(path) {
        Ok(format) => format,
        Err(e) => return failure(e.to_string()),
    };

    match format {
        Some(PresentationFormat::Pptx) => match parse_pptx(path) {
            Ok(deck) => {
                let groups = extractor.extract(&deck);
                log::debug!(
                    "Extracted {} groups from {} slides of {}",
                    groups.len(),
                    deck.slides.len(),
                    path.display()
                );
                ExtractionOutcome::Success {
                    path: path.to_path_buf(),
                    groups,
                }
            }
            Err(e) => failure(e.to_string()),
        },
        Some(PresentationFormat::Ppt) => {
            log::warn!("Legacy .ppt deck needs manual conversion: {}", path.display());
            ExtractionOutcome::UnsupportedFormat {
                path: path.to_path_buf(),
            }
        }
        None => failure(Error::UnsupportedFormat("unrecognized deck".to_string()).to_string()),
    }
}

fn parse_pptx(path: &Path) -> Result<setlist_core::SourceDeck> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");
    let reader = BufReader::new(File::open(path)?);
    PptxParser::new().parse(reader, filename)
}

/// Resolve a song and extract its lyrics.
pub fn lookup(
    resolver: &SongResolver,
    extractor: &LyricExtractor,
    id: Option<u64>,
    name: &str,
) -> ExtractionOutcome {
    match resolver.resolve(id, name) {
        Some(path) => extract_file(&path, extractor),
        None => {
            log::warn!("No deck found for '{}' (id {:?})", name, id);
            ExtractionOutcome::NotFound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const OLE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

    #[test]
    fn test_detect_format() {
        let dir = tempfile::tempdir().unwrap();

        let legacy = dir.path().join("old.ppt");
        fs::write(&legacy, OLE_MAGIC).unwrap();
        assert_eq!(detect_format(&legacy).unwrap(), Some(PresentationFormat::Ppt));

        let protected = dir.path().join("locked.pptx");
        fs::write(&protected, OLE_MAGIC).unwrap();
        assert_eq!(detect_format(&protected).unwrap(), None);

        let renamed = dir.path().join("renamed.ppt");
        fs::write(&renamed, b"PK\x03\x04....").unwrap();
        assert_eq!(detect_format(&renamed).unwrap(), Some(PresentationFormat::Pptx));

        let tiny = dir.path().join("tiny.pptx");
        fs::write(&tiny, b"").unwrap();
        assert_eq!(detect_format(&tiny).unwrap(), Some(PresentationFormat::Pptx));
    }

    #[test]
    fn test_extract_file_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = LyricExtractor::new();

        let legacy = dir.path().join("old.ppt");
        fs::write(&legacy, OLE_MAGIC).unwrap();
        assert!(matches!(
            extract_file(&legacy, &extractor),
            ExtractionOutcome::UnsupportedFormat { .. }
        ));

        let corrupt = dir.path().join("corrupt.pptx");
        fs::write(&corrupt, b"PK\x03\x04 truncated").unwrap();
        assert!(matches!(
            extract_file(&corrupt, &extractor),
            ExtractionOutcome::ExtractionFailure { .. }
        ));
    }

    #[test]
    fn test_lookup_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = SongResolver::scan(dir.path());
        assert!(matches!(
            lookup(&resolver, &LyricExtractor::new(), Some(1), "Grace"),
            ExtractionOutcome::NotFound
        ));
    }
}
