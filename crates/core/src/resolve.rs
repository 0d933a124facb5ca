//! Song resolution against a loosely named deck library.
//!
//! A library is a directory tree of `.pptx`/`.ppt` files whose stems carry an
//! optional numeric prefix and the song name in arbitrary punctuation, e.g.
//! `0012-奇異恩典.pptx` or `Amazing Grace (2024).pptx`.

use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;
use walkdir::WalkDir;

/// Extensions recognised as slide decks.
pub const DECK_EXTENSIONS: &[&str] = &["pptx", "ppt"];

/// Whether a character is a CJK unified ideograph (including extension A).
fn is_cjk_ideograph(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}')
}

/// Normalize a song or file name for comparison.
///
/// Applies NFKC (so full-width Latin letters and digits fold to ASCII),
/// keeps only CJK ideographs, ASCII letters and digits, and lowercases.
pub fn normalize_name(name: &str) -> String {
    name.nfkc()
        .filter(|&c| is_cjk_ideograph(c) || c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Match rule for a numeric song id against a file stem.
///
/// The stem must start with optional zeros, the exact id, then a non-digit
/// or the end of the stem: id 12 matches `0012-Grace` but not `120 Grace`.
#[derive(Debug, Clone)]
pub struct IdPattern {
    digits: String,
}

impl IdPattern {
    /// Build the rule for an id.
    pub fn new(id: u64) -> Self {
        Self {
            digits: id.to_string(),
        }
    }

    /// Whether a file stem carries this id.
    pub fn matches(&self, stem: &str) -> bool {
        let end = stem
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(stem.len());
        let prefix = &stem[..end];
        if prefix.is_empty() {
            return false;
        }

        let significant = prefix.trim_start_matches('0');
        let significant = if significant.is_empty() { "0" } else { significant };
        significant == self.digits
    }
}

/// A deck file found in the library.
#[derive(Debug, Clone)]
pub struct LibraryEntry {
    /// Absolute or root-relative path on disk.
    pub path: PathBuf,

    /// File name without extension.
    pub stem: String,

    /// `stem` after [`normalize_name`].
    pub normalized: String,
}

impl LibraryEntry {
    fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        // Office lock files
        if file_name.starts_with("~$") {
            return None;
        }

        let ext = path.extension()?.to_str()?.to_lowercase();
        if !DECK_EXTENSIONS.contains(&ext.as_str()) {
            return None;
        }

        let stem = path.file_stem()?.to_str()?.to_string();
        Some(Self {
            path: path.to_path_buf(),
            normalized: normalize_name(&stem),
            stem,
        })
    }
}

/// Resolves song requests to deck files.
///
/// The library is scanned once when the resolver is built; the index lives
/// as long as the resolver and is never shared between runs.
#[derive(Debug, Clone, Default)]
pub struct SongResolver {
    entries: Vec<LibraryEntry>,
}

impl SongResolver {
    /// Scan a library root recursively.
    ///
    /// A missing root yields an empty index, so every lookup misses.
    /// Entries are visited in file-name order within each directory.
    pub fn scan(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        if !root.exists() {
            log::warn!("Song library not found: {}", root.display());
            return Self::default();
        }

        let entries: Vec<LibraryEntry> = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::debug!("Skipping unreadable library entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| LibraryEntry::from_path(entry.path()))
            .collect();

        log::debug!(
            "Indexed {} decks under {}",
            entries.len(),
            root.display()
        );

        Self { entries }
    }

    /// Indexed decks.
    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    /// Resolve a song to a deck path.
    ///
    /// An id match anywhere in the library wins over a name match. Among
    /// name matches (the normalized name is a substring of the normalized
    /// stem) the first one in scan order wins. A name that normalizes to
    /// nothing never matches by name.
    pub fn resolve(&self, id: Option<u64>, name: &str) -> Option<PathBuf> {
        let id_pattern = id.map(IdPattern::new);
        let target = normalize_name(name);
        let mut name_match: Option<&LibraryEntry> = None;

        for entry in &self.entries {
            if let Some(ref pattern) = id_pattern {
                if pattern.matches(&entry.stem) {
                    log::debug!("Resolved id {:?} to {}", id, entry.path.display());
                    return Some(entry.path.clone());
                }
            }

            if name_match.is_none() && !target.is_empty() && entry.normalized.contains(&target) {
                name_match = Some(entry);
            }
        }

        if let Some(entry) = name_match {
            log::debug!("Resolved '{}' to {}", name, entry.path.display());
        }
        name_match.map(|entry| entry.path.clone())
    }
}
