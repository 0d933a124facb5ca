//! Section marker vocabulary.
//!
//! A marker is a case-insensitive line prefix that likely opens a new
//! section (verse, chorus, bridge). It only influences group boundaries.

use serde::{Deserialize, Serialize};

/// Prefixes recognised when no table is configured.
pub const DEFAULT_MARKERS: &[&str] = &[
    // Numbered verses
    "1.", "2.", "3.", "4.", "5.", "6.", "7.", "8.", "9.",
    // Single-letter tags
    "c.", "b.", "v.", "p.",
    // Bracketed tags
    "[", "(", "【", "（",
    // Section words
    "verse", "chorus", "pre-chorus", "bridge", "ending", "outro",
    "主歌", "副歌", "導歌", "橋段", "間奏", "結尾",
];

/// Case-insensitive table of marker prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct MarkerTable {
    prefixes: Vec<String>,
}

impl MarkerTable {
    /// Build a table from prefixes. Empty prefixes are dropped.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// A table that matches nothing.
    pub fn empty() -> Self {
        Self {
            prefixes: Vec::new(),
        }
    }

    /// Whether the trimmed, case-folded line starts with any marker.
    pub fn is_marker(&self, line: &str) -> bool {
        let folded = line.trim().to_lowercase();
        self.prefixes.iter().any(|p| folded.starts_with(p.as_str()))
    }

    /// The configured prefixes, case-folded.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

impl Default for MarkerTable {
    fn default() -> Self {
        Self::new(DEFAULT_MARKERS)
    }
}

impl From<Vec<String>> for MarkerTable {
    fn from(prefixes: Vec<String>) -> Self {
        Self::new(prefixes)
    }
}

impl From<MarkerTable> for Vec<String> {
    fn from(table: MarkerTable) -> Self {
        table.prefixes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_marker_case_insensitive() {
        let table = MarkerTable::new(["C.", "b."]);
        assert!(table.is_marker("c. Chorus"));
        assert!(table.is_marker("  B. Bridge"));
        assert!(!table.is_marker("Amazing grace"));
    }

    #[test]
    fn test_empty_prefixes_dropped() {
        let table = MarkerTable::new(["", "  ", "verse"]);
        assert_eq!(table.prefixes(), ["verse"]);
        assert!(!MarkerTable::empty().is_marker("verse 1"));
    }

    #[test]
    fn test_default_table() {
        let table = MarkerTable::default();
        assert!(table.is_marker("1. 奇異恩典"));
        assert!(table.is_marker("Chorus"));
        assert!(table.is_marker("副歌"));
        assert!(table.is_marker("(repeat)"));
        assert!(!table.is_marker("10,000 reasons"));
    }
}
