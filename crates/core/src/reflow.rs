//! Re-grouping of a flat lyric line list into display groups.
//!
//! Lines are packed into groups of at most `max_lines`, and a marker line
//! (see [`MarkerTable`]) always opens a fresh group.

use crate::clean::split_lines;
use crate::markers::MarkerTable;
use crate::types::DisplayGroup;

/// Default number of lines per display group.
pub const DEFAULT_LINES_PER_GROUP: usize = 2;

/// Re-chunks flat lyric lines into display groups.
#[derive(Debug, Clone)]
pub struct LyricReflow {
    /// Maximum number of lines in one group.
    max_lines: usize,

    /// Prefixes that start a new section.
    markers: MarkerTable,
}

impl Default for LyricReflow {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_LINES_PER_GROUP,
            markers: MarkerTable::default(),
        }
    }
}

impl LyricReflow {
    /// Create a reflow with 2 lines per group and the default markers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of lines per group.
    pub fn with_max_lines(mut self, lines: usize) -> Self {
        self.max_lines = lines.max(1); // At least 1 line per group
        self
    }

    /// Replace the marker table.
    pub fn with_markers(mut self, markers: MarkerTable) -> Self {
        self.markers = markers;
        self
    }

    /// Group lines for display.
    ///
    /// Each entry is cleaned and split on embedded breaks the same way deck
    /// text is; blank lines are skipped. The buffer is flushed before a line when it
    /// is already full, or when it is non-empty and the line is a marker.
    ///
    /// # Example
    /// ```
    /// use setlist_core::{LyricReflow, MarkerTable};
    ///
    /// let reflow = LyricReflow::new().with_markers(MarkerTable::new(["c.", "b."]));
    /// let groups = reflow.reflow(&["c. Chorus", "line1", "line2", "b. Bridge", "line3"]);
    /// let lines: Vec<&[String]> = groups.iter().map(|g| g.lines()).collect();
    /// assert_eq!(lines, vec![&["c. Chorus", "line1"][..], &["line2"][..], &["b. Bridge", "line3"][..]]);
    /// ```
    pub fn reflow<S: AsRef<str>>(&self, lines: &[S]) -> Vec<DisplayGroup> {
        let mut groups = Vec::new();
        let mut buffer: Vec<String> = Vec::with_capacity(self.max_lines);

        for line in lines.iter().flat_map(|l| split_lines(l.as_ref())) {
            let is_marker = self.markers.is_marker(&line);
            if buffer.len() >= self.max_lines || (!buffer.is_empty() && is_marker) {
                groups.extend(DisplayGroup::from_lines(std::mem::take(&mut buffer)));
            }

            buffer.push(line);
        }

        groups.extend(DisplayGroup::from_lines(buffer));
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_lines(groups: &[DisplayGroup]) -> Vec<Vec<&str>> {
        groups
            .iter()
            .map(|g| g.lines().iter().map(String::as_str).collect())
            .collect()
    }

    fn chorus_bridge() -> LyricReflow {
        LyricReflow::new().with_markers(MarkerTable::new(["c.", "b."]))
    }

    #[test]
    fn test_reflow_empty() {
        let groups = LyricReflow::new().reflow::<&str>(&[]);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_reflow_marker_boundaries() {
        let groups = chorus_bridge().reflow(&["c. Chorus", "line1", "line2", "b. Bridge", "line3"]);
        assert_eq!(
            group_lines(&groups),
            vec![
                vec!["c. Chorus", "line1"],
                vec!["line2"],
                vec!["b. Bridge", "line3"],
            ]
        );
    }

    #[test]
    fn test_reflow_plain_pairs() {
        let groups = LyricReflow::new()
            .with_markers(MarkerTable::empty())
            .reflow(&["A", "B", "C", "D", "E"]);
        assert_eq!(
            group_lines(&groups),
            vec![vec!["A", "B"], vec!["C", "D"], vec!["E"]]
        );
    }

    #[test]
    fn test_reflow_leading_marker_no_empty_group() {
        let groups = chorus_bridge().reflow(&["b. Bridge"]);
        assert_eq!(group_lines(&groups), vec![vec!["b. Bridge"]]);
    }

    #[test]
    fn test_reflow_marker_after_full_group() {
        let groups = chorus_bridge().reflow(&["A", "B", "c. Chorus", "C"]);
        assert_eq!(
            group_lines(&groups),
            vec![vec!["A", "B"], vec!["c. Chorus", "C"]]
        );
    }

    #[test]
    fn test_reflow_consecutive_markers() {
        let groups = chorus_bridge().reflow(&["c. one", "c. two"]);
        assert_eq!(group_lines(&groups), vec![vec!["c. one"], vec!["c. two"]]);
    }

    #[test]
    fn test_reflow_skips_blank_and_cleans() {
        let groups = LyricReflow::new()
            .with_markers(MarkerTable::empty())
            .reflow(&["  A  \t a", "", "   ", "\x07", "B"]);
        assert_eq!(group_lines(&groups), vec![vec!["A a", "B"]]);
    }

    #[test]
    fn test_reflow_custom_max_lines() {
        let groups = LyricReflow::new()
            .with_max_lines(3)
            .with_markers(MarkerTable::empty())
            .reflow(&["1", "2", "3", "4"]);
        assert_eq!(group_lines(&groups), vec![vec!["1", "2", "3"], vec!["4"]]);

        let groups = LyricReflow::new().with_max_lines(0).reflow(&["x", "y"]);
        assert_eq!(group_lines(&groups), vec![vec!["x"], vec!["y"]]);
    }

    #[test]
    fn test_reflow_splits_embedded_breaks() {
        let groups = LyricReflow::new()
            .with_markers(MarkerTable::empty())
            .reflow(&["verse\u{000B}one", "page\u{000C}two"]);
        assert_eq!(
            group_lines(&groups),
            vec![vec!["verse", "one"], vec!["page", "two"]]
        );
    }
}
