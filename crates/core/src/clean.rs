//! Cleaning of raw shape text into lyric lines.
//!
//! Strips control characters that are not valid in XML output, collapses
//! horizontal whitespace and splits text on hard and soft line breaks.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Regex to collapse runs of tabs and spaces into one space.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

/// Soft line break as it appears in a shape's text payload.
pub const SOFT_BREAK: char = '\u{000B}';

/// Page break, treated like a line break.
pub const FORM_FEED: char = '\u{000C}';

/// Whether a character lies in the stripped control ranges.
///
/// Tab, line feed, vertical tab, form feed and carriage return (0x09-0x0D) are kept.
fn is_stripped_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0E}'..='\u{1F}')
}

/// Remove control characters in `0x00-0x08` and `0x0E-0x1F`.
pub fn strip_control_chars(text: &str) -> String {
    text.chars().filter(|&c| !is_stripped_control(c)).collect()
}

/// Collapse every run of tabs and spaces into a single space.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_COLLAPSE_REGEX.replace_all(text, " ").into_owned()
}

/// Clean one line: strip control characters, collapse whitespace, trim.
///
/// The result is empty when the line carried no visible text.
pub fn clean_line(line: &str) -> String {
    collapse_whitespace(&strip_control_chars(line))
        .trim()
        .to_string()
}

/// Split a shape's text into cleaned, non-blank lines.
///
/// Soft breaks and form feeds are treated as hard breaks; `\r\n` and lone
/// `\r` count as one break.
pub fn split_lines(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .replace(['\r', SOFT_BREAK, FORM_FEED], "\n")
        .lines()
        .map(clean_line)
        .filter(|l| !l.is_empty())
        .collect()
}

/// Clean a song title onto one line; breaks inside it become spaces.
pub fn clean_title(title: &str) -> String {
    split_lines(title).join(" ")
}

/// Whether a character may appear in XML 1.0 text.
pub fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{09}' | '\u{0A}' | '\u{0D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Drop characters that XML 1.0 cannot carry, borrowing when there are none.
pub fn xml_safe(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| is_xml_char(c)).collect())
    }
}
