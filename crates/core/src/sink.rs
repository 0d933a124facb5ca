//! Output sinks for a generated set list.

use crate::error::Result;
use crate::types::ExtractedSong;
use std::path::Path;

/// Renders the songs of a run into one artifact file.
///
/// Songs arrive in request order with font sizes already estimated.
pub trait ArtifactSink {
    /// File name of the artifact inside the output directory.
    fn file_name(&self) -> &str;

    /// Write the artifact to `path`.
    fn write_to(&self, songs: &[ExtractedSong], path: &Path) -> Result<()>;
}
