//! Preview and generate runs.
//!
//! A run is synchronous: songs are processed one after another in request
//! order, and a failure on one song only degrades that song's entry.

use crate::config::PipelineConfig;
use crate::source::lookup;
use serde::Serialize;
use setlist_core::clean::{clean_title, split_lines};
use setlist_core::{
    ArtifactSink, Error, ExtractedSong, Result, SongRequest, SongResolver, SongStatus,
};
use std::fs;
use std::path::{Path, PathBuf};

/// What a run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Read-only projection of each song's extracted lines.
    Preview,
    /// Write the transcript and projection deck into `output_dir`.
    Generate { output_dir: PathBuf },
}

/// One song in a preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRecord {
    pub title: String,
    pub lines: Vec<String>,
    pub found: bool,
    pub legacy_format: bool,
}

/// Status record of a generate run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateReport {
    pub status: String,
    pub files: Vec<PathBuf>,
}

/// Result of a run in either mode.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RunOutput {
    Preview(Vec<PreviewRecord>),
    Generated(GenerateReport),
}

/// Sequences resolution, extraction, re-flow and sizing for a set list.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline over a configuration.
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run in the given mode.
    pub fn run(&self, mode: &RunMode, requests: &[SongRequest]) -> Result<RunOutput> {
        match mode {
            RunMode::Preview => self.preview(requests).map(RunOutput::Preview),
            RunMode::Generate { output_dir } => {
                self.generate(requests, output_dir).map(RunOutput::Generated)
            }
        }
    }

    /// Extract every song and flatten its lines, without writing anything.
    pub fn preview(&self, requests: &[SongRequest]) -> Result<Vec<PreviewRecord>> {
        self.validate(requests)?;
        let resolver = SongResolver::scan(&self.config.library_root);
        let extractor = self.config.extractor();

        let records = requests
            .iter()
            .map(|request| match request {
                SongRequest::WithLines { title, lines } => PreviewRecord {
                    title: clean_title(title),
                    lines: lines.iter().flat_map(|l| split_lines(l)).collect(),
                    found: true,
                    legacy_format: false,
                },
                SongRequest::ByReference { id, name } => {
                    let outcome = lookup(&resolver, &extractor, *id, name);
                    let song =
                        ExtractedSong::new(clean_title(name), outcome.status(), outcome.into_groups());
                    PreviewRecord {
                        lines: song.lines().into_iter().map(String::from).collect(),
                        found: song.found(),
                        legacy_format: song.legacy_format(),
                        title: song.title,
                    }
                }
            })
            .collect();

        Ok(records)
    }

    /// Build every song's sized display groups, in request order.
    ///
    /// Supplied lines are re-flowed; library decks keep their slide groups.
    pub fn collect_songs(&self, requests: &[SongRequest]) -> Result<Vec<ExtractedSong>> {
        self.validate(requests)?;
        let resolver = SongResolver::scan(&self.config.library_root);
        let extractor = self.config.extractor();
        let reflow = self.config.reflow();
        let estimator = &self.config.font;

        let songs = requests
            .iter()
            .map(|request| {
                let (status, groups) = match request {
                    SongRequest::WithLines { lines, .. } => {
                        (SongStatus::Supplied, reflow.reflow(lines.as_slice()))
                    }
                    SongRequest::ByReference { id, name } => {
                        let outcome = lookup(&resolver, &extractor, *id, name);
                        (outcome.status(), outcome.into_groups())
                    }
                };

                let groups = groups
                    .into_iter()
                    .map(|group| {
                        let size = estimator.estimate(group.lines());
                        group.with_font_size(size)
                    })
                    .collect();

                ExtractedSong::new(clean_title(request.title()), status, groups)
            })
            .collect();

        Ok(songs)
    }

    /// Generate the transcript and projection deck into `output_dir`.
    pub fn generate(&self, requests: &[SongRequest], output_dir: &Path) -> Result<GenerateReport> {
        let transcript = self.config.transcript_writer();
        let deck = self.config.deck_writer();
        self.config.deck.validate()?;
        transcript.check_template()?;
        self.generate_with(requests, output_dir, &[&transcript, &deck])
    }

    /// Generate with explicit sinks, each writing one file into `output_dir`.
    ///
    /// Every sink renders into a staging file first. The artifacts appear
    /// under their final names only once all sinks have succeeded.
    pub fn generate_with(
        &self,
        requests: &[SongRequest],
        output_dir: &Path,
        sinks: &[&dyn ArtifactSink],
    ) -> Result<GenerateReport> {
        if output_dir.as_os_str().is_empty() {
            return Err(Error::InvalidRequest("output directory required".to_string()));
        }

        let songs = self.collect_songs(requests)?;
        fs::create_dir_all(output_dir)?;

        let mut staged = Vec::with_capacity(sinks.len());
        for sink in sinks {
            let staging = tempfile::Builder::new()
                .prefix(".setlist-")
                .tempfile_in(output_dir)?;
            sink.write_to(&songs, staging.path())?;
            staged.push((staging, output_dir.join(sink.file_name())));
        }

        let mut files: Vec<PathBuf> = Vec::with_capacity(staged.len());
        for (staging, path) in staged {
            if let Err(e) = staging.persist(&path) {
                for written in &files {
                    if let Err(err) = fs::remove_file(written) {
                        log::warn!("Failed to remove {}: {}", written.display(), err);
                    }
                }
                return Err(Error::IoError(e.error));
            }
            log::debug!("Persisted {}", path.display());
            files.push(path);
        }

        Ok(GenerateReport {
            status: "success".to_string(),
            files,
        })
    }

    /// Reject runs that cannot start: unusable library or unnamed library songs.
    fn validate(&self, requests: &[SongRequest]) -> Result<()> {
        let root = &self.config.library_root;
        if !root.is_dir() {
            return Err(Error::LibraryUnavailable(format!(
                "'{}' is not a directory",
                root.display()
            )));
        }

        for (idx, request) in requests.iter().enumerate() {
            if let SongRequest::ByReference { name, .. } = request {
                if name.trim().is_empty() {
                    return Err(Error::InvalidRequest(format!("song {} has no name", idx + 1)));
                }
            }
        }

        Ok(())
    }
}
