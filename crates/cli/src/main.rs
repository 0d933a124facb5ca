//! CLI for previewing and generating worship set list artifacts.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use setlist_core::{MarkerTable, SongRequest};
use setlist_pipeline::{Pipeline, PipelineConfig, RunMode};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Build lyric previews, transcripts and projection decks from a song library.
#[derive(Parser, Debug)]
#[command(name = "setlist")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print each song's extracted lines as JSON
    Preview(Common),

    /// Write the transcript and projection deck
    Generate {
        #[command(flatten)]
        common: Common,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Maximum lines per slide for supplied lyrics
        #[arg(short = 'l', long)]
        lines_per_group: Option<usize>,

        /// Fraction of the slide height, from the top, holding lyrics
        #[arg(long)]
        upper_fraction: Option<f64>,

        /// Section marker prefix (repeatable, replaces the defaults)
        #[arg(short, long = "marker")]
        markers: Vec<String>,
    },
}

#[derive(Args, Debug)]
struct Common {
    /// Song library directory
    #[arg(long)]
    library: PathBuf,

    /// JSON list of songs (default: stdin)
    #[arg(short, long)]
    songs: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match run(cli.command) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{:#}", e);
            println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<String> {
    let (common, mode, overrides) = match command {
        Command::Preview(common) => (common, RunMode::Preview, Overrides::default()),
        Command::Generate {
            common,
            output,
            lines_per_group,
            upper_fraction,
            markers,
        } => (
            common,
            RunMode::Generate { output_dir: output },
            Overrides {
                lines_per_group,
                upper_fraction,
                markers,
            },
        ),
    };

    let mut config = load_config(common.config.as_deref())?;
    config.library_root = common.library;
    overrides.apply(&mut config);

    let requests = parse_songs(&read_songs(common.songs.as_deref())?)?;
    log::debug!("{} songs requested", requests.len());

    let output = Pipeline::new(config).run(&mode, &requests)?;
    serde_json::to_string(&output).context("Failed to serialize output")
}

/// Command-line settings that win over the config file.
#[derive(Debug, Default)]
struct Overrides {
    lines_per_group: Option<usize>,
    upper_fraction: Option<f64>,
    markers: Vec<String>,
}

impl Overrides {
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(lines) = self.lines_per_group {
            config.lines_per_group = lines;
        }
        if let Some(fraction) = self.upper_fraction {
            config.upper_fraction = fraction;
        }
        if !self.markers.is_empty() {
            config.markers = MarkerTable::new(self.markers);
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid config {}", path.display()))
}

fn read_songs(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("Failed to read songs {}", path.display())),
        _ => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read songs from stdin")?;
            Ok(input)
        }
    }
}

fn parse_songs(input: &str) -> Result<Vec<SongRequest>> {
    serde_json::from_str(input).context("Invalid song list")
}
