//! Set list runs: resolve each requested song in the library, extract its
//! lyrics, and either preview them or generate the transcript and
//! projection deck.

pub mod config;
pub mod run;
pub mod source;

pub use config::PipelineConfig;
pub use run::{GenerateReport, Pipeline, PreviewRecord, RunMode, RunOutput};
pub use source::{detect_format, extract_file, lookup};
