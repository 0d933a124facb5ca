//! DOCX backend for set list generation.
//!
//! Writes the lyric transcript: one titled section per song, in request order.

pub mod transcript;

pub use transcript::{Placeholders, TranscriptWriter};
