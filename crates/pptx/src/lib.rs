//! PPTX (Office Open XML) backend for set list generation.
//!
//! Reads song decks (.pptx ZIP archives of XML parts) into the positioned
//! shape model, and writes the projection deck.

pub mod parser;
pub mod writer;

pub use parser::PptxParser;
pub use writer::{DeckStyle, DeckWriter};
