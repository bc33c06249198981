//! Story-file decoding for the zmend parser-repair engine.
//!
//! A story file embeds the dictionary of every word its parser recognizes.
//! This crate reads that table out of the binary image and exposes it as a
//! [`Vocabulary`], the ground truth the rewrite validator checks proposed
//! commands against.

pub mod builder;
pub mod story;
pub mod text;
pub mod vocabulary;

pub use builder::StoryBuilder;
pub use story::{StoryError, decode_vocabulary, extract_vocabulary};
pub use vocabulary::{PartOfSpeech, Vocabulary};
