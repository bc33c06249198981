#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
//! ** zmend **
//! Vocabulary dump tool for the parser-repair engine.
//!
//! Reads a story file, extracts its dictionary, and prints the vocabulary
//! by part of speech. Useful for checking what the validator will accept
//! before wiring a game up to the coordinator.

use anyhow::{Context, Result, bail};
use log::info;
use std::path::PathBuf;

use zmend_story::{Vocabulary, extract_vocabulary};

fn main() -> Result<()> {
    env_logger::init();

    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        bail!("usage: zmend <story-file>");
    };

    info!("extracting vocabulary from {}", path.display());
    let vocab = extract_vocabulary(&path).with_context(|| format!("while reading {}", path.display()))?;

    println!("{} (format version {})", path.display(), vocab.version);
    println!(
        "{} words: {} verbs, {} nouns, {} adjectives, {} prepositions, {} other",
        vocab.word_count(),
        vocab.verbs.len(),
        vocab.nouns.len(),
        vocab.adjectives.len(),
        vocab.prepositions.len(),
        vocab.other.len()
    );

    print_set("verbs", &vocab.verbs);
    print_set("nouns", &vocab.nouns);
    print_set("adjectives", &vocab.adjectives);
    print_set("prepositions", &vocab.prepositions);
    print_set("other", &vocab.other);
    Ok(())
}

fn print_set(label: &str, set: &std::collections::HashSet<String>) {
    if set.is_empty() {
        return;
    }
    println!("\n{label}:");
    println!("  {}", Vocabulary::sorted(set).join(", "));
}
