//! Story-file header and dictionary reading.
//!
//! The header carries a version byte and a packed dictionary address scaled
//! by a version-dependent factor. Getting that factor wrong lands the reader
//! in the middle of unrelated memory, so the x2/x4 split is spelled out here
//! and pinned by tests.

use std::fs;
use std::path::Path;

use log::{debug, info};
use thiserror::Error;

use crate::text::{decode_word, read_words};
use crate::vocabulary::{Vocabulary, classify_flags};

/// Offset of the format version byte.
const VERSION_OFFSET: usize = 0x00;
/// Offset of the packed dictionary address (big-endian u16).
const DICT_ADDR_OFFSET: usize = 0x08;
/// Minimum bytes needed to read the header fields above.
const MIN_HEADER_LEN: usize = DICT_ADDR_OFFSET + 2;

/// Oldest supported format version.
pub const MIN_VERSION: u8 = 3;
/// Newest supported format version.
pub const MAX_VERSION: u8 = 8;

/// Upper bound on plausible dictionary sizes; real games top out well below
/// a thousand entries.
const MAX_ENTRY_COUNT: usize = 10_000;

/// Typed failures from story-file decoding.
///
/// Extraction never panics: a bad file degrades to one of these, and the
/// engine runs on without a vocabulary.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("story file not found or unreadable: {0}")]
    FileNotFound(#[from] std::io::Error),
    #[error("unsupported story format version {0} (supported: {MIN_VERSION}-{MAX_VERSION})")]
    UnsupportedVersion(u8),
    #[error("malformed dictionary: {0}")]
    MalformedDictionary(String),
}

/// Bytes of packed text at the start of each entry: 2 words for version 3,
/// 3 words for every newer version.
fn encoded_text_len(version: u8) -> usize {
    if version == MIN_VERSION { 4 } else { 6 }
}

/// Packed addresses scale x2 in version 3 and x4 in versions 4 and up.
fn unpack_address(packed: u16, version: u8) -> usize {
    let multiplier = if version == MIN_VERSION { 2 } else { 4 };
    usize::from(packed) * multiplier
}

/// Read a story file and extract its dictionary as a [`Vocabulary`].
///
/// # Errors
/// - [`StoryError::FileNotFound`] when the file cannot be read.
/// - [`StoryError::UnsupportedVersion`] for versions outside 3..=8.
/// - [`StoryError::MalformedDictionary`] when the header or dictionary block
///   fails a sanity guard.
pub fn extract_vocabulary(path: &Path) -> Result<Vocabulary, StoryError> {
    let bytes = fs::read(path)?;
    info!("read story file {} ({} bytes)", path.display(), bytes.len());
    decode_vocabulary(&bytes)
}

/// Extract the dictionary from an in-memory story image.
///
/// Pure with respect to everything but the log: same bytes, same vocabulary.
///
/// # Errors
/// Same guards as [`extract_vocabulary`], minus file IO.
pub fn decode_vocabulary(bytes: &[u8]) -> Result<Vocabulary, StoryError> {
    if bytes.len() < MIN_HEADER_LEN {
        return Err(StoryError::MalformedDictionary(format!(
            "file too short for a header ({} bytes)",
            bytes.len()
        )));
    }

    let version = bytes[VERSION_OFFSET];
    if !(MIN_VERSION..=MAX_VERSION).contains(&version) {
        return Err(StoryError::UnsupportedVersion(version));
    }

    let packed = u16::from_be_bytes([bytes[DICT_ADDR_OFFSET], bytes[DICT_ADDR_OFFSET + 1]]);
    let dict_offset = unpack_address(packed, version);
    debug!("version {version}: packed dictionary address {packed:#06x} -> byte offset {dict_offset:#06x}");

    let header = bytes
        .get(dict_offset..dict_offset + 3)
        .ok_or_else(|| StoryError::MalformedDictionary(format!("dictionary offset {dict_offset:#06x} out of bounds")))?;
    let entry_count = usize::from(u16::from_be_bytes([header[0], header[1]]));
    let entry_len = usize::from(header[2]);

    if entry_count == 0 || entry_count > MAX_ENTRY_COUNT {
        return Err(StoryError::MalformedDictionary(format!(
            "implausible entry count {entry_count}"
        )));
    }
    // Each entry needs its encoded text plus at least one flag byte.
    let text_len = encoded_text_len(version);
    if entry_len < text_len + 1 {
        return Err(StoryError::MalformedDictionary(format!(
            "entry length {entry_len} leaves no flag byte after {text_len} text bytes for version {version}"
        )));
    }

    let entries_start = dict_offset + 3;
    let entries_end = entries_start + entry_count * entry_len;
    let entries = bytes.get(entries_start..entries_end).ok_or_else(|| {
        StoryError::MalformedDictionary(format!(
            "dictionary claims {entry_count} x {entry_len}-byte entries past end of file"
        ))
    })?;

    let mut vocab = Vocabulary::new(version);
    for entry in entries.chunks_exact(entry_len) {
        let word = decode_word(&read_words(&entry[..text_len]));
        let flags = entry[text_len];
        vocab.insert(word.trim().to_string(), classify_flags(flags));
    }
    info!(
        "dictionary decoded: {} words ({} verbs, {} nouns, {} adjectives, {} prepositions, {} other)",
        vocab.word_count(),
        vocab.verbs.len(),
        vocab.nouns.len(),
        vocab.adjectives.len(),
        vocab.prepositions.len(),
        vocab.other.len()
    );
    Ok(vocab)
}
