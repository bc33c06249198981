//! Packed 5-bit text decoding.
//!
//! Dictionary words are stored as a run of 2-byte words, each holding three
//! 5-bit units (bits 14..10, 9..5, 4..0). Unit 0 ends the word, units 1-5
//! are shift/abbreviation markers with no character of their own, and units
//! 6-31 map onto `a`..`z`.

/// Terminates the encoded word.
const END_OF_WORD: u8 = 0;
/// Last shift/abbreviation marker; units 1..=5 are skipped during decode.
const LAST_MARKER: u8 = 5;
/// First unit that carries a letter (`a`).
const FIRST_LETTER: u8 = 6;

/// Split a 2-byte word into its three 5-bit units, high bits first.
pub fn split_units(word: u16) -> [u8; 3] {
    [
        ((word >> 10) & 0x1F) as u8,
        ((word >> 5) & 0x1F) as u8,
        (word & 0x1F) as u8,
    ]
}

/// Decode a run of packed words into lowercase text.
///
/// Decoding is total and deterministic: any byte pattern yields some string,
/// and the same words always yield the same string.
pub fn decode_word(words: &[u16]) -> String {
    let mut out = String::new();
    for word in words {
        for unit in split_units(*word) {
            if unit == END_OF_WORD {
                return out;
            }
            if unit <= LAST_MARKER {
                // shift / abbreviation marker: no character emitted
                continue;
            }
            out.push((b'a' + (unit - FIRST_LETTER)) as char);
        }
    }
    out
}

/// Read big-endian 2-byte words from a byte slice.
///
/// An odd trailing byte is ignored; dictionary entries are always stored as
/// whole words.
pub fn read_words(bytes: &[u8]) -> Vec<u16> {
    bytes.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect()
}

/// Encode lowercase text into packed words, padding with unit 5.
///
/// Only used to assemble fixtures via [`crate::StoryBuilder`]; the engine
/// itself never writes story files.
pub fn encode_word(text: &str, word_count: usize) -> Vec<u16> {
    let mut units: Vec<u8> = text
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .take(word_count * 3)
        .map(|c| (c as u8 - b'a') + FIRST_LETTER)
        .collect();
    units.resize(word_count * 3, LAST_MARKER);
    units
        .chunks_exact(3)
        .map(|chunk| (u16::from(chunk[0]) << 10) | (u16::from(chunk[1]) << 5) | u16::from(chunk[2]))
        .collect()
}
