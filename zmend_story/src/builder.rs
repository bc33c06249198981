//! Synthetic story-image assembly for tests.
//!
//! The engine never writes story files; this builder exists so dictionary
//! fixtures can be expressed as data ("these words, these flags") instead of
//! hand-laid byte arrays.

use crate::text::encode_word;

/// Byte offset the builder places the dictionary at. Divisible by both
/// packed-address multipliers so every version can address it.
const DICT_BYTE_OFFSET: usize = 0x40;

/// Assembles a minimal story image: header, padding, and a dictionary block.
#[derive(Debug, Clone, Default)]
pub struct StoryBuilder {
    version: u8,
    words: Vec<(String, u8)>,
}

impl StoryBuilder {
    pub fn new(version: u8) -> Self {
        Self {
            version,
            words: Vec::new(),
        }
    }

    /// Add a dictionary entry with the given flag byte.
    #[must_use]
    pub fn word(mut self, text: &str, flags: u8) -> Self {
        self.words.push((text.to_string(), flags));
        self
    }

    /// Assemble a well-formed image.
    pub fn build(&self) -> Vec<u8> {
        self.assemble(self.version, self.words.len(), self.entry_len())
    }

    /// Assemble with a raw version byte, bypassing the valid 3..=8 range.
    pub fn build_with_version_byte(&self, version: u8) -> Vec<u8> {
        self.assemble(version, self.words.len(), self.entry_len())
    }

    /// Assemble with an overridden entry-count field.
    pub fn build_with_entry_count(&self, count: usize) -> Vec<u8> {
        self.assemble(self.version, count, self.entry_len())
    }

    /// Assemble with an overridden entry-length field.
    pub fn build_with_entry_len(&self, entry_len: usize) -> Vec<u8> {
        self.assemble(self.version, self.words.len(), entry_len)
    }

    fn text_words(&self) -> usize {
        if self.version == 3 { 2 } else { 3 }
    }

    /// Encoded text plus one flag byte plus two data bytes, the common
    /// on-disk shape.
    fn entry_len(&self) -> usize {
        self.text_words() * 2 + 3
    }

    fn assemble(&self, version_byte: u8, claimed_count: usize, claimed_entry_len: usize) -> Vec<u8> {
        let multiplier = if self.version == 3 { 2 } else { 4 };
        let packed = (DICT_BYTE_OFFSET / multiplier) as u16;

        let mut image = vec![0u8; DICT_BYTE_OFFSET];
        image[0x00] = version_byte;
        image[0x08..0x0A].copy_from_slice(&packed.to_be_bytes());

        image.extend_from_slice(&(claimed_count as u16).to_be_bytes());
        image.push(claimed_entry_len as u8);

        let real_entry_len = self.entry_len();
        for (text, flags) in &self.words {
            for word in encode_word(text, self.text_words()) {
                image.extend_from_slice(&word.to_be_bytes());
            }
            image.push(*flags);
            image.resize(image.len() + (real_entry_len - self.text_words() * 2 - 1), 0);
        }
        image
    }
}
