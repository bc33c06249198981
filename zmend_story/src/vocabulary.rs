//! Vocabulary model and part-of-speech classification.
//!
//! Each dictionary entry carries flag bytes after its encoded text; the
//! first flag byte assigns the word to exactly one part of speech. The
//! resulting [`Vocabulary`] is immutable once built and owned by the active
//! game session.

use std::collections::HashSet;

/// Flag bit marking a verb.
pub const FLAG_VERB: u8 = 0x01;
/// Flag bit marking a preposition.
pub const FLAG_PREPOSITION: u8 = 0x08;
/// Flag bit marking an adjective.
pub const FLAG_ADJECTIVE: u8 = 0x20;
/// Flag bit marking a noun.
pub const FLAG_NOUN: u8 = 0x80;

/// The single part of speech assigned to a dictionary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartOfSpeech {
    Verb,
    Noun,
    Adjective,
    Preposition,
    Other,
}

/// Classify a word from its first flag byte.
///
/// Several games set more than one bit; precedence is fixed so that every
/// entry lands in exactly one set: verb, then preposition, then adjective,
/// then noun. Entries matching no known bit become [`PartOfSpeech::Other`].
pub fn classify_flags(flags: u8) -> PartOfSpeech {
    if flags & FLAG_VERB != 0 {
        PartOfSpeech::Verb
    } else if flags & FLAG_PREPOSITION != 0 {
        PartOfSpeech::Preposition
    } else if flags & FLAG_ADJECTIVE != 0 {
        PartOfSpeech::Adjective
    } else if flags & FLAG_NOUN != 0 {
        PartOfSpeech::Noun
    } else {
        PartOfSpeech::Other
    }
}

/// The complete word list a story file's parser recognizes.
///
/// All words are lowercase and trimmed; the four part-of-speech sets are
/// mutually exclusive, with unclassified entries collected in `other`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    /// Story format major version (3..=8).
    pub version: u8,
    pub verbs: HashSet<String>,
    pub nouns: HashSet<String>,
    pub adjectives: HashSet<String>,
    pub prepositions: HashSet<String>,
    pub other: HashSet<String>,
}

impl Vocabulary {
    pub fn new(version: u8) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// File a word under its part of speech. Empty decodes are dropped.
    pub fn insert(&mut self, word: String, part: PartOfSpeech) {
        if word.is_empty() {
            return;
        }
        match part {
            PartOfSpeech::Verb => self.verbs.insert(word),
            PartOfSpeech::Noun => self.nouns.insert(word),
            PartOfSpeech::Adjective => self.adjectives.insert(word),
            PartOfSpeech::Preposition => self.prepositions.insert(word),
            PartOfSpeech::Other => self.other.insert(word),
        };
    }

    pub fn contains_verb(&self, word: &str) -> bool {
        self.verbs.contains(word)
    }

    pub fn contains_noun(&self, word: &str) -> bool {
        self.nouns.contains(word)
    }

    pub fn contains_adjective(&self, word: &str) -> bool {
        self.adjectives.contains(word)
    }

    pub fn contains_preposition(&self, word: &str) -> bool {
        self.prepositions.contains(word)
    }

    /// Total entries across every set.
    pub fn word_count(&self) -> usize {
        self.verbs.len() + self.nouns.len() + self.adjectives.len() + self.prepositions.len() + self.other.len()
    }

    /// Sorted copy of a set, for deterministic display and prompt assembly.
    pub fn sorted(set: &HashSet<String>) -> Vec<&str> {
        let mut words: Vec<&str> = set.iter().map(String::as_str).collect();
        words.sort_unstable();
        words
    }
}
