//! Constraint-grammar validation of normalized rewrites.
//!
//! A rewrite is only forwarded when every word of it is accounted for: the
//! verb must come from the dictionary, and each object word must come from
//! the dictionary's noun set, the visible objects, or the inventory. The
//! accepted shape after the verb is `[adjective] noun [preposition
//! [adjective] noun]`. Rejection is a designed control, not an error: the
//! diagnostics exist for the audit log, and nothing is ever forwarded on a
//! reject.

use log::debug;
use thiserror::Error;
use zmend_story::Vocabulary;

use crate::config::{NoVocabPolicy, RepairConfig};
use crate::context::GameContext;

/// Longest command the validator will pass, in tokens.
const MAX_TOKENS: usize = 5;

/// Articles carry no dictionary meaning and are skipped by the grammar.
const ARTICLES: &[&str] = &["a", "an", "the"];

/// A specific reason a rewrite was rejected, for the audit trail.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Violation {
    #[error("rewrite has {0} tokens (limit {MAX_TOKENS})")]
    TooManyTokens(usize),
    #[error("rewrite is empty")]
    Empty,
    #[error("first token '{0}' is not a known verb")]
    UnknownVerb(String),
    #[error("'{0}' is not a known noun, visible object, or inventory item")]
    UnknownNoun(String),
    #[error("'{0}' is not a known preposition")]
    UnknownPreposition(String),
    #[error("expected a noun after '{0}'")]
    DanglingPhrase(String),
    #[error("no vocabulary available and rewrites are disabled without one")]
    NoVocabulary,
}

/// Validate a normalized rewrite against vocabulary and observed context.
///
/// # Errors
/// The violation list describing every reason the text was refused. In
/// strict mode any unknown verb, noun, or preposition rejects; permissive
/// mode logs them and lets context carry the weight. Structural problems
/// (empty, over the token cap, nothing where a noun belongs) reject in
/// either mode.
pub fn validate_rewrite(
    rewrite: &str,
    vocab: Option<&Vocabulary>,
    context: &GameContext,
    config: &RepairConfig,
) -> Result<(), Vec<Violation>> {
    let Some(vocab) = vocab else {
        return match config.no_vocab_policy {
            NoVocabPolicy::DisableRewrites => Err(vec![Violation::NoVocabulary]),
            NoVocabPolicy::Permissive => validate_structure_only(rewrite, context),
        };
    };

    let tokens: Vec<&str> = rewrite.split_whitespace().collect();
    if tokens.is_empty() {
        return Err(vec![Violation::Empty]);
    }
    if tokens.len() > MAX_TOKENS {
        return Err(vec![Violation::TooManyTokens(tokens.len())]);
    }

    let mut violations = Vec::new();
    let mut strict_reject = false;

    if !vocab.contains_verb(tokens[0]) {
        violations.push(Violation::UnknownVerb(tokens[0].to_string()));
        strict_reject = true;
    }

    match_grammar(&tokens[1..], vocab, context, &mut violations, &mut strict_reject);

    if (config.strict && strict_reject) || violations.iter().any(is_structural) {
        debug!("rewrite {rewrite:?} rejected: {violations:?}");
        return Err(violations);
    }
    if !violations.is_empty() {
        debug!("rewrite {rewrite:?} accepted permissively despite: {violations:?}");
    }
    Ok(())
}

/// `[adjective] noun [preposition [adjective] noun]` over the post-verb
/// tokens, with articles skipped.
fn match_grammar(
    tokens: &[&str],
    vocab: &Vocabulary,
    context: &GameContext,
    violations: &mut Vec<Violation>,
    strict_reject: &mut bool,
) {
    let meaningful: Vec<&str> = tokens.iter().copied().filter(|t| !ARTICLES.contains(t)).collect();
    let mut rest = meaningful.as_slice();

    // bare verb is a complete command
    if rest.is_empty() {
        return;
    }

    rest = consume_noun_phrase(rest, vocab, context, violations, strict_reject);

    if let Some((prep, after)) = rest.split_first() {
        if !vocab.contains_preposition(prep) {
            violations.push(Violation::UnknownPreposition((*prep).to_string()));
            *strict_reject = true;
        }
        if after.is_empty() {
            violations.push(Violation::DanglingPhrase((*prep).to_string()));
            return;
        }
        let leftover = consume_noun_phrase(after, vocab, context, violations, strict_reject);
        for extra in leftover {
            violations.push(Violation::UnknownNoun((*extra).to_string()));
            *strict_reject = true;
        }
    }
}

/// Consume `[adjective] noun`, returning the tokens after it.
fn consume_noun_phrase<'a>(
    tokens: &'a [&'a str],
    vocab: &Vocabulary,
    context: &GameContext,
    violations: &mut Vec<Violation>,
    strict_reject: &mut bool,
) -> &'a [&'a str] {
    let mut idx = 0;
    if tokens.len() > 1 && vocab.contains_adjective(tokens[0]) {
        idx = 1;
    }
    let noun = tokens[idx];
    if !noun_is_known(noun, vocab, context) {
        violations.push(Violation::UnknownNoun(noun.to_string()));
        *strict_reject = true;
    }
    &tokens[idx + 1..]
}

/// A noun passes on the dictionary's noun set, or softly on anything the
/// player can observably see or is carrying.
fn noun_is_known(word: &str, vocab: &Vocabulary, context: &GameContext) -> bool {
    vocab.contains_noun(word) || context.knows_object(word) || context_word_match(word, context)
}

/// Observed object names may be multi-word ("brass lantern"); accept a
/// token that appears as a word of one.
fn context_word_match(word: &str, context: &GameContext) -> bool {
    context
        .visible_objects
        .iter()
        .chain(&context.inventory)
        .any(|name| name.split_whitespace().any(|part| part == word))
}

/// With no vocabulary at all, only shape can be checked.
fn validate_structure_only(rewrite: &str, _context: &GameContext) -> Result<(), Vec<Violation>> {
    let tokens: Vec<&str> = rewrite.split_whitespace().collect();
    if tokens.is_empty() {
        return Err(vec![Violation::Empty]);
    }
    if tokens.len() > MAX_TOKENS {
        return Err(vec![Violation::TooManyTokens(tokens.len())]);
    }
    Ok(())
}

/// Violations that reject regardless of strictness.
fn is_structural(violation: &Violation) -> bool {
    matches!(
        violation,
        Violation::Empty | Violation::TooManyTokens(_) | Violation::DanglingPhrase(_) | Violation::NoVocabulary
    )
}
