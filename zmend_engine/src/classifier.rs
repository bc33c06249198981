//! Parser-failure classification.
//!
//! Maps one turn's worth of interpreter output to a [`FailureKind`], or to
//! "no failure". The classifier is a pure function over an ordered table of
//! `(pattern, kind)` pairs: first match wins, and the ordering is
//! load-bearing. Ambiguity and darkness phrasing would otherwise be captured
//! by the broader noun/verb expressions further down, so those rows sit at
//! the top.

use std::sync::LazyLock;

use regex::Regex;

/// Category of a rejected or refused command, as printed by the interpreter.
///
/// The first four are parser confusion and are candidates for an automated
/// rewrite. The rest are legitimate simulation responses ("you can't do
/// that" is the game talking, not the parser) and must never trigger one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum FailureKind {
    UnknownVerb,
    UnknownNoun,
    Ambiguous,
    Syntax,
    CantDoThat,
    Darkness,
    NotHere,
    NoSuchThing,
}

impl FailureKind {
    /// Whether a failure of this kind may be handed to rewrite arbitration.
    pub fn is_rewritable(self) -> bool {
        matches!(
            self,
            FailureKind::UnknownVerb | FailureKind::UnknownNoun | FailureKind::Ambiguous | FailureKind::Syntax
        )
    }
}

/// One classification result, produced per call and owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureInfo {
    pub kind: FailureKind,
    /// The substring of the output that triggered the match.
    pub matched_span: String,
    /// The full buffered output for the turn.
    pub raw_output: String,
}

/// The ordered message table. Rows are evaluated top to bottom; a row's
/// position is part of its meaning. In particular:
/// - ambiguity and darkness come before everything broader;
/// - "you can't see any such thing" is the parser failing to resolve a noun
///   and must land on `UnknownNoun`, so it precedes the game-response
///   "no such thing" row that would otherwise swallow it.
static MESSAGE_TABLE: LazyLock<Vec<(Regex, FailureKind)>> = LazyLock::new(|| {
    [
        (r"(?i)which (?:\w+ )?do you mean", FailureKind::Ambiguous),
        (r"(?i)do you mean the ", FailureKind::Ambiguous),
        (r"(?i)(?:please )?be more specific", FailureKind::Ambiguous),
        (r"(?i)pitch (?:dark|black)", FailureKind::Darkness),
        (r"(?i)too dark to (?:see|tell)", FailureKind::Darkness),
        (r"(?i)you can't see any ?such thing", FailureKind::UnknownNoun),
        (r"(?i)you can't do that", FailureKind::CantDoThat),
        (r"(?i)that's not something you can", FailureKind::CantDoThat),
        (r"(?i)you aren't able to do that", FailureKind::CantDoThat),
        (r"(?i)violence isn't the answer", FailureKind::CantDoThat),
        (r"(?i)(?:that |it )?isn't here", FailureKind::NotHere),
        (r"(?i)you don't see (?:that|it) here", FailureKind::NotHere),
        (r"(?i)there(?:'s| is) no such thing", FailureKind::NoSuchThing),
        (r"(?i)nothing like that (?:here|around)", FailureKind::NoSuchThing),
        (r"(?i)i don't know the word", FailureKind::UnknownVerb),
        (r"(?i)that's not a verb i recogni[sz]e", FailureKind::UnknownVerb),
        (r"(?i)i don't recogni[sz]e that verb", FailureKind::UnknownVerb),
        (r"(?i)i don't see any ", FailureKind::UnknownNoun),
        (r"(?i)you used the word .* in a way that i don't understand", FailureKind::UnknownNoun),
        (r"(?i)i didn't understand that sentence", FailureKind::Syntax),
        (r"(?i)i only understood you as far as", FailureKind::Syntax),
        (r"(?i)that sentence isn't one i recogni[sz]e", FailureKind::Syntax),
        (r"(?i)i beg your pardon", FailureKind::Syntax),
        (r"(?i)you seem to want to talk to someone", FailureKind::Syntax),
    ]
    .into_iter()
    .map(|(pattern, kind)| {
        let regex = Regex::new(pattern).unwrap_or_else(|err| panic!("bad message pattern {pattern:?}: {err}"));
        (regex, kind)
    })
    .collect()
});

/// Output longer than this cannot be a parser complaint.
const HEURISTIC_MAX_LEN: usize = 80;
/// A "room title" line this short and capitalized signals a look response.
const ROOM_TITLE_MAX_LEN: usize = 40;

/// Match `output` against the known message table only. Used where a
/// definite pattern is needed (turn-completion probing) and the best-effort
/// heuristic would fire on harmless partial text.
pub fn match_known_pattern(output: &str) -> Option<FailureInfo> {
    for (regex, kind) in MESSAGE_TABLE.iter() {
        if let Some(found) = regex.find(output) {
            return Some(FailureInfo {
                kind: *kind,
                matched_span: found.as_str().to_string(),
                raw_output: output.to_string(),
            });
        }
    }
    None
}

/// Classify one turn of interpreter output.
///
/// Table rows are tried first; if none match, a catch-all heuristic treats a
/// short, single-paragraph response with no room-title line as a probable
/// parser failure from a message set we have no rows for. Those fold into
/// [`FailureKind::Syntax`]: the validator, not the classifier, is the gate
/// that keeps a bad rewrite from going anywhere.
///
/// Pure: identical input always yields an identical result.
pub fn classify(output: &str) -> Option<FailureInfo> {
    if let Some(info) = match_known_pattern(output) {
        return Some(info);
    }

    let trimmed = output.trim();
    if looks_like_unregistered_failure(trimmed) {
        return Some(FailureInfo {
            kind: FailureKind::Syntax,
            matched_span: trimmed.to_string(),
            raw_output: output.to_string(),
        });
    }
    None
}

/// Catch-all for interpreters whose message set has no table rows: short,
/// one paragraph, and nothing that reads like a room description.
fn looks_like_unregistered_failure(trimmed: &str) -> bool {
    !trimmed.is_empty()
        && trimmed.chars().count() < HEURISTIC_MAX_LEN
        && !trimmed.contains("\n\n")
        && !trimmed.lines().any(looks_like_room_title)
}

/// A short line of capitalized words with no sentence punctuation, e.g.
/// "West of House".
fn looks_like_room_title(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() || line.chars().count() > ROOM_TITLE_MAX_LEN {
        return false;
    }
    if line.ends_with(['.', '!', '?', ':', ',']) {
        return false;
    }
    let mut words = line.split_whitespace().peekable();
    if words.peek().is_none() {
        return false;
    }
    words.all(|word| word.chars().next().is_some_and(char::is_uppercase) || is_title_particle(word))
}

/// Lowercase connectives allowed inside a title ("West of House").
fn is_title_particle(word: &str) -> bool {
    matches!(word, "of" | "the" | "in" | "on" | "at" | "to" | "and")
}
