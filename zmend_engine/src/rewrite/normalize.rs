//! Reply normalization.
//!
//! The rewrite service is asked for a bare command, but real replies arrive
//! as labeled lines, quoted fragments, or a sentence of prose with the
//! command buried in it. This module boils any of those down to a clean
//! lowercase command, or to nothing when the sentinel (or no command-shaped
//! text at all) comes back.

use crate::rewrite::service::NO_REWRITE_SENTINEL;

/// Leading words that mark a line as explanatory prose, not a command.
const DISCOURSE_MARKERS: &[&str] = &[
    "well", "sure", "okay", "ok", "sorry", "note", "here", "hmm", "unfortunately", "i", "i'm", "i'd", "the",
    "this", "that", "it", "you", "a", "an",
];

/// Shortest leading token a command line can start with.
const MIN_LEAD_TOKEN: usize = 2;
/// Longest leading token a command line can start with.
const MAX_LEAD_TOKEN: usize = 10;

/// Reduce a raw service reply to a command, if one is present.
///
/// Returns `None` for the sentinel, for empty results, and for anything
/// longer than `max_reply_len` after cleanup. The ladder mirrors how
/// replies degrade: plain command, labeled command, quoted command, then a
/// line-by-line scan past the prose.
pub fn normalize_reply(raw: &str, max_reply_len: usize) -> Option<String> {
    if raw.to_lowercase().contains(&NO_REWRITE_SENTINEL.to_lowercase()) {
        return None;
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = if is_plain_word_sequence(trimmed) {
        trimmed.to_string()
    } else if let Some(value) = label_value(trimmed) {
        value
    } else if let Some(inner) = strip_quotes(trimmed) {
        inner.to_string()
    } else {
        scan_lines(trimmed, max_reply_len)?
    };

    cleanup(&candidate, max_reply_len)
}

/// Collapse whitespace, strip trailing sentence punctuation, lowercase.
fn cleanup(candidate: &str, max_reply_len: usize) -> Option<String> {
    let collapsed = candidate.split_whitespace().collect::<Vec<_>>().join(" ");
    let stripped = collapsed.trim_end_matches(['.', '!', '?']).trim().to_lowercase();
    if stripped.is_empty() || stripped.chars().count() > max_reply_len {
        return None;
    }
    Some(stripped)
}

/// A single line of nothing but lowercase letters and spaces.
fn is_plain_word_sequence(text: &str) -> bool {
    !text.contains('\n') && text.chars().all(|c| c.is_ascii_lowercase() || c == ' ')
}

/// `Label: value` on some line starts the value after the first colon.
fn label_value(text: &str) -> Option<String> {
    for line in text.lines() {
        if let Some((label, value)) = line.split_once(':') {
            let label = label.trim();
            let value = value.trim();
            if !label.is_empty()
                && label.chars().count() <= 20
                && label.chars().all(|c| c.is_alphabetic() || c.is_whitespace())
                && !value.is_empty()
            {
                return Some(strip_quotes(value).unwrap_or(value).to_string());
            }
        }
    }
    None
}

/// Remove one layer of surrounding quotes; `None` when there is none.
fn strip_quotes(text: &str) -> Option<&str> {
    for quote in ['"', '\'', '`'] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|rest| rest.strip_suffix(quote)) {
            return Some(inner.trim());
        }
    }
    None
}

/// Scan line by line past explanatory prose and take the first line that
/// looks like a command.
fn scan_lines(text: &str, max_reply_len: usize) -> Option<String> {
    for line in text.lines() {
        let line = line.trim().trim_matches(['"', '\'', '`']);
        if line.is_empty() || line.ends_with(':') {
            continue;
        }
        let first = line.split_whitespace().next()?.to_lowercase();
        if DISCOURSE_MARKERS.contains(&first.as_str()) {
            continue;
        }
        let lead_len = first.chars().count();
        if first.chars().all(char::is_alphabetic)
            && (MIN_LEAD_TOKEN..=MAX_LEAD_TOKEN).contains(&lead_len)
            && line.chars().count() < max_reply_len
        {
            return Some(line.to_string());
        }
    }
    None
}
