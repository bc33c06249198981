//! Prompt construction for the rewrite service.
//!
//! The request exposes only what the failure kind calls for: a verb problem
//! gets verbs and prepositions, a noun problem gets nouns, adjectives, and
//! prepositions, and a syntax problem gets the whole dictionary. Word lists
//! are sorted and capped so prompts stay small and deterministic, and the
//! triggering output is truncated before inclusion.

use std::collections::HashSet;

use zmend_story::Vocabulary;

use crate::classifier::{FailureInfo, FailureKind};
use crate::config::RepairConfig;
use crate::context::GameContext;
use crate::rewrite::service::{NO_REWRITE_SENTINEL, RewriteRequest};

/// Fixed system instruction: rewrite-only, sentinel on uncertainty, nothing
/// but the command in the output.
const SYSTEM_INSTRUCTION: &str = "You repair rejected text-adventure commands. Rewrite the failed command \
using only words from the vocabulary provided. Do not hint, do not solve puzzles, do not invent words or \
objects. If you are not confident a safe rewrite exists, reply with exactly NO_REWRITE. Output only the \
corrected command text, nothing else.";

/// Assemble the full request for one rewrite attempt.
pub fn build_request(
    command: &str,
    failure: &FailureInfo,
    vocab: Option<&Vocabulary>,
    context: &GameContext,
    config: &RepairConfig,
) -> RewriteRequest {
    let mut user = String::new();

    let output = truncate_chars(&failure.raw_output, config.max_output_context);
    user.push_str(&format!("Game output:\n{output}\n\n"));
    user.push_str(&format!("Failed command: {command}\n"));
    user.push_str(&format!("Failure kind: {:?}\n", failure.kind));

    if let Some(vocab) = vocab {
        for (label, set) in vocabulary_slice(failure.kind, vocab) {
            push_word_list(&mut user, label, set, config.prompt_word_cap);
        }
    }
    if !context.visible_objects.is_empty() {
        push_word_list(&mut user, "Visible objects", &context.visible_objects, config.prompt_word_cap);
    }
    if !context.exits.is_empty() {
        push_word_list(&mut user, "Exits", &context.exits, config.prompt_word_cap);
    }

    user.push_str(&format!(
        "\nRewrite the failed command, or reply {NO_REWRITE_SENTINEL} if unsure."
    ));

    RewriteRequest {
        system: SYSTEM_INSTRUCTION.to_string(),
        user,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    }
}

/// Which dictionary sets a failure kind is allowed to see.
fn vocabulary_slice(kind: FailureKind, vocab: &Vocabulary) -> Vec<(&'static str, &HashSet<String>)> {
    match kind {
        FailureKind::UnknownVerb => vec![("Verbs", &vocab.verbs), ("Prepositions", &vocab.prepositions)],
        FailureKind::UnknownNoun | FailureKind::Ambiguous => vec![
            ("Nouns", &vocab.nouns),
            ("Adjectives", &vocab.adjectives),
            ("Prepositions", &vocab.prepositions),
        ],
        FailureKind::Syntax => vec![
            ("Verbs", &vocab.verbs),
            ("Nouns", &vocab.nouns),
            ("Adjectives", &vocab.adjectives),
            ("Prepositions", &vocab.prepositions),
        ],
        // non-rewritable kinds never reach prompt construction
        FailureKind::CantDoThat | FailureKind::Darkness | FailureKind::NotHere | FailureKind::NoSuchThing => {
            Vec::new()
        },
    }
}

fn push_word_list(out: &mut String, label: &str, set: &HashSet<String>, cap: usize) {
    if set.is_empty() {
        return;
    }
    let words = Vocabulary::sorted(set);
    let shown = &words[..words.len().min(cap)];
    out.push_str(&format!("{label}: {}\n", shown.join(", ")));
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use zmend_story::vocabulary::PartOfSpeech;

    fn sample_vocab() -> Vocabulary {
        let mut vocab = Vocabulary::new(3);
        for verb in ["take", "drop", "open"] {
            vocab.insert(verb.into(), PartOfSpeech::Verb);
        }
        vocab.insert("lamp".into(), PartOfSpeech::Noun);
        vocab.insert("brass".into(), PartOfSpeech::Adjective);
        vocab.insert("with".into(), PartOfSpeech::Preposition);
        vocab
    }

    fn failure(kind: FailureKind) -> FailureInfo {
        FailureInfo {
            kind,
            matched_span: "I don't know the word".into(),
            raw_output: "I don't know the word \"grab\".".into(),
        }
    }

    #[test]
    fn verb_failure_exposes_only_verbs_and_prepositions() {
        let request = build_request(
            "grab lamp",
            &failure(FailureKind::UnknownVerb),
            Some(&sample_vocab()),
            &GameContext::default(),
            &RepairConfig::default(),
        );
        assert!(request.user.contains("Verbs: drop, open, take"));
        assert!(request.user.contains("Prepositions: with"));
        assert!(!request.user.contains("Nouns:"));
        assert!(!request.user.contains("Adjectives:"));
    }

    #[test]
    fn noun_failure_exposes_nouns_adjectives_prepositions() {
        let request = build_request(
            "take lump",
            &failure(FailureKind::UnknownNoun),
            Some(&sample_vocab()),
            &GameContext::default(),
            &RepairConfig::default(),
        );
        assert!(request.user.contains("Nouns: lamp"));
        assert!(request.user.contains("Adjectives: brass"));
        assert!(!request.user.contains("Verbs:"));
    }

    #[test]
    fn syntax_failure_exposes_everything() {
        let request = build_request(
            "lamp take now",
            &failure(FailureKind::Syntax),
            Some(&sample_vocab()),
            &GameContext::default(),
            &RepairConfig::default(),
        );
        assert!(request.user.contains("Verbs:"));
        assert!(request.user.contains("Nouns:"));
    }

    #[test]
    fn system_instruction_pins_sentinel_and_rewrite_only() {
        let request = build_request(
            "grab lamp",
            &failure(FailureKind::UnknownVerb),
            None,
            &GameContext::default(),
            &RepairConfig::default(),
        );
        assert!(request.system.contains(NO_REWRITE_SENTINEL));
        assert!(request.system.contains("Do not hint"));
        assert_eq!(request.max_tokens, RepairConfig::default().max_tokens);
    }

    #[test]
    fn output_is_truncated_to_configured_bound() {
        let mut info = failure(FailureKind::UnknownVerb);
        info.raw_output = "x".repeat(2000);
        let config = RepairConfig::default();
        let request = build_request("grab lamp", &info, None, &GameContext::default(), &config);
        let line = request.user.lines().find(|l| l.starts_with('x')).unwrap();
        assert_eq!(line.chars().count(), config.max_output_context);
    }

    #[test]
    fn context_objects_and_exits_appear_when_populated() {
        let mut ctx = GameContext::default();
        ctx.observe_object("lamp");
        ctx.observe_exit("north");
        let request = build_request(
            "grab lamp",
            &failure(FailureKind::UnknownVerb),
            None,
            &ctx,
            &RepairConfig::default(),
        );
        assert!(request.user.contains("Visible objects: lamp"));
        assert!(request.user.contains("Exits: north"));
    }

    #[test]
    fn word_lists_are_capped() {
        let mut vocab = Vocabulary::new(3);
        for i in 0..100 {
            vocab.insert(format!("verb{i:03}"), PartOfSpeech::Verb);
        }
        let mut config = RepairConfig::default();
        config.prompt_word_cap = 5;
        let request = build_request(
            "grab lamp",
            &failure(FailureKind::UnknownVerb),
            Some(&vocab),
            &GameContext::default(),
            &config,
        );
        let verbs_line = request.user.lines().find(|l| l.starts_with("Verbs:")).unwrap();
        assert_eq!(verbs_line.matches("verb").count(), 5);
    }
}
