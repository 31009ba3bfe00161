use fc_store::Semantics;

use crate::analyzer::AnalyzedSentence;
use crate::constants::{MAX_SENTENCE_TOKENS, MIN_SENTENCE_TOKENS, SUBJECTIVITY_INDICATORS};

/// The acceptance filter: a sentence is a fact candidate only if it has a
/// plausible length, mentions at least one entity, and reads as objective
/// prose rather than opinion or editorializing.
pub fn passes_sentence_checks(sentence: &AnalyzedSentence) -> bool {
    let token_count = sentence.text.split_whitespace().count();
    if token_count < MIN_SENTENCE_TOKENS || token_count > MAX_SENTENCE_TOKENS {
        return false;
    }
    if sentence.entities.is_empty() {
        return false;
    }

    let lower = sentence.text.to_lowercase();
    !SUBJECTIVITY_INDICATORS
        .iter()
        .any(|indicator| lower.contains(indicator))
}

/// Derives grammatical semantics from an analyzed sentence: the first
/// `nsubj`-tagged token is the subject, the first `dobj`/`pobj`/`attr`
/// tagged token is the object. A sentence lacking either is rejected — it
/// doesn't carry a clear enough claim to verify against other facts.
pub fn derive_semantics(sentence: &AnalyzedSentence) -> Option<Semantics> {
    let mut subject = None;
    let mut object = None;

    for token in &sentence.tokens {
        if token.dep.contains("nsubj") && subject.is_none() {
            subject = Some(token.lemma.to_lowercase());
        }
        if (token.dep.contains("dobj") || token.dep.contains("pobj") || token.dep.contains("attr"))
            && object.is_none()
        {
            object = Some(token.lemma.to_lowercase());
        }
    }

    let subject = subject?;
    let object = object?;
    let negated = sentence.tokens.iter().any(|t| t.dep == "neg");

    Some(Semantics {
        subject,
        object,
        negated,
        entities: sentence.entities.clone(),
    })
}

/// Two facts contradict when they share a subject, differ on the object,
/// and disagree on negation (one asserts, the other denies) — or agree on
/// negation while both positively assert different objects, which is still
/// a contradiction about what the subject actually is or did.
pub fn check_contradiction(existing: &Semantics, new: &Semantics) -> bool {
    if new.subject != existing.subject || new.object == existing.object {
        return false;
    }
    new.negated != existing.negated || (!new.negated && !existing.negated)
}

/// Two facts corroborate each other when their content agrees on its first
/// 50 characters — a cheap proxy for "restates the same claim" that doesn't
/// require full semantic equivalence.
pub fn check_corroboration(existing_content: &str, new_content: &str) -> bool {
    let prefix_len = 50;
    char_prefix(existing_content, prefix_len) == char_prefix(new_content, prefix_len)
}

fn char_prefix(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}
