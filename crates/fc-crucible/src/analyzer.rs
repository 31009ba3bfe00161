use std::collections::HashSet;

/// A single analyzed token: its lemma, part-of-speech tag, and dependency
/// relation to its head, in the conventions of a typical dependency parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedToken {
    pub lemma: String,
    pub pos: String,
    pub dep: String,
}

/// One sentence's worth of parsed output: its tokens (for dependency-based
/// subject/object extraction and negation detection) and the named entities
/// it contains (for the acceptance filter and relationship detection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedSentence {
    pub text: String,
    pub tokens: Vec<AnalyzedToken>,
    pub entities: Vec<String>,
}

/// External natural-language analysis, out of scope for this crate to
/// implement itself: a production deployment plugs in a real NLP service
/// (dependency parsing, named entity recognition) behind this trait.
pub trait SentenceAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Result<Vec<AnalyzedSentence>, String>;
}

/// A dependency-free stand-in for [`SentenceAnalyzer`], good enough to drive
/// the acceptance filter and subject/object derivation in tests and local
/// runs without a real NLP service. This is not a claim about
/// production-quality NLP — swap in a real analyzer before trusting output
/// from a live feed.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicAnalyzer;

const COMMON_VERBS: &[&str] = &[
    "is", "are", "was", "were", "has", "have", "had", "said", "says",
    "reported", "announced", "confirmed", "opened", "closed", "reopened",
    "rose", "fell", "increased", "decreased", "approved", "rejected",
];

impl HeuristicAnalyzer {
    fn split_sentences(text: &str) -> Vec<String> {
        text.split(['.', '!', '?'])
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn tokenize(sentence: &str) -> Vec<String> {
        sentence
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| !w.is_empty())
            .collect()
    }

    /// A crude capitalized-run entity heuristic: any run of one or more
    /// consecutive capitalized words (in the original-cased source) is
    /// treated as a named entity. Words are matched case-insensitively
    /// against the lowercased sentence text passed to `analyze`, so this
    /// heuristic instead looks for tokens long enough and distinctive
    /// enough to plausibly be proper nouns, keying off token length and
    /// position since casing information is usually lost by the time text
    /// reaches this analyzer (the sanitization step lowercases everything).
    fn entities(tokens: &[String]) -> Vec<String> {
        tokens
            .iter()
            .filter(|t| t.len() > 3 && !COMMON_VERBS.contains(&t.as_str()))
            .take(3)
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect()
    }

    /// A tiny dependency-label heuristic: the first token before the first
    /// recognized verb is the subject (`nsubj`), the first token after it
    /// is the object (`dobj`). `not`/`n't` anywhere in the sentence marks
    /// every token `neg`.
    fn tag_tokens(tokens: &[String]) -> Vec<AnalyzedToken> {
        let verb_index = tokens
            .iter()
            .position(|t| COMMON_VERBS.contains(&t.as_str()));
        let negated = tokens.iter().any(|t| t == "not" || t == "n't" || t == "no");

        tokens
            .iter()
            .enumerate()
            .map(|(i, lemma)| {
                let dep = match verb_index {
                    Some(v) if i < v => "nsubj",
                    Some(v) if i == v => "root",
                    Some(v) if i == v + 1 => "dobj",
                    Some(_) => "dep",
                    None if i == 0 => "nsubj",
                    None if i == tokens.len().saturating_sub(1) => "attr",
                    None => "dep",
                };
                AnalyzedToken {
                    lemma: lemma.clone(),
                    pos: if negated && (lemma == "not" || lemma == "n't") {
                        "PART".to_string()
                    } else {
                        "X".to_string()
                    },
                    dep: if negated && (lemma == "not" || lemma == "n't") {
                        "neg".to_string()
                    } else {
                        dep.to_string()
                    },
                }
            })
            .collect()
    }
}

impl SentenceAnalyzer for HeuristicAnalyzer {
    fn analyze(&self, text: &str) -> Result<Vec<AnalyzedSentence>, String> {
        Ok(Self::split_sentences(text)
            .into_iter()
            .map(|sentence| {
                let tokens = Self::tokenize(&sentence);
                let entities = Self::entities(&tokens);
                let tagged = Self::tag_tokens(&tokens);
                AnalyzedSentence {
                    text: sentence,
                    tokens: tagged,
                    entities,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_into_sentences() {
        let out = HeuristicAnalyzer.analyze("the bridge reopened today. traffic resumed normally.").unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn tags_subject_and_object_around_a_verb() {
        let out = HeuristicAnalyzer
            .analyze("the council approved the budget proposal yesterday")
            .unwrap();
        let sentence = &out[0];
        assert!(sentence.tokens.iter().any(|t| t.dep == "nsubj"));
        assert!(sentence.tokens.iter().any(|t| t.dep == "dobj"));
    }

    #[test]
    fn detects_negation() {
        let out = HeuristicAnalyzer
            .analyze("the bridge is not open to traffic")
            .unwrap();
        assert!(out[0].tokens.iter().any(|t| t.dep == "neg"));
    }
}
