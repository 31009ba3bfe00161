/// Substrings whose presence anywhere in a lowercased sentence marks it as
/// subjective rather than a candidate fact. Reproduced verbatim from the
/// corpus this pipeline's acceptance filter is drawn from.
pub const SUBJECTIVITY_INDICATORS: &[&str] = &[
    "believe",
    "think",
    "feel",
    "seems",
    "appears",
    "argues",
    "suggests",
    "contends",
    "opines",
    "speculates",
    "especially",
    "notably",
    "remarkably",
    "surprisingly",
    "unfortunately",
    "clearly",
    "obviously",
    "reportedly",
    "allegedly",
    "routinely",
    "likely",
    "apparently",
    "essentially",
    "largely",
    "wedded to",
    "new heights",
    "war on facts",
    "playbook",
    "art of",
    "therefore",
    "consequently",
    "thus",
    "hence",
    "conclusion",
    "untrue",
    "false",
    "incorrect",
    "correctly",
    "rightly",
    "wrongly",
    "inappropriate",
    "disparage",
    "sycophants",
    "unwelcome",
    "flatly",
];

/// Minimum/maximum token count a sentence must have to be considered.
pub const MIN_SENTENCE_TOKENS: usize = 8;
pub const MAX_SENTENCE_TOKENS: usize = 100;
