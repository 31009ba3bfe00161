pub mod analyzer;
pub mod constants;
pub mod error;
pub mod pipeline;
pub mod sanitize;
pub mod semantics;

pub use analyzer::{AnalyzedSentence, AnalyzedToken, HeuristicAnalyzer, SentenceAnalyzer};
pub use error::CrucibleError;
pub use pipeline::{FactPipeline, IngestOutcome};
pub use sanitize::{sanitize_text, scrub_metadata_noise};
pub use semantics::{check_contradiction, check_corroboration, derive_semantics, passes_sentence_checks};
