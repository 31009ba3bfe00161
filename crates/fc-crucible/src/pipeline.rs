use std::sync::Arc;

use fc_hasher::Sha256Hash;
use fc_store::{Fact, Store};
use tracing::info;

use crate::analyzer::SentenceAnalyzer;
use crate::error::CrucibleError;
use crate::sanitize::{sanitize_text, scrub_metadata_noise};
use crate::semantics::{check_contradiction, check_corroboration, derive_semantics, passes_sentence_checks};

/// Tallies what happened to a batch of ingested text, so the caller (the
/// ingestion loop in `fc-node`) can log a useful summary and decide whether
/// there's anything new to seal into a block.
#[derive(Debug, Default, Clone)]
pub struct IngestOutcome {
    pub accepted: Vec<Fact>,
    pub corroborations: usize,
    pub contradictions: usize,
    pub relationships: usize,
}

/// Runs raw scraped text through sanitization, the acceptance filter,
/// semantics derivation, and contradiction/corroboration/relationship
/// detection against the existing corpus, persisting everything it accepts.
pub struct FactPipeline {
    store: Store,
    analyzer: Arc<dyn SentenceAnalyzer>,
}

impl FactPipeline {
    pub fn new(store: Store, analyzer: Arc<dyn SentenceAnalyzer>) -> Self {
        Self { store, analyzer }
    }

    /// Ingests one piece of source content, attributing every fact it
    /// accepts to `source_domain`.
    pub async fn ingest_text(
        &self,
        raw_text: &str,
        source_domain: &str,
    ) -> Result<IngestOutcome, CrucibleError> {
        let mut outcome = IngestOutcome::default();

        let sanitized = sanitize_text(raw_text);
        let sentences = self
            .analyzer
            .analyze(&sanitized)
            .map_err(CrucibleError::Analyzer)?;

        for sentence in sentences {
            let clean_text = scrub_metadata_noise(&sentence.text);
            if clean_text.is_empty() {
                continue;
            }

            let mut candidate = sentence;
            candidate.text = clean_text;

            if !passes_sentence_checks(&candidate) {
                continue;
            }

            let semantics = match derive_semantics(&candidate) {
                Some(s) => s,
                None => continue,
            };

            let hash = Sha256Hash::of(candidate.text.as_bytes()).to_hex();

            // Step 1: an exact content match is always a corroboration (or
            // a same-domain resubmission, which `corroborate_fact` already
            // treats as a no-op) — never a second Fact row for identical
            // content.
            if let Some(existing) = self.store.fact_by_hash(&hash).await? {
                self.store.corroborate_fact(existing.id, source_domain).await?;
                outcome.corroborations += 1;
                continue;
            }

            // Snapshot the corpus before this candidate is decided so every
            // comparison below is against facts that already existed, never
            // against the candidate itself.
            let existing_facts = self.store.all_facts().await?;

            // Step 2: contradiction check. A match here persists the
            // candidate (disputed status needs a fact id to attach to) and
            // stops — no corroboration or relationship detection runs for a
            // disputed candidate.
            let contradicting: Vec<&fc_store::Fact> = existing_facts
                .iter()
                .filter(|existing| !existing.disputed && check_contradiction(&existing.semantics, &semantics))
                .collect();

            if !contradicting.is_empty() {
                let fact = self
                    .store
                    .insert_fact(&candidate.text, &hash, &semantics, source_domain)
                    .await?;
                for existing in contradicting {
                    info!(existing_fact = existing.id, new_fact = fact.id, "contradiction detected");
                    self.store.mark_disputed(existing.id, fact.id).await?;
                    outcome.contradictions += 1;
                }
                outcome.accepted.push(fact);
                continue;
            }

            // Step 3: corroboration-by-prefix check, restricted to an
            // existing fact not already sourced from this domain — a
            // same-domain prefix match doesn't count as a second witness.
            let mut corroborated_with = None;
            for existing in &existing_facts {
                if !check_corroboration(&existing.content, &candidate.text) {
                    continue;
                }
                let sources = self.store.sources_for_fact(existing.id).await?;
                if !sources.iter().any(|s| s == source_domain) {
                    corroborated_with = Some(existing.id);
                    break;
                }
            }

            if let Some(existing_id) = corroborated_with {
                self.store.corroborate_fact(existing_id, source_domain).await?;
                outcome.corroborations += 1;
                continue;
            }

            // Step 4: genuinely new fact.
            let fact = self
                .store
                .insert_fact(&candidate.text, &hash, &semantics, source_domain)
                .await?;

            // Step 5: relationship detection against the rest of the corpus.
            let new_entities: std::collections::HashSet<&str> =
                semantics.entities.iter().map(String::as_str).collect();
            for existing in &existing_facts {
                let existing_entities: std::collections::HashSet<&str> =
                    existing.semantics.entities.iter().map(String::as_str).collect();
                let score = new_entities.intersection(&existing_entities).count() as i64;
                if score > 0 {
                    self.store.insert_fact_link(fact.id, existing.id, score).await?;
                    outcome.relationships += 1;
                }
            }

            outcome.accepted.push(fact);
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::HeuristicAnalyzer;

    async fn pipeline() -> FactPipeline {
        let store = Store::connect_in_memory().await.unwrap();
        FactPipeline::new(store, Arc::new(HeuristicAnalyzer))
    }

    #[tokio::test]
    async fn accepts_a_well_formed_objective_sentence() {
        let pipeline = pipeline().await;
        let outcome = pipeline
            .ingest_text(
                "The city council approved a new budget plan for the upcoming fiscal year.",
                "example.com",
            )
            .await
            .unwrap();

        assert_eq!(outcome.accepted.len(), 1);
    }

    #[tokio::test]
    async fn rejects_subjective_sentences() {
        let pipeline = pipeline().await;
        let outcome = pipeline
            .ingest_text(
                "We believe the city council approved a new budget plan this year.",
                "example.com",
            )
            .await
            .unwrap();

        assert!(outcome.accepted.is_empty());
    }

    #[tokio::test]
    async fn rejects_short_sentences() {
        let pipeline = pipeline().await;
        let outcome = pipeline.ingest_text("The council met today.", "example.com").await.unwrap();
        assert!(outcome.accepted.is_empty());
    }

    #[tokio::test]
    async fn repeated_identical_content_corroborates_instead_of_duplicating() {
        let pipeline = pipeline().await;
        let text = "The city council approved a new budget plan for the upcoming fiscal year.";

        pipeline.ingest_text(text, "first.example").await.unwrap();
        let second = pipeline.ingest_text(text, "second.example").await.unwrap();

        assert!(second.accepted.is_empty());
        assert_eq!(second.corroborations, 1);
    }

    #[tokio::test]
    async fn matching_prefix_from_a_new_domain_corroborates_without_a_second_fact_row() {
        let pipeline = pipeline().await;
        pipeline
            .ingest_text(
                "The city council approved a new budget plan for the upcoming fiscal year.",
                "first.example",
            )
            .await
            .unwrap();

        let second = pipeline
            .ingest_text(
                "The city council approved a new budget plan after a lengthy debate session.",
                "second.example",
            )
            .await
            .unwrap();

        assert!(second.accepted.is_empty());
        assert_eq!(second.corroborations, 1);
    }

    #[tokio::test]
    async fn matching_prefix_from_the_same_domain_does_not_merge() {
        let pipeline = pipeline().await;
        pipeline
            .ingest_text(
                "The city council approved a new budget plan for the upcoming fiscal year.",
                "first.example",
            )
            .await
            .unwrap();

        let second = pipeline
            .ingest_text(
                "The city council approved a new budget plan after a lengthy debate session.",
                "first.example",
            )
            .await
            .unwrap();

        assert_eq!(second.accepted.len(), 1);
        assert_eq!(second.corroborations, 0);
    }
}
