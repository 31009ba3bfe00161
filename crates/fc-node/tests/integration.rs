/// End-to-end scenario tests wiring fc-hasher, fc-chain, fc-store,
/// fc-crucible, and fc-sync together the way `fc_node::Node` does in its
/// ingestion and sync loops, without needing a live TLS transport or HTTP
/// server.
use std::sync::Arc;

use fc_chain::{Block, Blockchain, SEAL_DIFFICULTY};
use fc_crucible::{FactPipeline, HeuristicAnalyzer};
use fc_hasher::{merkle_proof, verify_proof, Sha256Hash};
use fc_store::{FactStatus, Store};
use fc_sync::reconcile_with_peer;

fn fact_hash(content: &str) -> String {
    Sha256Hash::of(content.as_bytes()).to_hex()
}

#[tokio::test]
async fn genesis_block_is_valid_and_persists_at_height_zero() {
    let genesis = Block::genesis();
    assert_eq!(genesis.height, 0);
    assert!(genesis.fact_hashes.is_empty());
    assert!(genesis.is_properly_sealed());

    let store = Store::connect_in_memory().await.unwrap();
    store.append_block(&genesis).await.unwrap();

    assert_eq!(store.tip_height().await.unwrap(), Some(0));
    assert_eq!(store.block_at(0).await.unwrap().unwrap().hash, genesis.hash);
}

#[tokio::test]
async fn extracting_a_fact_and_sealing_it_advances_the_chain() {
    let store = Store::connect_in_memory().await.unwrap();
    let pipeline = FactPipeline::new(store.clone(), Arc::new(HeuristicAnalyzer));

    let outcome = pipeline
        .ingest_text(
            "The city council approved a new budget plan for the upcoming fiscal year.",
            "example.com",
        )
        .await
        .unwrap();
    assert_eq!(outcome.accepted.len(), 1);

    let hashes: Vec<String> = outcome.accepted.iter().map(|f| f.hash.clone()).collect();

    let mut chain = Blockchain::new();
    let mut block = chain.build_next(hashes.clone()).unwrap();
    block.seal(SEAL_DIFFICULTY);
    chain.append(block.clone()).unwrap();
    store.append_block(&block).await.unwrap();

    assert_eq!(chain.height(), 1);
    assert!(block.is_properly_sealed());
    assert_eq!(block.fact_hashes, hashes);
    assert_eq!(store.block_at(1).await.unwrap().unwrap().hash, block.hash);
}

#[tokio::test]
async fn a_second_source_corroborates_instead_of_duplicating_the_fact() {
    let store = Store::connect_in_memory().await.unwrap();
    let pipeline = FactPipeline::new(store.clone(), Arc::new(HeuristicAnalyzer));
    let text = "The city council approved a new budget plan for the upcoming fiscal year.";

    let first = pipeline.ingest_text(text, "first.example").await.unwrap();
    let hash = first.accepted[0].hash.clone();

    let second = pipeline.ingest_text(text, "second.example").await.unwrap();
    assert!(second.accepted.is_empty());
    assert_eq!(second.corroborations, 1);

    let fact = store.fact_by_hash(&hash).await.unwrap().unwrap();
    assert_eq!(fact.score, 1);
    assert_eq!(fact.status, FactStatus::Corroborated);
    assert!(!fact.disputed);

    let sources = store.sources_for_fact(fact.id).await.unwrap();
    assert_eq!(sources.len(), 2);
}

#[tokio::test]
async fn a_conflicting_claim_disputes_both_facts() {
    let store = Store::connect_in_memory().await.unwrap();
    let pipeline = FactPipeline::new(store.clone(), Arc::new(HeuristicAnalyzer));

    let first = pipeline
        .ingest_text(
            "The harbor bridge reopened successfully to traffic this week after repairs.",
            "first.example",
        )
        .await
        .unwrap();
    assert_eq!(first.accepted.len(), 1);
    let first_hash = first.accepted[0].hash.clone();

    let second = pipeline
        .ingest_text(
            "The harbor bridge remains closed to traffic this week after repairs.",
            "second.example",
        )
        .await
        .unwrap();
    assert_eq!(second.accepted.len(), 1);
    assert_eq!(second.contradictions, 1);
    let second_hash = second.accepted[0].hash.clone();

    let first_fact = store.fact_by_hash(&first_hash).await.unwrap().unwrap();
    let second_fact = store.fact_by_hash(&second_hash).await.unwrap().unwrap();
    assert!(first_fact.disputed);
    assert!(second_fact.disputed);
}

#[test]
fn merkle_proof_confirms_inclusion_of_a_fact_in_a_sealed_block() {
    let hashes = vec![fact_hash("fact one"), fact_hash("fact two"), fact_hash("fact three")];

    let mut chain = Blockchain::new();
    let mut block = chain.build_next(hashes.clone()).unwrap();
    block.seal(SEAL_DIFFICULTY);

    let target_index = 1;
    let leaves: Vec<Sha256Hash> = block.fact_hashes.iter().map(|h| h.parse().unwrap()).collect();
    let proof = merkle_proof(&leaves, target_index).unwrap();
    let root: Sha256Hash = block.merkle_root.parse().unwrap();

    assert_eq!(proof.leaf_hash, leaves[target_index]);
    assert!(verify_proof(&leaves[target_index], &proof, &root));
    assert!(proof.verify(&root));

    // A proof built against the wrong leaf must not verify.
    assert!(!verify_proof(&leaves[0], &proof, &root));
}

#[tokio::test]
async fn syncing_a_taller_peer_applies_its_block_and_reports_the_missing_fact() {
    let local_store = Store::connect_in_memory().await.unwrap();
    let mut local_chain = Blockchain::new();
    local_store.append_block(local_chain.tip()).await.unwrap();

    let remote_store = Store::connect_in_memory().await.unwrap();
    let remote_pipeline = FactPipeline::new(remote_store.clone(), Arc::new(HeuristicAnalyzer));
    let outcome = remote_pipeline
        .ingest_text(
            "The harbor bridge reopened successfully to traffic this week after repairs.",
            "remote.example",
        )
        .await
        .unwrap();
    let accepted_hash = outcome.accepted[0].hash.clone();

    let mut remote_chain = Blockchain::new();
    let mut remote_block = remote_chain.build_next(vec![accepted_hash.clone()]).unwrap();
    remote_block.seal(SEAL_DIFFICULTY);
    remote_chain.append(remote_block.clone()).unwrap();

    let result = reconcile_with_peer(&local_store, &mut local_chain, "remote-peer", 1, vec![remote_block])
        .await
        .unwrap();

    assert_eq!(result.outcome_new_block_count, 1);
    assert_eq!(result.missing_fact_hashes, vec![accepted_hash.clone()]);
    assert_eq!(local_chain.height(), 1);
    assert!(local_store.fact_by_hash(&accepted_hash).await.unwrap().is_none());

    // The sync loop's second step: fetch and verify the missing fact body
    // from the peer, then persist it.
    let remote_fact = remote_store.fact_by_hash(&accepted_hash).await.unwrap().unwrap();
    let remote_sources = remote_store.sources_for_fact(remote_fact.id).await.unwrap();
    assert_eq!(fact_hash(&remote_fact.content), remote_fact.hash);

    local_store
        .upsert_synced_fact(
            &remote_fact.content,
            &remote_fact.hash,
            remote_fact.score,
            remote_fact.disputed,
            remote_fact.last_checked,
            &remote_fact.semantics,
            &remote_sources,
        )
        .await
        .unwrap();

    let synced = local_store.fact_by_hash(&accepted_hash).await.unwrap().unwrap();
    assert_eq!(synced.content, remote_fact.content);
    assert_eq!(local_store.sources_for_fact(synced.id).await.unwrap(), remote_sources);
}
