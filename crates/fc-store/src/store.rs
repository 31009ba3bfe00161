use chrono::Utc;
use fc_chain::Block;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::error::StoreError;
use crate::model::{Fact, FactLink, FactStatus, Semantics, Source};
use crate::schema::SCHEMA;

/// A handle to the node's single SQLite database.
///
/// Every mutating operation runs inside its own [`sqlx::Transaction`] and
/// commits atomically before returning, per the ingestion pipeline's
/// single-writer policy: `fc-crucible` and `fc-sync` are the only callers
/// that mutate state, and they always go through one of these methods
/// rather than holding a connection open across `.await` points of their
/// own.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Connects to `url` (e.g. `sqlite://factchain.db?mode=rwc`) and applies
    /// the schema, creating tables that don't already exist.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new().max_connections(5).connect(url).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// An ephemeral in-memory database, used by tests and by listener nodes
    /// that only ever hold headers.
    pub async fn connect_in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:").await
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    // ---- mutations -----------------------------------------------------

    /// Inserts `domain` if it isn't already known, returning its id either
    /// way.
    pub async fn insert_source(&self, domain: &str) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let id = Self::insert_source_tx(&mut tx, domain).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn insert_source_tx(
        tx: &mut Transaction<'_, Sqlite>,
        domain: &str,
    ) -> Result<i64, StoreError> {
        sqlx::query("INSERT OR IGNORE INTO sources (domain) VALUES (?)")
            .bind(domain)
            .execute(&mut **tx)
            .await?;

        let row = sqlx::query("SELECT id FROM sources WHERE domain = ?")
            .bind(domain)
            .fetch_one(&mut **tx)
            .await?;
        Ok(row.try_get("id")?)
    }

    /// Persists a brand-new fact with its first corroborating source.
    /// `fc-crucible` calls this only after confirming no existing fact
    /// shares `hash`.
    pub async fn insert_fact(
        &self,
        content: &str,
        hash: &str,
        semantics: &Semantics,
        source_domain: &str,
    ) -> Result<Fact, StoreError> {
        let mut tx = self.pool.begin().await?;
        let source_id = Self::insert_source_tx(&mut tx, source_domain).await?;

        let now = Utc::now();
        let semantics_json = serde_json::to_string(semantics)?;

        let result = sqlx::query(
            "INSERT INTO facts (content, hash, status, score, disputed, last_checked, semantics)
             VALUES (?, ?, ?, 0, 0, ?, ?)",
        )
        .bind(content)
        .bind(hash)
        .bind(FactStatus::Ingested.as_str())
        .bind(now.to_rfc3339())
        .bind(&semantics_json)
        .execute(&mut *tx)
        .await?;

        let fact_id = result.last_insert_rowid();

        sqlx::query("INSERT OR IGNORE INTO fact_source_link (fact_id, source_id) VALUES (?, ?)")
            .bind(fact_id)
            .bind(source_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Fact {
            id: fact_id,
            content: content.to_string(),
            hash: hash.to_string(),
            status: FactStatus::Ingested,
            score: 0,
            disputed: false,
            last_checked: now,
            semantics: semantics.clone(),
        })
    }

    /// Records an additional corroborating source for an existing fact,
    /// bumping `score` and promoting `status` to `Corroborated` if the fact
    /// isn't disputed.
    pub async fn corroborate_fact(
        &self,
        fact_id: i64,
        source_domain: &str,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let source_id = Self::insert_source_tx(&mut tx, source_domain).await?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO fact_source_link (fact_id, source_id) VALUES (?, ?)",
        )
        .bind(fact_id)
        .bind(source_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted > 0 {
            let row = sqlx::query("SELECT disputed FROM facts WHERE id = ?")
                .bind(fact_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(StoreError::FactNotFound(fact_id))?;
            let disputed: i64 = row.try_get("disputed")?;

            let next_status = if disputed == 0 {
                FactStatus::Corroborated.as_str()
            } else {
                FactStatus::Ingested.as_str()
            };

            sqlx::query(
                "UPDATE facts
                 SET score = score + 1, last_checked = ?, status = ?
                 WHERE id = ?",
            )
            .bind(Utc::now().to_rfc3339())
            .bind(next_status)
            .bind(fact_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Flags two contradictory facts as disputed and records the negative
    /// relationship between them. The fixed score of `-1` mirrors a
    /// contradiction being a single binary signal, unlike corroboration
    /// strength which accumulates with each new source.
    pub async fn mark_disputed(&self, fact_a: i64, fact_b: i64) -> Result<(), StoreError> {
        let (fact1_id, fact2_id) = FactLink::canonical_pair(fact_a, fact_b);
        let mut tx = self.pool.begin().await?;

        for fact_id in [fact1_id, fact2_id] {
            sqlx::query("UPDATE facts SET disputed = 1, status = ?, last_checked = ? WHERE id = ?")
                .bind(FactStatus::Ingested.as_str())
                .bind(Utc::now().to_rfc3339())
                .bind(fact_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            "INSERT INTO fact_links (fact1_id, fact2_id, score) VALUES (?, ?, -1)
             ON CONFLICT (fact1_id, fact2_id) DO UPDATE SET score = -1",
        )
        .bind(fact1_id)
        .bind(fact2_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Records a non-contradiction relationship between two facts (e.g.
    /// shared entities), with `score` equal to the strength of the overlap
    /// `fc-crucible` detected.
    pub async fn insert_fact_link(
        &self,
        fact_a: i64,
        fact_b: i64,
        score: i64,
    ) -> Result<(), StoreError> {
        let (fact1_id, fact2_id) = FactLink::canonical_pair(fact_a, fact_b);
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO fact_links (fact1_id, fact2_id, score) VALUES (?, ?, ?)
             ON CONFLICT (fact1_id, fact2_id) DO UPDATE SET score = excluded.score",
        )
        .bind(fact1_id)
        .bind(fact2_id)
        .bind(score)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Appends a sealed block. Callers are responsible for validating the
    /// block against the in-memory chain tip before calling this; the store
    /// itself only enforces the `height`/`hash` uniqueness constraints.
    pub async fn append_block(&self, block: &Block) -> Result<(), StoreError> {
        let fact_hashes_json = serde_json::to_string(&block.fact_hashes)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO blocks
                (height, hash, previous_hash, merkle_root, fact_hashes, timestamp, nonce)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(block.height as i64)
        .bind(&block.hash)
        .bind(&block.previous_hash)
        .bind(&block.merkle_root)
        .bind(&fact_hashes_json)
        .bind(block.timestamp)
        .bind(block.nonce as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Persists a fact exactly as reported by a peer during sync: content,
    /// hash, score, disputed flag, last-checked timestamp, semantics, and
    /// every declared source domain. Callers (`fc-sync`) are responsible
    /// for verifying `hash == sha256(content)` before calling this — the
    /// store trusts the hash it's given here.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_synced_fact(
        &self,
        content: &str,
        hash: &str,
        score: u32,
        disputed: bool,
        last_checked: chrono::DateTime<Utc>,
        semantics: &Semantics,
        sources: &[String],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let semantics_json = serde_json::to_string(semantics)?;
        let status = if disputed {
            FactStatus::Ingested.as_str()
        } else if score > 0 {
            FactStatus::Corroborated.as_str()
        } else {
            FactStatus::Ingested.as_str()
        };

        sqlx::query(
            "INSERT INTO facts (content, hash, status, score, disputed, last_checked, semantics)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (hash) DO UPDATE SET
                 score = excluded.score,
                 disputed = excluded.disputed,
                 last_checked = excluded.last_checked,
                 status = excluded.status",
        )
        .bind(content)
        .bind(hash)
        .bind(status)
        .bind(score as i64)
        .bind(disputed as i64)
        .bind(last_checked.to_rfc3339())
        .bind(&semantics_json)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query("SELECT id FROM facts WHERE hash = ?")
            .bind(hash)
            .fetch_one(&mut *tx)
            .await?;
        let fact_id: i64 = row.try_get("id")?;

        for domain in sources {
            let source_id = Self::insert_source_tx(&mut tx, domain).await?;
            sqlx::query("INSERT OR IGNORE INTO fact_source_link (fact_id, source_id) VALUES (?, ?)")
                .bind(fact_id)
                .bind(source_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // ---- reads -----------------------------------------------------------

    /// Looks up a fact by its content hash (hex-encoded SHA-256).
    pub async fn fact_by_hash(&self, hash: &str) -> Result<Option<Fact>, StoreError> {
        let row = sqlx::query("SELECT * FROM facts WHERE hash = ?")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::fact_from_row).transpose()
    }

    /// Looks up a fact by its primary key.
    pub async fn fact_by_id(&self, id: i64) -> Result<Option<Fact>, StoreError> {
        let row = sqlx::query("SELECT * FROM facts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::fact_from_row).transpose()
    }

    /// Every fact currently in the corpus. `fc-crucible` loads this once per
    /// ingested sentence to check it against the existing corpus for
    /// contradiction, corroboration, and shared-entity relationships.
    pub async fn all_facts(&self) -> Result<Vec<Fact>, StoreError> {
        let rows = sqlx::query("SELECT * FROM facts").fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::fact_from_row).collect()
    }

    /// The domains currently recorded as sources of `fact_id`, used by the
    /// corroboration check to tell whether a candidate's source domain is
    /// already on record for the fact it would merge into.
    pub async fn sources_for_fact(&self, fact_id: i64) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            "SELECT s.domain as domain
             FROM sources s
             JOIN fact_source_link l ON l.source_id = s.id
             WHERE l.fact_id = ?",
        )
        .bind(fact_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| Ok(r.try_get("domain")?)).collect()
    }

    fn fact_from_row(row: SqliteRow) -> Result<Fact, StoreError> {
        let status_str: String = row.try_get("status")?;
        let semantics_str: String = row.try_get("semantics")?;
        let disputed: i64 = row.try_get("disputed")?;
        let last_checked_str: String = row.try_get("last_checked")?;
        let score: i64 = row.try_get("score")?;

        Ok(Fact {
            id: row.try_get("id")?,
            content: row.try_get("content")?,
            hash: row.try_get("hash")?,
            status: status_str.parse()?,
            score: score.max(0) as u32,
            disputed: disputed != 0,
            last_checked: chrono::DateTime::parse_from_rfc3339(&last_checked_str)
                .map_err(|e| StoreError::InvalidTimestamp(e.to_string()))?
                .with_timezone(&Utc),
            semantics: serde_json::from_str(&semantics_str)?,
        })
    }

    /// The current chain height held in the database, or `None` if no
    /// blocks have been sealed yet (before genesis is persisted).
    pub async fn tip_height(&self) -> Result<Option<u64>, StoreError> {
        let row = sqlx::query("SELECT MAX(height) as h FROM blocks")
            .fetch_one(&self.pool)
            .await?;
        let h: Option<i64> = row.try_get("h")?;
        Ok(h.map(|v| v as u64))
    }

    /// All blocks with `height >= since`, ordered by height.
    pub async fn blocks_since(&self, since: u64) -> Result<Vec<Block>, StoreError> {
        let rows = sqlx::query("SELECT * FROM blocks WHERE height >= ? ORDER BY height ASC")
            .bind(since as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::block_from_row).collect()
    }

    /// The fact hashes committed by the block at `height`, used by the
    /// Verification API's `/merkle_proof` endpoint.
    pub async fn block_at(&self, height: u64) -> Result<Option<Block>, StoreError> {
        let row = sqlx::query("SELECT * FROM blocks WHERE height = ?")
            .bind(height as i64)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::block_from_row).transpose()
    }

    fn block_from_row(row: SqliteRow) -> Result<Block, StoreError> {
        let fact_hashes_str: String = row.try_get("fact_hashes")?;
        let height: i64 = row.try_get("height")?;
        let nonce: i64 = row.try_get("nonce")?;

        Ok(Block {
            height: height as u64,
            previous_hash: row.try_get("previous_hash")?,
            timestamp: row.try_get("timestamp")?,
            nonce: nonce as u64,
            fact_hashes: serde_json::from_str(&fact_hashes_str)?,
            merkle_root: row.try_get("merkle_root")?,
            hash: row.try_get("hash")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_fetch_fact_round_trips() {
        let store = Store::connect_in_memory().await.unwrap();
        let semantics = Semantics {
            subject: "water".into(),
            object: "liquid".into(),
            negated: false,
            entities: vec!["water".into()],
        };

        let fact = store
            .insert_fact("water is a liquid", "hash-a", &semantics, "example.com")
            .await
            .unwrap();

        let fetched = store.fact_by_hash("hash-a").await.unwrap().unwrap();
        assert_eq!(fetched.id, fact.id);
        assert_eq!(fetched.score, 0);
        assert_eq!(fetched.status, FactStatus::Ingested);
    }

    #[tokio::test]
    async fn corroborate_fact_bumps_score_and_promotes_status() {
        let store = Store::connect_in_memory().await.unwrap();
        let semantics = Semantics::default();
        let fact = store
            .insert_fact("the sky is blue", "hash-b", &semantics, "a.com")
            .await
            .unwrap();

        store.corroborate_fact(fact.id, "b.com").await.unwrap();

        let fetched = store.fact_by_hash("hash-b").await.unwrap().unwrap();
        assert_eq!(fetched.score, 1);
        assert_eq!(fetched.status, FactStatus::Corroborated);
    }

    #[tokio::test]
    async fn mark_disputed_flags_both_facts_and_links_them() {
        let store = Store::connect_in_memory().await.unwrap();
        let semantics = Semantics::default();
        let a = store
            .insert_fact("the bridge is open", "hash-c", &semantics, "a.com")
            .await
            .unwrap();
        let b = store
            .insert_fact("the bridge is not open", "hash-d", &semantics, "b.com")
            .await
            .unwrap();

        store.mark_disputed(a.id, b.id).await.unwrap();

        assert!(store.fact_by_id(a.id).await.unwrap().unwrap().disputed);
        assert!(store.fact_by_id(b.id).await.unwrap().unwrap().disputed);
    }

    #[tokio::test]
    async fn append_and_read_back_blocks() {
        let store = Store::connect_in_memory().await.unwrap();
        let genesis = Block::genesis();
        store.append_block(&genesis).await.unwrap();

        assert_eq!(store.tip_height().await.unwrap(), Some(0));
        let blocks = store.blocks_since(0).await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].hash, genesis.hash);
    }

    #[tokio::test]
    async fn upsert_synced_fact_persists_reported_sources_and_score() {
        let store = Store::connect_in_memory().await.unwrap();
        let semantics = Semantics::default();

        store
            .upsert_synced_fact(
                "the harbor bridge reopened",
                "synced-hash",
                2,
                false,
                Utc::now(),
                &semantics,
                &["a.example".to_string(), "b.example".to_string()],
            )
            .await
            .unwrap();

        let fact = store.fact_by_hash("synced-hash").await.unwrap().unwrap();
        assert_eq!(fact.score, 2);
        assert_eq!(fact.status, FactStatus::Corroborated);

        let sources = store.sources_for_fact(fact.id).await.unwrap();
        assert_eq!(sources.len(), 2);
    }

    #[tokio::test]
    async fn upsert_synced_fact_is_idempotent_on_hash() {
        let store = Store::connect_in_memory().await.unwrap();
        let semantics = Semantics::default();

        for _ in 0..2 {
            store
                .upsert_synced_fact(
                    "the harbor bridge reopened",
                    "synced-hash-2",
                    1,
                    false,
                    Utc::now(),
                    &semantics,
                    &["a.example".to_string()],
                )
                .await
                .unwrap();
        }

        let rows = sqlx::query("SELECT COUNT(*) as c FROM facts WHERE hash = ?")
            .bind("synced-hash-2")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        let count: i64 = rows.try_get("c").unwrap();
        assert_eq!(count, 1);
    }
}
