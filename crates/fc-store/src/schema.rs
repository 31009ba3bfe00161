/// Schema applied on every [`Store::connect`](crate::store::Store::connect).
/// `CREATE TABLE IF NOT EXISTS` makes this idempotent across restarts.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id     INTEGER PRIMARY KEY AUTOINCREMENT,
    domain TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS facts (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    content      TEXT NOT NULL,
    hash         TEXT NOT NULL UNIQUE,
    status       TEXT NOT NULL DEFAULT 'ingested',
    score        INTEGER NOT NULL DEFAULT 0,
    disputed     INTEGER NOT NULL DEFAULT 0,
    last_checked TEXT NOT NULL,
    semantics    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS fact_source_link (
    fact_id   INTEGER NOT NULL REFERENCES facts(id),
    source_id INTEGER NOT NULL REFERENCES sources(id),
    PRIMARY KEY (fact_id, source_id)
);

CREATE TABLE IF NOT EXISTS fact_links (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    fact1_id INTEGER NOT NULL REFERENCES facts(id),
    fact2_id INTEGER NOT NULL REFERENCES facts(id),
    score    INTEGER NOT NULL,
    UNIQUE (fact1_id, fact2_id)
);

CREATE TABLE IF NOT EXISTS blocks (
    height        INTEGER PRIMARY KEY,
    hash          TEXT NOT NULL UNIQUE,
    previous_hash TEXT NOT NULL,
    merkle_root   TEXT NOT NULL,
    fact_hashes   TEXT NOT NULL,
    timestamp     REAL NOT NULL,
    nonce         INTEGER NOT NULL
);
"#;
