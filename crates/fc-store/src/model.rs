use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A domain a fact was sourced from (e.g. `reuters.com`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub domain: String,
}

/// A fact's place in its verification lifecycle.
///
/// `EmpiricallyVerified` is never set by this crate today — it exists so
/// the on-disk and on-wire representation has room for a future external
/// verification step without a schema migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactStatus {
    Ingested,
    LogicallyConsistent,
    Corroborated,
    EmpiricallyVerified,
}

impl FactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactStatus::Ingested => "ingested",
            FactStatus::LogicallyConsistent => "logically_consistent",
            FactStatus::Corroborated => "corroborated",
            FactStatus::EmpiricallyVerified => "empirically_verified",
        }
    }
}

impl std::str::FromStr for FactStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ingested" => Ok(FactStatus::Ingested),
            "logically_consistent" => Ok(FactStatus::LogicallyConsistent),
            "corroborated" => Ok(FactStatus::Corroborated),
            "empirically_verified" => Ok(FactStatus::EmpiricallyVerified),
            other => Err(StoreError::UnknownStatus(other.to_string())),
        }
    }
}

/// The grammatical relation `fc-crucible` extracted from a sentence,
/// persisted alongside the fact so contradiction/corroboration checks don't
/// need to re-analyze already-accepted content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Semantics {
    pub subject: String,
    pub object: String,
    pub negated: bool,
    pub entities: Vec<String>,
}

/// A single accepted fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub id: i64,
    pub content: String,
    pub hash: String,
    pub status: FactStatus,
    pub score: u32,
    pub disputed: bool,
    pub last_checked: DateTime<Utc>,
    pub semantics: Semantics,
}

/// A detected relationship (corroborating or contradicting) between two
/// facts. Stored canonically with `fact1_id < fact2_id` so the pair is
/// unique regardless of discovery order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactLink {
    pub id: i64,
    pub fact1_id: i64,
    pub fact2_id: i64,
    pub score: i64,
}

impl FactLink {
    /// Orders a pair of fact ids canonically for storage and lookup.
    pub fn canonical_pair(a: i64, b: i64) -> (i64, i64) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }
}
