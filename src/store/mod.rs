//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the boundary between the ingestion and chat
//! pipelines and whatever holds the records. Two collections are used:
//!
//! | Collection | Contents |
//! |------------|----------|
//! | [`CHUNKS_COLLECTION`] | one record per text chunk, tagged with its source document |
//! | [`FINGERPRINTS_COLLECTION`] | one empty-content marker per ingested document |
//!
//! Backends:
//! - [`sqlite::SqliteStore`]: persistent, used by the CLI.
//! - [`memory::InMemoryStore`]: process-local, used in tests.
//!
//! Both rank [`query`](VectorStore::query) results by cosine similarity
//! when an [`Embedder`](crate::embedding::Embedder) is enabled, and by
//! keyword term overlap otherwise.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::models::{Metadata, Record, ScoredRecord};

/// Collection holding document text chunks.
pub const CHUNKS_COLLECTION: &str = "pdfs";
/// Collection holding fingerprint registry markers.
pub const FINGERPRINTS_COLLECTION: &str = "pdf_hashes";

/// Storage backend for record collections.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert records into a collection. A record whose id already exists
    /// in that collection is replaced.
    async fn add(&self, collection: &str, records: &[Record]) -> Result<()>;

    /// Return every record in the collection matching `filter`, in
    /// insertion order.
    async fn get(&self, collection: &str, filter: &Filter) -> Result<Vec<Record>>;

    /// Return up to `k` records ranked by relevance to `text`, best first.
    async fn query(&self, collection: &str, text: &str, k: usize) -> Result<Vec<ScoredRecord>>;
}

/// Metadata equality filter for [`VectorStore::get`].
///
/// All conditions must hold. An empty filter matches every record.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Match every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match records whose metadata `key` equals `value`.
    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(key, value)
    }

    pub fn and(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((key.into(), value.into()));
        self
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.conditions
            .iter()
            .all(|(key, value)| metadata.get(key) == Some(value))
    }
}

/// Lowercased alphanumeric terms of a query, at least two characters long.
pub(crate) fn query_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(|t| t.to_lowercase())
        .collect();
    terms.sort();
    terms.dedup();
    terms
}

/// Number of distinct query terms that occur in `content`.
pub(crate) fn keyword_score(terms: &[String], content: &str) -> f64 {
    let lower = content.to_lowercase();
    terms.iter().filter(|t| lower.contains(t.as_str())).count() as f64
}

/// Keyword ranking: records with at least one matching term, best first.
/// Ties keep insertion order.
pub(crate) fn rank_by_keywords(records: Vec<Record>, text: &str, k: usize) -> Vec<ScoredRecord> {
    let terms = query_terms(text);
    if terms.is_empty() {
        return Vec::new();
    }
    let mut scored: Vec<ScoredRecord> = records
        .into_iter()
        .filter_map(|record| {
            let score = keyword_score(&terms, &record.content);
            (score > 0.0).then_some(ScoredRecord { record, score })
        })
        .collect();
    sort_and_truncate(&mut scored, k);
    scored
}

/// Sort by descending score (stable) and keep the best `k`.
pub(crate) fn sort_and_truncate(scored: &mut Vec<ScoredRecord>, k: usize) {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(k);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, content: &str) -> Record {
        Record {
            id: id.to_string(),
            content: content.to_string(),
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn test_filter_matches() {
        let mut meta = Metadata::new();
        meta.insert("hash".into(), json!("abc"));
        meta.insert("source".into(), json!("a.pdf"));

        assert!(Filter::all().matches(&meta));
        assert!(Filter::eq("hash", "abc").matches(&meta));
        assert!(Filter::eq("hash", "abc").and("source", "a.pdf").matches(&meta));
        assert!(!Filter::eq("hash", "abc").and("source", "b.pdf").matches(&meta));
        assert!(!Filter::eq("missing", "x").matches(&meta));
    }

    #[test]
    fn test_query_terms() {
        assert_eq!(
            query_terms("What is the Rust borrow-checker? a"),
            vec!["borrow", "checker", "is", "rust", "the", "what"]
        );
        assert!(query_terms("? !").is_empty());
    }

    #[test]
    fn test_rank_by_keywords() {
        let records = vec![
            record("1", "Cats sleep a lot."),
            record("2", "Rust ownership and borrowing rules."),
            record("3", "Rust is a systems language."),
        ];
        let ranked = rank_by_keywords(records, "rust ownership", 5);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].record.id, "2");
        assert_eq!(ranked[0].score, 2.0);
        assert_eq!(ranked[1].record.id, "3");
    }

    #[test]
    fn test_rank_by_keywords_truncates() {
        let records = vec![record("1", "rust"), record("2", "rust"), record("3", "rust")];
        let ranked = rank_by_keywords(records, "rust", 1);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].record.id, "1");
    }
}
