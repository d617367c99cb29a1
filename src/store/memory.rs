//! In-memory [`VectorStore`] for tests.
//!
//! Records live in a `Vec` per collection behind `std::sync::RwLock`.
//! Vector ranking is brute-force cosine similarity over all stored vectors.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::{cosine_similarity, embed_query, DisabledEmbedder, Embedder};
use crate::models::{Record, ScoredRecord};

use super::{rank_by_keywords, sort_and_truncate, Filter, VectorStore};

struct StoredRecord {
    record: Record,
    vector: Option<Vec<f32>>,
}

/// Process-local store. Contents are lost when it is dropped.
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<StoredRecord>>>,
    embedder: Arc<dyn Embedder>,
}

impl InMemoryStore {
    /// A store that ranks queries by keyword overlap.
    pub fn new() -> Self {
        Self::with_embedder(Arc::new(DisabledEmbedder))
    }

    /// A store that embeds record content on `add` and ranks by cosine
    /// similarity when `embedder` is enabled.
    pub fn with_embedder(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            embedder,
        }
    }

    /// Number of records in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn add(&self, collection: &str, records: &[Record]) -> Result<()> {
        // Embed before taking the lock; the guard is not held across await.
        let vectors: Vec<Option<Vec<f32>>> = if self.embedder.is_enabled() && !records.is_empty() {
            let texts: Vec<String> = records.iter().map(|r| r.content.clone()).collect();
            self.embedder.embed(&texts).await?.into_iter().map(Some).collect()
        } else {
            vec![None; records.len()]
        };

        let mut collections = self.collections.write().map_err(poisoned)?;
        let stored = collections.entry(collection.to_string()).or_default();
        for (record, vector) in records.iter().zip(vectors) {
            stored.retain(|s| s.record.id != record.id);
            stored.push(StoredRecord {
                record: record.clone(),
                vector,
            });
        }
        Ok(())
    }

    async fn get(&self, collection: &str, filter: &Filter) -> Result<Vec<Record>> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections
            .get(collection)
            .map(|stored| {
                stored
                    .iter()
                    .filter(|s| filter.matches(&s.record.metadata))
                    .map(|s| s.record.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn query(&self, collection: &str, text: &str, k: usize) -> Result<Vec<ScoredRecord>> {
        if !self.embedder.is_enabled() {
            let records = self.get(collection, &Filter::all()).await?;
            return Ok(rank_by_keywords(records, text, k));
        }

        let query_vec = embed_query(self.embedder.as_ref(), text).await?;
        let collections = self.collections.read().map_err(poisoned)?;
        let mut scored: Vec<ScoredRecord> = collections
            .get(collection)
            .map(|stored| {
                stored
                    .iter()
                    .filter_map(|s| {
                        s.vector.as_ref().map(|v| ScoredRecord {
                            record: s.record.clone(),
                            score: cosine_similarity(&query_vec, v) as f64,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        sort_and_truncate(&mut scored, k);
        Ok(scored)
    }
}
