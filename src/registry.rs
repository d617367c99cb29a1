//! Fingerprint registry: the set of documents already ingested.
//!
//! Persisted as marker records in the
//! [`FINGERPRINTS_COLLECTION`](crate::store::FINGERPRINTS_COLLECTION): one
//! record per document with empty content and the fingerprint under the
//! `hash` metadata key. The registry is loaded in full once per ingestion
//! batch and appended to as documents are added; entries are never removed.
//!
//! Access is single-writer. Two processes ingesting into the same store at
//! the same time can both miss a fingerprint and store a document twice.

use std::collections::HashSet;

use anyhow::{Context, Result};
use serde_json::json;

use crate::models::{Fingerprint, Metadata, Record};
use crate::store::{Filter, VectorStore, FINGERPRINTS_COLLECTION};

/// Metadata key holding the fingerprint on a marker record.
pub const HASH_KEY: &str = "hash";

/// In-memory view of the persisted fingerprint set.
#[derive(Debug, Default)]
pub struct FingerprintRegistry {
    known: HashSet<String>,
}

impl FingerprintRegistry {
    /// Read every marker record from the store.
    ///
    /// A store error is returned, never treated as an empty registry:
    /// continuing with an empty set would re-ingest every document.
    pub async fn load<S: VectorStore + ?Sized>(store: &S) -> Result<Self> {
        let markers = store
            .get(FINGERPRINTS_COLLECTION, &Filter::all())
            .await
            .context("Failed to load fingerprint registry")?;

        let known = markers
            .iter()
            .filter_map(|r| r.metadata.get(HASH_KEY).and_then(|v| v.as_str()))
            .map(str::to_string)
            .collect();

        Ok(Self { known })
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.known.contains(fingerprint.as_str())
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Persist a marker for `fingerprint` and add it to this view.
    pub async fn record<S: VectorStore + ?Sized>(
        &mut self,
        store: &S,
        fingerprint: &Fingerprint,
        document: &str,
    ) -> Result<()> {
        let mut metadata = Metadata::new();
        metadata.insert(HASH_KEY.into(), json!(fingerprint.as_str()));
        metadata.insert("source".into(), json!(document));
        metadata.insert(
            "ingested_at".into(),
            json!(chrono::Utc::now().to_rfc3339()),
        );

        let marker = Record {
            id: fingerprint.to_string(),
            content: String::new(),
            metadata,
        };
        store.add(FINGERPRINTS_COLLECTION, &[marker]).await?;
        self.known.insert(fingerprint.to_string());
        Ok(())
    }
}
