//! SQLite-backed [`VectorStore`].
//!
//! Every collection shares the `records` table created by
//! [`apply_schema`](crate::migrate::apply_schema). Embeddings, when enabled,
//! are stored alongside each record as a little-endian `f32` BLOB and ranked
//! by brute-force cosine similarity at query time.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::embedding::{
    blob_to_vec, cosine_similarity, create_embedder, embed_query, vec_to_blob, Embedder,
};
use crate::migrate::apply_schema;
use crate::models::{Metadata, Record, ScoredRecord};

use super::{rank_by_keywords, sort_and_truncate, Filter, VectorStore};

/// SQLite implementation of [`VectorStore`].
pub struct SqliteStore {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
}

impl SqliteStore {
    /// Connect to the configured database and make sure the schema exists.
    pub async fn open(config: &Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let pool = db::connect(config).await?;
        apply_schema(&pool).await?;
        Ok(Self { pool, embedder })
    }

    /// Open the configured database with the configured embedding provider.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        Self::open(config, embedder).await
    }

    /// Number of records in a collection.
    pub async fn count(&self, collection: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM records WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    async fn fetch_rows(&self, collection: &str) -> Result<Vec<(Record, Option<Vec<u8>>)>> {
        let rows = sqlx::query(
            "SELECT id, content, metadata_json, embedding FROM records WHERE collection = ? ORDER BY seq",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id: String = row.get("id");
                let metadata_json: String = row.get("metadata_json");
                let metadata: Metadata = serde_json::from_str(&metadata_json)
                    .with_context(|| format!("Corrupt metadata for record {}", id))?;
                let embedding: Option<Vec<u8>> = row.get("embedding");
                Ok((
                    Record {
                        id,
                        content: row.get("content"),
                        metadata,
                    },
                    embedding,
                ))
            })
            .collect()
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn add(&self, collection: &str, records: &[Record]) -> Result<()> {
        // Marker records have no text worth embedding.
        let mut vectors: Vec<Option<Vec<u8>>> = vec![None; records.len()];
        if self.embedder.is_enabled() {
            let to_embed: Vec<(usize, String)> = records
                .iter()
                .enumerate()
                .filter(|(_, r)| !r.content.trim().is_empty())
                .map(|(i, r)| (i, r.content.clone()))
                .collect();
            if !to_embed.is_empty() {
                let texts: Vec<String> = to_embed.iter().map(|(_, t)| t.clone()).collect();
                let embedded = self.embedder.embed(&texts).await?;
                for ((i, _), vec) in to_embed.iter().zip(embedded.iter()) {
                    vectors[*i] = Some(vec_to_blob(vec));
                }
            }
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        for (record, blob) in records.iter().zip(vectors.iter()) {
            sqlx::query(
                r#"
                INSERT INTO records (collection, id, content, metadata_json, embedding, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    content = excluded.content,
                    metadata_json = excluded.metadata_json,
                    embedding = excluded.embedding
                "#,
            )
            .bind(collection)
            .bind(&record.id)
            .bind(&record.content)
            .bind(serde_json::to_string(&record.metadata)?)
            .bind(blob.as_deref())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn get(&self, collection: &str, filter: &Filter) -> Result<Vec<Record>> {
        Ok(self
            .fetch_rows(collection)
            .await?
            .into_iter()
            .map(|(record, _)| record)
            .filter(|record| filter.matches(&record.metadata))
            .collect())
    }

    async fn query(&self, collection: &str, text: &str, k: usize) -> Result<Vec<ScoredRecord>> {
        let rows = self.fetch_rows(collection).await?;

        if !self.embedder.is_enabled() {
            let records = rows.into_iter().map(|(record, _)| record).collect();
            return Ok(rank_by_keywords(records, text, k));
        }

        let query_vec = embed_query(self.embedder.as_ref(), text).await?;
        let mut scored: Vec<ScoredRecord> = rows
            .into_iter()
            .filter_map(|(record, blob)| {
                blob.map(|b| ScoredRecord {
                    score: cosine_similarity(&query_vec, &blob_to_vec(&b)) as f64,
                    record,
                })
            })
            .collect();
        sort_and_truncate(&mut scored, k);
        Ok(scored)
    }
}
