//! `pdfchat retrieve`: show which chunks a query would pull into PDF chat.

use anyhow::Result;

use crate::config::Config;
use crate::store::sqlite::SqliteStore;
use crate::store::{VectorStore, CHUNKS_COLLECTION};

const PREVIEW_CHARS: usize = 240;

pub async fn run_retrieve(config: &Config, query: &str, k: Option<usize>) -> Result<()> {
    let k = k.unwrap_or(config.retrieval.debug_k).max(1);
    let store = SqliteStore::from_config(config).await?;
    let hits = store.query(CHUNKS_COLLECTION, query, k).await?;

    if hits.is_empty() {
        println!("No results.");
    }
    for (i, hit) in hits.iter().enumerate() {
        let source = hit
            .record
            .metadata
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        let chunk = hit
            .record
            .metadata
            .get("chunk_index")
            .and_then(|v| v.as_u64())
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{}. [{:.3}] {} (chunk {})", i + 1, hit.score, source, chunk);
        println!("   {}", preview(&hit.record.content));
    }

    store.close().await;
    Ok(())
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{}…", cut)
}
