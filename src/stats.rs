//! Store statistics.
//!
//! Quick summary of what has been ingested: stored chunks, registered
//! documents, and the most recent ingestions. Used by `pdfchat stats`.

use anyhow::Result;

use crate::config::Config;
use crate::models::Record;
use crate::registry::HASH_KEY;
use crate::store::sqlite::SqliteStore;
use crate::store::{Filter, VectorStore, CHUNKS_COLLECTION, FINGERPRINTS_COLLECTION};

const RECENT: usize = 10;

/// Run the stats command: query the store and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::from_config(config).await?;

    let chunks = store.count(CHUNKS_COLLECTION).await?;
    let markers = store.get(FINGERPRINTS_COLLECTION, &Filter::all()).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("pdf-chat: store stats");
    println!("=====================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Embeddings:  {}", config.embedding.provider);
    println!();
    println!("  Documents:   {}", markers.len());
    println!("  Chunks:      {}", chunks);

    if !markers.is_empty() {
        println!();
        println!("  Recently ingested:");
        println!("  {:<32} {:<18} {}", "DOCUMENT", "FINGERPRINT", "INGESTED");
        println!("  {}", "-".repeat(76));
        for marker in markers.iter().rev().take(RECENT) {
            println!(
                "  {:<32} {:<18} {}",
                meta_str(marker, "source"),
                short_hash(meta_str(marker, HASH_KEY)),
                meta_str(marker, "ingested_at")
            );
        }
    }
    println!();

    store.close().await;
    Ok(())
}

fn meta_str<'a>(record: &'a Record, key: &str) -> &'a str {
    record
        .metadata
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("-")
}

fn short_hash(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
