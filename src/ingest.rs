//! Ingestion pipeline orchestration.
//!
//! Coordinates the flow for a batch of uploaded documents:
//! fingerprint → registry check → extract → chunk → store → record
//! fingerprint. Documents already in the registry are skipped without
//! touching the store, so each distinct document is stored at most once.
//!
//! A document whose text cannot be extracted is reported in
//! [`IngestionReport::failed`] and the batch continues. A store failure
//! (including failing to load the registry) aborts the batch.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::json;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::chunk::chunk_text;
use crate::config::{ChunkingConfig, Config};
use crate::extract::extract_text;
use crate::fingerprint::fingerprint;
use crate::models::{
    ChunkSource, FailedDocument, Fingerprint, IngestionReport, Metadata, RawDocument, Record,
    TextChunk,
};
use crate::progress::{
    DocumentOutcome, IngestProgressEvent, IngestProgressReporter, NoProgress, ProgressMode,
};
use crate::registry::FingerprintRegistry;
use crate::store::sqlite::SqliteStore;
use crate::store::{VectorStore, CHUNKS_COLLECTION};

/// Runs ingestion batches against a store.
pub struct IngestionPipeline<'a, S: VectorStore + ?Sized> {
    store: &'a S,
    chunking: ChunkingConfig,
}

impl<'a, S: VectorStore + ?Sized> IngestionPipeline<'a, S> {
    pub fn new(store: &'a S, chunking: ChunkingConfig) -> Self {
        Self { store, chunking }
    }

    /// Ingest a batch without progress output.
    pub async fn ingest(&self, batch: &[RawDocument]) -> Result<IngestionReport> {
        self.ingest_with_progress(batch, &NoProgress).await
    }

    /// Ingest a batch in input order, reporting each document's outcome.
    pub async fn ingest_with_progress(
        &self,
        batch: &[RawDocument],
        progress: &dyn IngestProgressReporter,
    ) -> Result<IngestionReport> {
        let mut registry = FingerprintRegistry::load(self.store).await?;
        let total = batch.len() as u64;
        progress.report(IngestProgressEvent::Started { total });

        let mut report = IngestionReport::default();
        for (i, doc) in batch.iter().enumerate() {
            let fp = fingerprint(&doc.bytes);

            let outcome = if registry.contains(&fp) {
                debug!(document = %doc.name, fingerprint = %fp, "already ingested, skipping");
                report.skipped += 1;
                DocumentOutcome::Skipped
            } else {
                match extract_text(&doc.bytes) {
                    Ok(text) => {
                        let chunks = self.store_document(doc, &fp, &text).await?;
                        registry.record(self.store, &fp, &doc.name).await?;
                        info!(document = %doc.name, chunks, "document ingested");
                        report.added += 1;
                        report.chunks_written += chunks;
                        DocumentOutcome::Added { chunks }
                    }
                    Err(e) => {
                        warn!(document = %doc.name, error = %e, "extraction failed, skipping");
                        report.failed.push(FailedDocument {
                            name: doc.name.clone(),
                            error: e.to_string(),
                        });
                        DocumentOutcome::Failed
                    }
                }
            };

            progress.report(IngestProgressEvent::Document {
                n: i as u64 + 1,
                total,
                name: doc.name.clone(),
                outcome,
            });
        }

        Ok(report)
    }

    /// Chunk `text` and add one record per chunk. Returns the chunk count.
    async fn store_document(
        &self,
        doc: &RawDocument,
        fp: &Fingerprint,
        text: &str,
    ) -> Result<usize> {
        let source = ChunkSource {
            document: doc.name.clone(),
            fingerprint: fp.clone(),
        };
        let chunks = chunk_text(text, self.chunking.max_chars, self.chunking.overlap_chars);
        let records: Vec<Record> = chunks
            .into_iter()
            .map(|chunk| {
                chunk_record(TextChunk {
                    source: Some(source.clone()),
                    ..chunk
                })
            })
            .collect();

        if !records.is_empty() {
            self.store.add(CHUNKS_COLLECTION, &records).await?;
        }
        Ok(records.len())
    }
}

/// Convert a chunk into a store record. Ids are derived from the
/// fingerprint, so re-adding a document's chunks replaces them.
fn chunk_record(chunk: TextChunk) -> Record {
    let mut metadata = Metadata::new();
    metadata.insert("chunk_index".into(), json!(chunk.index));
    let id = match &chunk.source {
        Some(source) => {
            metadata.insert("source".into(), json!(source.document));
            metadata.insert("fingerprint".into(), json!(source.fingerprint.as_str()));
            format!("{}-{}", source.fingerprint, chunk.index)
        }
        None => uuid::Uuid::new_v4().to_string(),
    };
    Record {
        id,
        content: chunk.content,
        metadata,
    }
}

/// Read PDF documents from files and directories.
///
/// Files are read as given. Directories are walked recursively and every
/// `*.pdf` file (case-insensitive) is read, in sorted path order.
pub fn load_documents(paths: &[PathBuf]) -> Result<Vec<RawDocument>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_pdf(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            bail!("No such file or directory: {}", path.display());
        }
    }

    files
        .into_iter()
        .map(|path| {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            Ok(RawDocument::new(name, bytes))
        })
        .collect()
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Print an ingestion report in the CLI's line format.
pub fn print_report(report: &IngestionReport, documents: usize) {
    println!("ingest");
    println!("  documents: {}", documents);
    println!("  added: {}", report.added);
    println!("  skipped: {}", report.skipped);
    println!("  failed: {}", report.failed_count());
    for failed in &report.failed {
        println!("    {}: {}", failed.name, failed.error);
    }
    println!("  chunks written: {}", report.chunks_written);
    println!("ok");
}

/// Run `pdfchat ingest`.
pub async fn run_ingest(config: &Config, paths: &[PathBuf], progress: ProgressMode) -> Result<()> {
    let batch = load_documents(paths)?;
    if batch.is_empty() {
        bail!("No PDF documents found");
    }

    let store = SqliteStore::from_config(config).await?;
    let pipeline = IngestionPipeline::new(&store, config.chunking.clone());
    let reporter = progress.reporter();
    let report = pipeline.ingest_with_progress(&batch, reporter.as_ref()).await?;
    print_report(&report, batch.len());

    store.close().await;
    Ok(())
}
