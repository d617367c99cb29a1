//! Core data models used throughout pdf-chat.
//!
//! These types represent the documents, chunks, store records, chat turns
//! and ingestion reports that flow through the ingestion and chat pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata attached to a store record.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Content digest of a document's raw bytes, used as the dedup key.
///
/// Always a 64-character lowercase hex SHA-256 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub(crate) fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An uploaded document before ingestion.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Display name (usually the file name).
    pub name: String,
    pub bytes: Vec<u8>,
}

impl RawDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Where a chunk came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSource {
    pub document: String,
    pub fingerprint: Fingerprint,
}

/// A bounded-length segment of extracted document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub index: usize,
    pub content: String,
    pub source: Option<ChunkSource>,
}

/// A record in a vector store collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
}

/// A record returned from a ranked query.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: Record,
    pub score: f64,
}

/// Who said a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "human")]
    Human,
    #[serde(rename = "ai")]
    Assistant,
}

impl Role {
    /// Speaker label used when rendering history into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Human => "Human",
            Role::Assistant => "AI",
        }
    }
}

/// One message in a session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A document that could not be ingested.
#[derive(Debug, Clone)]
pub struct FailedDocument {
    pub name: String,
    pub error: String,
}

/// Outcome of one ingestion batch.
#[derive(Debug, Clone, Default)]
pub struct IngestionReport {
    pub added: usize,
    pub skipped: usize,
    pub failed: Vec<FailedDocument>,
    /// Total chunk records written across all added documents.
    pub chunks_written: usize,
}

impl IngestionReport {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}
