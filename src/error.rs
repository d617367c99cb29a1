//! Typed errors for the external boundaries.
//!
//! Application plumbing (config, database, filesystem) uses `anyhow`.
//! The variants here are the ones callers branch on: an extraction failure
//! skips one document, a generation failure becomes fallback text, a
//! transcription failure is reported to the user. None of them end a
//! chat session.

use thiserror::Error;

/// A document could not be opened or its text could not be read.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("not a readable PDF: {0}")]
    Parse(String),
    #[error("failed to extract text from page {page}: {message}")]
    Page { page: u32, message: String },
}

/// The LLM backend could not produce a completion.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("LLM request failed: {0}")]
    Request(String),
    #[error("LLM backend returned {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        GenerationError::Request(e.to_string())
    }
}

/// The transcription backend could not turn audio into text.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("transcription is disabled; set [transcription] provider in config")]
    Disabled,
    #[error("transcription request failed: {0}")]
    Request(String),
    #[error("transcription backend returned {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("invalid transcription response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for TranscriptionError {
    fn from(e: reqwest::Error) -> Self {
        TranscriptionError::Request(e.to_string())
    }
}
