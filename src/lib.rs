//! # pdf-chat
//!
//! A local chat assistant that can answer from uploaded PDF documents.
//!
//! Uploaded PDFs are fingerprinted, and only documents not seen before are
//! extracted, chunked and stored. A session chats either directly with the
//! language model or, once documents have been uploaded, with the most
//! relevant stored chunk added to each prompt.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────────────┐   ┌──────────────┐
//! │  Upload  │──▶│ Fingerprint → Extract →   │──▶│ Vector store │
//! │  (PDFs)  │   │ Chunk → Store → Register  │   │ pdfs         │
//! └──────────┘   └──────────────────────────┘   │ pdf_hashes   │
//!                                               └──────┬───────┘
//!                                                      │ top-k
//! ┌──────────┐   ┌────────────────┐   ┌────────────────▼─┐
//! │ Session  │──▶│ Chain selector │──▶│ Conversational / │──▶ LLM
//! │ + mode   │   │ PlainChat/Pdf  │   │ Retrieval        │
//! └──────────┘   └────────────────┘   └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pdfchat init
//! pdfchat ingest ./manuals
//! pdfchat ask "How do I reset the device?" --pdf
//! pdfchat chat
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`fingerprint`] | Content digests for dedup |
//! | [`extract`] | PDF text extraction |
//! | [`chunk`] | Overlapping text chunking |
//! | [`registry`] | Persisted set of ingested fingerprints |
//! | [`ingest`] | Ingestion pipeline |
//! | [`store`] | Vector store trait, SQLite and in-memory backends |
//! | [`embedding`] | Embedding providers |
//! | [`llm`] | Text generation backends |
//! | [`prompt`] | Prompt templates |
//! | [`chain`] | Chain selector and chat handlers |
//! | [`session`] | Sessions and persisted history |
//! | [`transcribe`] | Audio transcription backends |
//! | [`chat`] | Interactive chat application |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema setup |

pub mod chain;
pub mod chat;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod prompt;
pub mod registry;
pub mod retrieve;
pub mod session;
pub mod stats;
pub mod store;
pub mod transcribe;
