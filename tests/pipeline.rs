//! Library-level tests for the ingestion pipeline, chain selection and
//! chat cycle, using the in-memory store and scripted backends.

mod common;

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tempfile::TempDir;

use pdf_chat::chain::{ChatMode, ChatServices, GENERATION_FAILED, NO_RELEVANT_INFORMATION};
use pdf_chat::chat::ChatApp;
use pdf_chat::chunk::expected_chunk_count;
use pdf_chat::config::{parse_config, ChunkingConfig};
use pdf_chat::error::{GenerationError, TranscriptionError};
use pdf_chat::extract::extract_text;
use pdf_chat::ingest::IngestionPipeline;
use pdf_chat::llm::Generator;
use pdf_chat::models::{RawDocument, Record, Role, ScoredRecord};
use pdf_chat::session::{list_sessions, Session};
use pdf_chat::store::memory::InMemoryStore;
use pdf_chat::store::sqlite::SqliteStore;
use pdf_chat::store::{Filter, VectorStore, CHUNKS_COLLECTION, FINGERPRINTS_COLLECTION};
use pdf_chat::transcribe::Transcriber;

use common::{pdf, pdf_with_pages};

// ─── Scripted backends ──────────────────────────────────────────────

/// Returns a fixed reply and remembers every prompt it was given.
struct Recording {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl Recording {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Generator for Recording {
    fn model_name(&self) -> &str {
        "recording"
    }
    async fn generate(&self, prompt: &str, _stop: &[String]) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

struct Failing;

#[async_trait]
impl Generator for Failing {
    fn model_name(&self) -> &str {
        "failing"
    }
    async fn generate(&self, _prompt: &str, _stop: &[String]) -> Result<String, GenerationError> {
        Err(GenerationError::Request("connection refused".into()))
    }
}

struct FixedTranscript(&'static str);

#[async_trait]
impl Transcriber for FixedTranscript {
    async fn transcribe(&self, _audio: &[u8], _name: &str) -> Result<String, TranscriptionError> {
        Ok(self.0.to_string())
    }
}

struct BrokenTranscriber;

#[async_trait]
impl Transcriber for BrokenTranscriber {
    async fn transcribe(&self, _audio: &[u8], _name: &str) -> Result<String, TranscriptionError> {
        Err(TranscriptionError::Backend {
            status: 500,
            body: "model not loaded".into(),
        })
    }
}

/// A store whose reads fail; counts attempted writes.
#[derive(Default)]
struct UnreachableStore {
    writes: Mutex<usize>,
}

#[async_trait]
impl VectorStore for UnreachableStore {
    async fn add(&self, _collection: &str, _records: &[Record]) -> Result<()> {
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
    async fn get(&self, _collection: &str, _filter: &Filter) -> Result<Vec<Record>> {
        bail!("store unreachable")
    }
    async fn query(&self, _collection: &str, _text: &str, _k: usize) -> Result<Vec<ScoredRecord>> {
        bail!("store unreachable")
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn chunking() -> ChunkingConfig {
    ChunkingConfig {
        max_chars: 1000,
        overlap_chars: 50,
    }
}

fn app_with(
    generator: Arc<dyn Generator>,
    store: Arc<dyn VectorStore>,
    transcriber: Arc<dyn Transcriber>,
    history_dir: &Path,
) -> ChatApp {
    let services = ChatServices {
        generator,
        store,
        history_window: 3,
        top_k: 1,
        stop: vec!["Human:".to_string()],
    };
    ChatApp::new(
        services,
        transcriber,
        chunking(),
        history_dir.to_path_buf(),
        Session::new(),
    )
}

fn app(generator: Arc<dyn Generator>, history_dir: &Path) -> ChatApp {
    app_with(
        generator,
        Arc::new(InMemoryStore::new()),
        Arc::new(FixedTranscript("unused")),
        history_dir,
    )
}

// ─── Ingestion ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_same_document_twice_stored_once() {
    let store = InMemoryStore::new();
    let pipeline = IngestionPipeline::new(&store, chunking());
    let doc = RawDocument::new("manual.pdf", pdf("Press the reset button for ten seconds."));

    let first = pipeline.ingest(&[doc.clone()]).await.unwrap();
    assert_eq!((first.added, first.skipped), (1, 0));
    let chunks_after_first = store.len(CHUNKS_COLLECTION);

    let second = pipeline.ingest(&[doc]).await.unwrap();
    assert_eq!((second.added, second.skipped), (0, 1));
    assert_eq!(store.len(CHUNKS_COLLECTION), chunks_after_first);
    assert_eq!(store.len(FINGERPRINTS_COLLECTION), 1);
}

#[tokio::test]
async fn test_renamed_copy_is_still_a_duplicate() {
    let store = InMemoryStore::new();
    let bytes = pdf("identical content");
    IngestionPipeline::new(&store, chunking())
        .ingest(&[RawDocument::new("a.pdf", bytes.clone())])
        .await
        .unwrap();

    let report = IngestionPipeline::new(&store, chunking())
        .ingest(&[RawDocument::new("renamed.pdf", bytes)])
        .await
        .unwrap();
    assert_eq!(report.skipped, 1);
    assert!(store
        .get(CHUNKS_COLLECTION, &Filter::eq("source", "renamed.pdf"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_dedup_survives_reopening_sqlite_store() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("pdfchat.sqlite");
    let config = parse_config(&format!("[db]\npath = {:?}\n", db.display().to_string())).unwrap();
    let doc = RawDocument::new("guide.pdf", pdf("Persistent registry check."));

    let store = SqliteStore::from_config(&config).await.unwrap();
    let report = IngestionPipeline::new(&store, config.chunking.clone())
        .ingest(&[doc.clone()])
        .await
        .unwrap();
    assert_eq!(report.added, 1);
    store.close().await;

    let store = SqliteStore::from_config(&config).await.unwrap();
    let report = IngestionPipeline::new(&store, config.chunking.clone())
        .ingest(&[doc])
        .await
        .unwrap();
    assert_eq!((report.added, report.skipped), (0, 1));
    assert_eq!(store.count(CHUNKS_COLLECTION).await.unwrap(), 1);
    assert_eq!(store.count(FINGERPRINTS_COLLECTION).await.unwrap(), 1);
    store.close().await;
}

#[tokio::test]
async fn test_corrupt_and_valid_batch() {
    let store = InMemoryStore::new();
    let batch = [
        RawDocument::new("corrupt.pdf", b"%PDF-1.4\nthis is not a pdf".to_vec()),
        RawDocument::new("valid.pdf", pdf("The valid document survives.")),
    ];

    let report = IngestionPipeline::new(&store, chunking())
        .ingest(&batch)
        .await
        .unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.failed[0].name, "corrupt.pdf");

    let chunks = store
        .get(CHUNKS_COLLECTION, &Filter::eq("source", "valid.pdf"))
        .await
        .unwrap();
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].content.contains("The valid document survives."));
}

#[tokio::test]
async fn test_registry_failure_aborts_batch() {
    let store = UnreachableStore::default();
    let result = IngestionPipeline::new(&store, chunking())
        .ingest(&[RawDocument::new("a.pdf", pdf("never stored"))])
        .await;
    assert!(result.is_err());
    assert_eq!(*store.writes.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_long_document_chunk_count() {
    let sentence = "Lorem ipsum dolor sit amet consectetur adipiscing elit. ";
    let long_text = sentence.repeat(60);
    let bytes = pdf_with_pages(&[&long_text, "Second page."]);
    let extracted_len = extract_text(&bytes).unwrap().chars().count();
    assert!(extracted_len > 1000);

    let store = InMemoryStore::new();
    let report = IngestionPipeline::new(&store, chunking())
        .ingest(&[RawDocument::new("long.pdf", bytes)])
        .await
        .unwrap();
    assert_eq!(
        report.chunks_written,
        expected_chunk_count(extracted_len, 1000, 50)
    );
    assert_eq!(store.len(CHUNKS_COLLECTION), report.chunks_written);
    for chunk in store.get(CHUNKS_COLLECTION, &Filter::all()).await.unwrap() {
        assert!(chunk.content.chars().count() <= 1000);
    }
}

// ─── Chain selection ────────────────────────────────────────────────

#[tokio::test]
async fn test_upload_switches_to_pdf_chat_and_stays() {
    let tmp = TempDir::new().unwrap();
    let generator = Recording::new("Ten seconds.");
    let mut app = app(generator.clone(), tmp.path());
    assert_eq!(app.mode(), ChatMode::PlainChat);

    let report = app
        .upload_pdfs(&[RawDocument::new(
            "manual.pdf",
            pdf("Hold the reset button for ten seconds."),
        )])
        .await
        .unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(app.mode(), ChatMode::PdfChat);

    let reply = app.submit_text("How long do I hold the reset button?").await;
    assert_eq!(reply, "Ten seconds.");
    assert_eq!(app.mode(), ChatMode::PdfChat);

    let prompt = generator.last_prompt();
    assert!(prompt.contains("Hold the reset button for ten seconds."));
    assert!(prompt.ends_with("Helpful Answer:"));
}

#[tokio::test]
async fn test_plain_chat_does_not_retrieve() {
    let tmp = TempDir::new().unwrap();
    let generator = Recording::new("Hello!");
    let mut app = app(generator.clone(), tmp.path());

    assert_eq!(app.submit_text("hi").await, "Hello!");
    let prompt = generator.last_prompt();
    assert!(prompt.ends_with("Human: hi\nAI:"));
    assert!(!prompt.contains("pieces of context"));
}

#[tokio::test]
async fn test_explicit_switch_back_to_plain_chat() {
    let tmp = TempDir::new().unwrap();
    let mut app = app(Recording::new("ok"), tmp.path());
    app.upload_pdfs(&[RawDocument::new("a.pdf", pdf("content"))])
        .await
        .unwrap();
    app.set_pdf_chat(false);
    assert_eq!(app.mode(), ChatMode::PlainChat);
}

#[tokio::test]
async fn test_retrieval_uses_top_one_chunk() {
    let tmp = TempDir::new().unwrap();
    let generator = Recording::new("Two years.");
    let mut app = app(generator.clone(), tmp.path());
    app.upload_pdfs(&[
        RawDocument::new("warranty.pdf", pdf("The warranty period is two years.")),
        RawDocument::new("shipping.pdf", pdf("Orders ship within five business days.")),
    ])
    .await
    .unwrap();

    app.submit_text("What is the warranty period?").await;
    let prompt = generator.last_prompt();
    assert!(prompt.contains("The warranty period is two years."));
    assert!(!prompt.contains("Orders ship"));
}

// ─── Fallbacks ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_generation_failure_returns_fallback_in_both_modes() {
    let tmp = TempDir::new().unwrap();
    let mut app = app(Arc::new(Failing), tmp.path());

    assert_eq!(app.submit_text("hello").await, GENERATION_FAILED);
    app.set_pdf_chat(true);
    assert_eq!(app.submit_text("anything in the pdfs?").await, GENERATION_FAILED);
    assert_eq!(app.session().history().len(), 4);
}

#[tokio::test]
async fn test_empty_completion_returns_notice() {
    let tmp = TempDir::new().unwrap();
    let mut app = app(Recording::new("  \n "), tmp.path());
    assert_eq!(app.submit_text("hello").await, NO_RELEVANT_INFORMATION);
}

#[tokio::test]
async fn test_store_failure_in_pdf_chat_returns_fallback() {
    let tmp = TempDir::new().unwrap();
    let mut app = app_with(
        Recording::new("unreachable"),
        Arc::new(UnreachableStore::default()),
        Arc::new(FixedTranscript("unused")),
        tmp.path(),
    );
    app.set_pdf_chat(true);
    assert_eq!(app.submit_text("question").await, GENERATION_FAILED);
}

// ─── Audio and sessions ─────────────────────────────────────────────

#[tokio::test]
async fn test_uploaded_audio_is_summarized_and_voice_is_verbatim() {
    let tmp = TempDir::new().unwrap();
    let generator = Recording::new("ok");
    let mut app = app_with(
        generator.clone(),
        Arc::new(InMemoryStore::new()),
        Arc::new(FixedTranscript("quarterly numbers are up")),
        tmp.path(),
    );

    app.upload_audio(b"RIFF....", "meeting.wav").await.unwrap();
    assert_eq!(
        app.session().history()[0].content,
        "Summarize this text: quarterly numbers are up"
    );

    app.submit_voice(b"RIFF....", "voice.wav").await.unwrap();
    assert_eq!(app.session().history()[2].content, "quarterly numbers are up");
    assert!(generator
        .last_prompt()
        .ends_with("Human: quarterly numbers are up\nAI:"));
}

#[tokio::test]
async fn test_transcription_failure_leaves_history_untouched() {
    let tmp = TempDir::new().unwrap();
    let mut app = app_with(
        Recording::new("ok"),
        Arc::new(InMemoryStore::new()),
        Arc::new(BrokenTranscriber),
        tmp.path(),
    );
    assert!(app.submit_voice(b"RIFF", "v.wav").await.is_err());
    assert!(app.session().history().is_empty());
    assert!(list_sessions(tmp.path()).unwrap().is_empty());
}

#[tokio::test]
async fn test_session_saved_after_each_cycle_and_reopened() {
    let tmp = TempDir::new().unwrap();
    let mut app = app(Recording::new("first reply"), tmp.path());
    app.submit_text("first question").await;

    let keys = list_sessions(tmp.path()).unwrap();
    assert_eq!(keys.len(), 1);

    app.submit_text("second question").await;
    assert_eq!(list_sessions(tmp.path()).unwrap(), keys);

    app.new_session();
    assert!(app.session().history().is_empty());
    app.open_session(&keys[0]).unwrap();
    let history = app.session().history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].role, Role::Human);
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[2].content, "second question");
    assert_eq!(app.mode(), ChatMode::PlainChat);
}

#[tokio::test]
async fn test_history_window_limits_prompt() {
    let tmp = TempDir::new().unwrap();
    let generator = Recording::new("ok");
    let mut app = app(generator.clone(), tmp.path());
    for i in 0..5 {
        app.submit_text(&format!("question {}", i)).await;
    }
    app.submit_text("latest").await;

    let prompt = generator.last_prompt();
    assert!(!prompt.contains("question 1"));
    assert!(prompt.contains("Human: question 2"));
    assert!(prompt.contains("Human: question 4"));
}
