//! The interactive chat application.
//!
//! [`ChatApp`] owns the current [`Session`] and runs one interaction cycle
//! per user action: text submit, voice submit, audio upload, PDF upload.
//! Each cycle runs to completion before the next input is read, and the
//! session is saved at the end of every cycle that produced a reply.
//!
//! [`run_chat`] drives a `ChatApp` from stdin lines; [`run_ask`] runs a
//! single cycle for scripting.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::chain::{select_handler, ChatMode, ChatServices};
use crate::config::{ChunkingConfig, Config};
use crate::error::TranscriptionError;
use crate::ingest::{load_documents, print_report, IngestionPipeline};
use crate::llm::create_generator;
use crate::models::{IngestionReport, RawDocument};
use crate::progress::ProgressMode;
use crate::session::{list_sessions, Session, SessionKey};
use crate::store::sqlite::SqliteStore;
use crate::transcribe::{create_transcriber, file_name, Transcriber};

/// Prefix put in front of an uploaded audio file's transcript.
pub const SUMMARIZE_PREFIX: &str = "Summarize this text: ";

/// A chat session wired to its backends.
pub struct ChatApp {
    services: ChatServices,
    transcriber: Arc<dyn Transcriber>,
    chunking: ChunkingConfig,
    history_dir: PathBuf,
    progress: ProgressMode,
    session: Session,
}

impl ChatApp {
    pub fn new(
        services: ChatServices,
        transcriber: Arc<dyn Transcriber>,
        chunking: ChunkingConfig,
        history_dir: PathBuf,
        session: Session,
    ) -> Self {
        Self {
            services,
            transcriber,
            chunking,
            history_dir,
            progress: ProgressMode::Off,
            session,
        }
    }

    /// Build the app from config: SQLite store, configured LLM and
    /// transcription backends, and a new or persisted session.
    pub async fn from_config(config: &Config, session_key: Option<&str>) -> Result<Self> {
        let store = SqliteStore::from_config(config).await?;
        let services = ChatServices {
            generator: create_generator(&config.llm)?,
            store: Arc::new(store),
            history_window: config.chat.history_window,
            top_k: config.retrieval.top_k,
            stop: config.llm.stop.clone(),
        };
        let session = match session_key {
            Some(key) => Session::load(&config.chat.history_path, key)?,
            None => Session::new(),
        };

        let mut app = Self::new(
            services,
            create_transcriber(&config.transcription)?,
            config.chunking.clone(),
            config.chat.history_path.clone(),
            session,
        );
        app.progress = ProgressMode::default_for_tty();
        Ok(app)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn mode(&self) -> ChatMode {
        self.session.mode()
    }

    /// Submit typed text and return the reply.
    pub async fn submit_text(&mut self, text: &str) -> String {
        self.session.set_pending_input(text);
        self.run_pending().await.unwrap_or_default()
    }

    /// Transcribe recorded voice and submit the transcript as typed text.
    pub async fn submit_voice(
        &mut self,
        audio: &[u8],
        file_name: &str,
    ) -> Result<String, TranscriptionError> {
        let transcript = self.transcriber.transcribe(audio, file_name).await?;
        Ok(self.submit_text(&transcript).await)
    }

    /// Transcribe an uploaded audio file and ask for a summary of it.
    pub async fn upload_audio(
        &mut self,
        audio: &[u8],
        file_name: &str,
    ) -> Result<String, TranscriptionError> {
        let transcript = self.transcriber.transcribe(audio, file_name).await?;
        Ok(self
            .submit_text(&format!("{}{}", SUMMARIZE_PREFIX, transcript))
            .await)
    }

    /// Ingest uploaded documents and switch the session to PDF chat.
    pub async fn upload_pdfs(&mut self, batch: &[RawDocument]) -> Result<IngestionReport> {
        self.session.enable_pdf_chat();
        let pipeline = IngestionPipeline::new(self.services.store.as_ref(), self.chunking.clone());
        let reporter = self.progress.reporter();
        let report = pipeline
            .ingest_with_progress(batch, reporter.as_ref())
            .await?;
        info!(
            added = report.added,
            skipped = report.skipped,
            failed = report.failed_count(),
            "upload ingested"
        );
        Ok(report)
    }

    /// Explicitly switch PDF chat on or off.
    pub fn set_pdf_chat(&mut self, enabled: bool) {
        if enabled {
            self.session.enable_pdf_chat();
        } else {
            self.session.disable_pdf_chat();
        }
    }

    /// Replace the current session with a persisted one.
    pub fn open_session(&mut self, key: &str) -> Result<()> {
        self.session = Session::load(&self.history_dir, key)?;
        Ok(())
    }

    /// Start a fresh session.
    pub fn new_session(&mut self) {
        self.session = Session::new();
    }

    pub fn list_sessions(&self) -> Result<Vec<String>> {
        list_sessions(&self.history_dir)
    }

    /// Answer the staged input, record the exchange, save the session.
    async fn run_pending(&mut self) -> Option<String> {
        let input = self.session.take_pending_input()?;
        let handler = select_handler(self.session.mode(), &self.services);
        let reply = handler.respond(self.session.history(), &input).await;
        self.session.record_exchange(input, reply.clone());
        self.save();
        Some(reply)
    }

    fn save(&mut self) {
        match self.session.save(&self.history_dir) {
            Ok(Some(path)) => tracing::debug!(path = %path.display(), "session saved"),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to save session"),
        }
    }
}

/// A line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Text(String),
    Upload(Vec<PathBuf>),
    Audio(PathBuf),
    Voice(PathBuf),
    Pdf(bool),
    History,
    Sessions,
    Open(String),
    New,
    Help,
    Quit,
    Empty,
}

impl ReplCommand {
    /// Parse one input line. Unknown or malformed `/` commands are errors.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(ReplCommand::Empty);
        }
        if !line.starts_with('/') {
            return Ok(ReplCommand::Text(line.to_string()));
        }

        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();
        let cmd = match (command, args.as_slice()) {
            ("/upload", paths) if !paths.is_empty() => {
                ReplCommand::Upload(paths.iter().map(PathBuf::from).collect())
            }
            ("/audio", [path]) => ReplCommand::Audio(PathBuf::from(path)),
            ("/voice", [path]) => ReplCommand::Voice(PathBuf::from(path)),
            ("/pdf", ["on"]) => ReplCommand::Pdf(true),
            ("/pdf", ["off"]) => ReplCommand::Pdf(false),
            ("/history", []) => ReplCommand::History,
            ("/sessions", []) => ReplCommand::Sessions,
            ("/open", [key]) => ReplCommand::Open(key.to_string()),
            ("/new", []) => ReplCommand::New,
            ("/help", []) => ReplCommand::Help,
            ("/quit", []) | ("/exit", []) => ReplCommand::Quit,
            _ => bail!("Unrecognized command: {} (try /help)", line),
        };
        Ok(cmd)
    }
}

const HELP: &str = "\
Type a message to chat. Commands:
  /upload <paths...>   ingest PDF files or directories and switch to PDF chat
  /audio <path>        transcribe an audio file and ask for a summary
  /voice <path>        transcribe recorded voice and send it as a message
  /pdf on|off          switch PDF chat on or off
  /history             show this session's messages
  /sessions            list saved sessions
  /open <key>          continue a saved session
  /new                 start a new session
  /quit                exit";

/// Run `pdfchat chat`: an interactive loop over stdin.
pub async fn run_chat(config: &Config, session_key: Option<&str>, pdf: bool) -> Result<()> {
    let mut app = ChatApp::from_config(config, session_key).await?;
    if pdf {
        app.set_pdf_chat(true);
    }

    let interactive = atty::is(atty::Stream::Stdin);
    if interactive {
        eprintln!(
            "pdfchat: {} ({} mode). /help for commands.",
            app.session().key().as_str(),
            app.mode().as_str()
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if interactive {
            eprint!("> ");
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match ReplCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        if command == ReplCommand::Quit {
            break;
        }
        handle_command(&mut app, command).await;
    }
    Ok(())
}

async fn handle_command(app: &mut ChatApp, command: ReplCommand) {
    match command {
        ReplCommand::Text(text) => println!("{}", app.submit_text(&text).await),
        ReplCommand::Upload(paths) => match load_documents(&paths) {
            Ok(batch) => match app.upload_pdfs(&batch).await {
                Ok(report) => print_report(&report, batch.len()),
                Err(e) => println!("Upload failed: {:#}", e),
            },
            Err(e) => println!("Upload failed: {:#}", e),
        },
        ReplCommand::Audio(path) => match read_audio(&path) {
            Ok(audio) => match app.upload_audio(&audio, &file_name(&path)).await {
                Ok(reply) => println!("{}", reply),
                Err(e) => println!("{}", e),
            },
            Err(e) => println!("{:#}", e),
        },
        ReplCommand::Voice(path) => match read_audio(&path) {
            Ok(audio) => match app.submit_voice(&audio, &file_name(&path)).await {
                Ok(reply) => println!("{}", reply),
                Err(e) => println!("{}", e),
            },
            Err(e) => println!("{:#}", e),
        },
        ReplCommand::Pdf(enabled) => {
            app.set_pdf_chat(enabled);
            println!("mode: {}", app.mode().as_str());
        }
        ReplCommand::History => {
            for turn in app.session().history() {
                println!("{}: {}", turn.role.label(), turn.content);
            }
        }
        ReplCommand::Sessions => match app.list_sessions() {
            Ok(keys) => print_sessions(&keys, app.session().key()),
            Err(e) => println!("{:#}", e),
        },
        ReplCommand::Open(key) => match app.open_session(&key) {
            Ok(()) => println!(
                "opened {} ({} messages)",
                key,
                app.session().history().len()
            ),
            Err(e) => println!("{:#}", e),
        },
        ReplCommand::New => {
            app.new_session();
            println!("new session");
        }
        ReplCommand::Help => println!("{}", HELP),
        ReplCommand::Quit | ReplCommand::Empty => {}
    }
}

fn read_audio(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))
}

fn print_sessions(keys: &[String], current: &SessionKey) {
    if keys.is_empty() {
        println!("no saved sessions");
    }
    for key in keys {
        let marker = if current.as_str() == key { "*" } else { " " };
        println!("{} {}", marker, key);
    }
}

/// Run `pdfchat ask`: one interaction cycle, reply on stdout.
pub async fn run_ask(
    config: &Config,
    question: &str,
    session_key: Option<&str>,
    pdf: bool,
) -> Result<()> {
    let mut app = ChatApp::from_config(config, session_key).await?;
    if pdf {
        app.set_pdf_chat(true);
    }
    println!("{}", app.submit_text(question).await);
    Ok(())
}

/// Run `pdfchat sessions`.
pub fn run_sessions(config: &Config) -> Result<()> {
    for key in list_sessions(&config.chat.history_path)? {
        println!("{}", key);
    }
    Ok(())
}
