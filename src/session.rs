//! Chat sessions and their on-disk history.
//!
//! A [`Session`] is the explicit context passed to every interaction: the
//! ordered turn history, the [`ChatMode`] flag, and a pending-input buffer.
//! Persisted sessions are JSON files in `chat.history_path`, one per
//! session, named after the time the session was first saved:
//!
//! ```text
//! chat_sessions/
//!   2024-05-01_14-03-22.json   [{"role":"human","content":"…"},{"role":"ai","content":"…"}]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::chain::ChatMode;
use crate::models::ChatTurn;

const SESSION_EXT: &str = "json";
const KEY_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// How a session is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionKey {
    /// Not yet saved; receives a timestamp key on first save.
    New,
    /// File stem of a persisted session.
    Persisted(String),
}

impl SessionKey {
    pub fn as_str(&self) -> &str {
        match self {
            SessionKey::New => "new session",
            SessionKey::Persisted(key) => key,
        }
    }
}

/// One user's ongoing interaction.
#[derive(Debug, Clone)]
pub struct Session {
    key: SessionKey,
    history: Vec<ChatTurn>,
    mode: ChatMode,
    pending_input: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh session in plain chat mode.
    pub fn new() -> Self {
        Self {
            key: SessionKey::New,
            history: Vec::new(),
            mode: ChatMode::PlainChat,
            pending_input: None,
        }
    }

    /// Load a persisted session by key. The mode starts as plain chat.
    pub fn load(dir: &Path, key: &str) -> Result<Self> {
        let key = key.trim_end_matches(".json");
        let path = session_path(dir, key);
        if !path.is_file() {
            bail!("No session named '{}' in {}", key, dir.display());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session {}", path.display()))?;
        let history: Vec<ChatTurn> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session {}", path.display()))?;
        Ok(Self {
            key: SessionKey::Persisted(key.to_string()),
            history,
            mode: ChatMode::PlainChat,
            pending_input: None,
        })
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    /// Switch to PDF chat. Called when documents are uploaded.
    pub fn enable_pdf_chat(&mut self) {
        self.mode = ChatMode::PdfChat;
    }

    /// Switch back to plain chat. Only ever done on explicit user request.
    pub fn disable_pdf_chat(&mut self) {
        self.mode = ChatMode::PlainChat;
    }

    /// Stage input to be submitted on the next interaction.
    pub fn set_pending_input(&mut self, text: impl Into<String>) {
        self.pending_input = Some(text.into());
    }

    /// Take the staged input, leaving the buffer empty.
    pub fn take_pending_input(&mut self) -> Option<String> {
        self.pending_input.take()
    }

    /// Append a human turn and the reply to it, in that order.
    pub fn record_exchange(&mut self, user_text: impl Into<String>, reply: impl Into<String>) {
        self.history.push(ChatTurn::human(user_text));
        self.history.push(ChatTurn::assistant(reply));
    }

    /// Write the history to `dir`. Returns the file written, or `None` when
    /// there is nothing to save yet.
    ///
    /// A new session is assigned a key from the current local time on its
    /// first save and keeps it afterwards.
    pub fn save(&mut self, dir: &Path) -> Result<Option<PathBuf>> {
        if self.history.is_empty() {
            return Ok(None);
        }
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let key = match &self.key {
            SessionKey::Persisted(key) => key.clone(),
            SessionKey::New => unused_key(dir),
        };
        let path = session_path(dir, &key);
        let json = serde_json::to_string_pretty(&self.history)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write session {}", path.display()))?;

        self.key = SessionKey::Persisted(key);
        Ok(Some(path))
    }
}

fn session_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{}.{}", key, SESSION_EXT))
}

/// Timestamp key that does not collide with an existing session file.
fn unused_key(dir: &Path) -> String {
    let base = chrono::Local::now().format(KEY_FORMAT).to_string();
    if !session_path(dir, &base).exists() {
        return base;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !session_path(dir, &candidate).exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Keys of every persisted session in `dir`, oldest first.
pub fn list_sessions(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut keys: Vec<String> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(SESSION_EXT)
        })
        .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().to_string()))
        .collect();
    keys.sort();
    Ok(keys)
}
