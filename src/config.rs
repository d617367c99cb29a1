//! TOML configuration.
//!
//! Loaded once at process start with [`load_config`]; there is no runtime
//! reconfiguration. See `config/pdfchat.example.toml` for every key.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    1000
}
fn default_overlap_chars() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Chunks supplied to the retrieval chain per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Chunks printed by `pdfchat retrieve`.
    #[serde(default = "default_debug_k")]
    pub debug_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            debug_k: default_debug_k(),
        }
    }
}

fn default_top_k() -> usize {
    1
}
fn default_debug_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_url")]
    pub url: String,
    /// Model tag (Ollama) or informational name (llama.cpp server).
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_context_length")]
    pub context_length: usize,
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_stop")]
    pub stop: Vec<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            url: default_llm_url(),
            model: default_llm_model(),
            context_length: default_context_length(),
            threads: default_threads(),
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
            stop: default_stop(),
        }
    }
}

fn default_llm_provider() -> String {
    "ollama".to_string()
}
fn default_llm_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_llm_model() -> String {
    "mistral:7b-instruct".to_string()
}
fn default_context_length() -> usize {
    2048
}
fn default_threads() -> usize {
    4
}
fn default_max_new_tokens() -> usize {
    512
}
fn default_temperature() -> f32 {
    0.7
}
fn default_stop() -> Vec<String> {
    vec!["Human:".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranscriptionConfig {
    #[serde(default = "default_transcription_provider")]
    pub provider: String,
    /// Base URL of the whisper.cpp server.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            provider: default_transcription_provider(),
            url: None,
            model: None,
            language: None,
        }
    }
}

fn default_transcription_provider() -> String {
    "disabled".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// Directory holding one JSON file per persisted session.
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
    /// Number of past exchanges rendered into each prompt.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_path: default_history_path(),
            history_window: default_history_window(),
        }
    }
}

fn default_history_path() -> PathBuf {
    PathBuf::from("./chat_sessions")
}
fn default_history_window() -> usize {
    3
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.max_chars {
        anyhow::bail!("chunking.overlap_chars must be < chunking.max_chars");
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 || config.retrieval.debug_k < 1 {
        anyhow::bail!("retrieval.top_k and retrieval.debug_k must be >= 1");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "local" => {}
        "openai" | "ollama" => {
            if config.embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                anyhow::bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, local, ollama, or openai.",
            other
        ),
    }

    // Validate LLM
    match config.llm.provider.as_str() {
        "ollama" | "llamacpp" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be ollama or llamacpp.",
            other
        ),
    }
    if config.llm.context_length == 0 || config.llm.threads == 0 {
        anyhow::bail!("llm.context_length and llm.threads must be > 0");
    }

    // Validate transcription
    match config.transcription.provider.as_str() {
        "disabled" | "openai" => {}
        "whisper" => {
            if config.transcription.url.is_none() {
                anyhow::bail!("transcription.url must be specified when provider is 'whisper'");
            }
        }
        other => anyhow::bail!(
            "Unknown transcription provider: '{}'. Must be disabled, whisper, or openai.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = parse_config("[db]\npath = \"./data/pdfchat.sqlite\"\n").unwrap();
        assert_eq!(cfg.chunking.max_chars, 1000);
        assert_eq!(cfg.chunking.overlap_chars, 50);
        assert_eq!(cfg.retrieval.top_k, 1);
        assert_eq!(cfg.retrieval.debug_k, 3);
        assert!(!cfg.embedding.is_enabled());
        assert_eq!(cfg.llm.provider, "ollama");
        assert_eq!(cfg.llm.stop, vec!["Human:".to_string()]);
        assert_eq!(cfg.transcription.provider, "disabled");
        assert_eq!(cfg.chat.history_window, 3);
    }

    #[test]
    fn rejects_overlap_not_below_max() {
        let err = parse_config(
            "[db]\npath = \"x.sqlite\"\n[chunking]\nmax_chars = 100\noverlap_chars = 100\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("overlap_chars"));
    }

    #[test]
    fn rejects_unknown_llm_provider() {
        assert!(parse_config("[db]\npath = \"x.sqlite\"\n[llm]\nprovider = \"gpt\"\n").is_err());
    }

    #[test]
    fn ollama_embeddings_need_model_and_dims() {
        assert!(
            parse_config("[db]\npath = \"x.sqlite\"\n[embedding]\nprovider = \"ollama\"\n")
                .is_err()
        );
        let cfg = parse_config(
            "[db]\npath = \"x.sqlite\"\n[embedding]\nprovider = \"ollama\"\nmodel = \"nomic-embed-text\"\ndims = 768\n",
        )
        .unwrap();
        assert!(cfg.embedding.is_enabled());
    }

    #[test]
    fn whisper_needs_url() {
        assert!(parse_config(
            "[db]\npath = \"x.sqlite\"\n[transcription]\nprovider = \"whisper\"\n"
        )
        .is_err());
    }
}
