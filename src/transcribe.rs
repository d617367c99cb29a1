//! Audio transcription backends.
//!
//! Uploaded audio files and recorded voice input go through the same
//! [`Transcriber::transcribe`] call. What is done with the text differs:
//! see [`ChatApp`](crate::chat::ChatApp).
//!
//! | `transcription.provider` | Backend |
//! |--------------------------|---------|
//! | `disabled` | [`DisabledTranscriber`]: always fails with [`TranscriptionError::Disabled`] |
//! | `whisper` | [`WhisperCppTranscriber`]: `POST {url}/inference` on a whisper.cpp server |
//! | `openai` | [`OpenAITranscriber`]: `POST /v1/audio/transcriptions`, needs `OPENAI_API_KEY` |

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use crate::config::{Config, TranscriptionConfig};
use crate::error::TranscriptionError;

/// Speech-to-text backend.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe encoded audio. `file_name` tells the backend the format.
    async fn transcribe(&self, audio: &[u8], file_name: &str)
        -> Result<String, TranscriptionError>;
}

/// Used when `transcription.provider = "disabled"`.
pub struct DisabledTranscriber;

#[async_trait]
impl Transcriber for DisabledTranscriber {
    async fn transcribe(
        &self,
        _audio: &[u8],
        _file_name: &str,
    ) -> Result<String, TranscriptionError> {
        Err(TranscriptionError::Disabled)
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

fn audio_part(audio: &[u8], file_name: &str) -> Part {
    Part::bytes(audio.to_vec()).file_name(file_name.to_string())
}

async fn read_transcript(response: reqwest::Response) -> Result<String, TranscriptionError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TranscriptionError::Backend {
            status: status.as_u16(),
            body,
        });
    }
    let parsed: TranscriptionResponse = response
        .json()
        .await
        .map_err(|e| TranscriptionError::InvalidResponse(e.to_string()))?;
    Ok(parsed.text.trim().to_string())
}

/// whisper.cpp `server` transcriber.
pub struct WhisperCppTranscriber {
    client: Client,
    url: String,
    language: Option<String>,
}

impl WhisperCppTranscriber {
    pub fn new(url: &str, language: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
            language,
        }
    }
}

#[async_trait]
impl Transcriber for WhisperCppTranscriber {
    async fn transcribe(
        &self,
        audio: &[u8],
        file_name: &str,
    ) -> Result<String, TranscriptionError> {
        let mut form = Form::new()
            .part("file", audio_part(audio, file_name))
            .text("response_format", "json");
        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .client
            .post(format!("{}/inference", self.url))
            .multipart(form)
            .send()
            .await?;
        read_transcript(response).await
    }
}

/// OpenAI audio transcription API.
pub struct OpenAITranscriber {
    client: Client,
    api_key: String,
    model: String,
    language: Option<String>,
}

impl OpenAITranscriber {
    pub fn new(config: &TranscriptionConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self {
            client: Client::new(),
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "whisper-1".to_string()),
            language: config.language.clone(),
        })
    }
}

#[async_trait]
impl Transcriber for OpenAITranscriber {
    async fn transcribe(
        &self,
        audio: &[u8],
        file_name: &str,
    ) -> Result<String, TranscriptionError> {
        let mut form = Form::new()
            .part("file", audio_part(audio, file_name))
            .text("model", self.model.clone());
        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;
        read_transcript(response).await
    }
}

/// Create the transcriber named by `transcription.provider`.
pub fn create_transcriber(config: &TranscriptionConfig) -> Result<Arc<dyn Transcriber>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledTranscriber)),
        "whisper" => {
            let url = config
                .url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("transcription.url required for whisper"))?;
            Ok(Arc::new(WhisperCppTranscriber::new(
                url,
                config.language.clone(),
            )))
        }
        "openai" => Ok(Arc::new(OpenAITranscriber::new(config)?)),
        other => bail!("Unknown transcription provider: {}", other),
    }
}

/// Run `pdfchat transcribe`: print the transcript of an audio file.
pub async fn run_transcribe(config: &Config, path: &Path) -> Result<()> {
    let audio =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let transcriber = create_transcriber(&config.transcription)?;
    let text = transcriber.transcribe(&audio, &file_name(path)).await?;
    println!("{}", text);
    Ok(())
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio.wav".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_transcriber() {
        let t = create_transcriber(&TranscriptionConfig::default()).unwrap();
        let err = t.transcribe(b"RIFF", "a.wav").await.unwrap_err();
        assert!(matches!(err, TranscriptionError::Disabled));
    }

    #[test]
    fn test_whisper_requires_url() {
        let config = TranscriptionConfig {
            provider: "whisper".into(),
            ..TranscriptionConfig::default()
        };
        assert!(create_transcriber(&config).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_whisper_server() {
        let t = WhisperCppTranscriber::new("http://127.0.0.1:9/", None);
        let err = t.transcribe(b"RIFF", "a.wav").await.unwrap_err();
        assert!(matches!(err, TranscriptionError::Request(_)));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(Path::new("/tmp/memo.mp3")), "memo.mp3");
    }
}
