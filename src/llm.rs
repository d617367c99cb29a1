//! Text generation backends.
//!
//! The [`Generator`] trait is the single call the chat handlers make into a
//! language model: `generate(prompt, stop) -> text`. Backends are configured
//! once at startup from `[llm]` and run on CPU.
//!
//! | `llm.provider` | Backend | Endpoint |
//! |----------------|---------|----------|
//! | `ollama` | [`OllamaGenerator`] | `POST {url}/api/generate` |
//! | `llamacpp` | [`LlamaCppGenerator`] | `POST {url}/completion` |
//!
//! No timeout is set on generation requests and failed calls are not
//! retried; the handler turns a failure into fallback text.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::GenerationError;

/// A language model that completes a prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    fn model_name(&self) -> &str;

    /// Complete `prompt`, stopping at any of `stop`.
    async fn generate(&self, prompt: &str, stop: &[String]) -> Result<String, GenerationError>;
}

// ============ Ollama ============

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions<'a>,
}

#[derive(Serialize)]
struct OllamaOptions<'a> {
    num_ctx: usize,
    num_thread: usize,
    /// CPU-only inference.
    num_gpu: u32,
    num_predict: usize,
    temperature: f32,
    stop: &'a [String],
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

/// Generator backed by an Ollama server.
pub struct OllamaGenerator {
    client: Client,
    config: LlmConfig,
}

impl OllamaGenerator {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config: config.clone(),
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, stop: &[String]) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.config.url.trim_end_matches('/'));
        let request = OllamaRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                num_ctx: self.config.context_length,
                num_thread: self.config.threads,
                num_gpu: 0,
                num_predict: self.config.max_new_tokens,
                temperature: self.config.temperature,
                stop,
            },
        };

        tracing::debug!(model = %self.config.model, prompt_chars = prompt.len(), "ollama generate");
        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        Ok(parsed.response)
    }
}

// ============ llama.cpp server ============

#[derive(Serialize)]
struct LlamaCppRequest<'a> {
    prompt: &'a str,
    n_predict: usize,
    temperature: f32,
    stop: &'a [String],
    stream: bool,
}

#[derive(Deserialize)]
struct LlamaCppResponse {
    content: String,
}

/// Generator backed by a llama.cpp `server` process.
///
/// Context size and thread count are fixed when that server is started;
/// `llm.model` is informational only.
pub struct LlamaCppGenerator {
    client: Client,
    config: LlmConfig,
}

impl LlamaCppGenerator {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config: config.clone(),
        }
    }
}

#[async_trait]
impl Generator for LlamaCppGenerator {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, stop: &[String]) -> Result<String, GenerationError> {
        let url = format!("{}/completion", self.config.url.trim_end_matches('/'));
        let request = LlamaCppRequest {
            prompt,
            n_predict: self.config.max_new_tokens,
            temperature: self.config.temperature,
            stop,
            stream: false,
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: LlamaCppResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        Ok(parsed.content)
    }
}

/// Create the generator named by `llm.provider`.
pub fn create_generator(config: &LlmConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config))),
        "llamacpp" => Ok(Arc::new(LlamaCppGenerator::new(config))),
        other => bail!("Unknown llm provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_request_shape() {
        let stop = vec!["Human:".to_string()];
        let request = OllamaRequest {
            model: "mistral:7b-instruct",
            prompt: "hi",
            stream: false,
            options: OllamaOptions {
                num_ctx: 2048,
                num_thread: 4,
                num_gpu: 0,
                num_predict: 512,
                temperature: 0.5,
                stop: &stop,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_ctx"], 2048);
        assert_eq!(json["options"]["num_gpu"], 0);
        assert_eq!(json["options"]["stop"][0], "Human:");
    }

    #[test]
    fn test_create_generator() {
        let mut config = LlmConfig::default();
        assert_eq!(create_generator(&config).unwrap().model_name(), "mistral:7b-instruct");
        config.provider = "llamacpp".into();
        assert!(create_generator(&config).is_ok());
        config.provider = "gpt".into();
        assert!(create_generator(&config).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_request_error() {
        let config = LlmConfig {
            url: "http://127.0.0.1:9".into(),
            ..LlmConfig::default()
        };
        let err = OllamaGenerator::new(&config)
            .generate("hello", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Request(_)));
    }
}
