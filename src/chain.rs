//! Chain selection and the two chat handlers.
//!
//! A session is always in one of two [`ChatMode`]s. [`select_handler`] maps
//! the mode to a [`ChatHandler`]:
//!
//! | Mode | Handler | Prompt |
//! |------|---------|--------|
//! | [`ChatMode::PlainChat`] | [`ChatHandler::Conversational`] | history + input |
//! | [`ChatMode::PdfChat`] | [`ChatHandler::Retrieval`] | top-k chunks + history + question |
//!
//! Both handlers always return text. An empty completion becomes
//! [`NO_RELEVANT_INFORMATION`]; a failed LLM or store call becomes
//! [`GENERATION_FAILED`] and is logged.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::llm::Generator;
use crate::models::ChatTurn;
use crate::prompt::{chat_prompt, retrieval_prompt};
use crate::store::{VectorStore, CHUNKS_COLLECTION};

/// Returned in place of an empty or whitespace-only completion.
pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found.";
/// Returned when the model or the store could not be reached.
pub const GENERATION_FAILED: &str = "An error occurred while processing your request.";

/// Which handler answers the next query.
///
/// Starts as `PlainChat`. Uploading a document switches to `PdfChat`, and
/// the session stays there until the user switches back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatMode {
    #[default]
    PlainChat,
    PdfChat,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::PlainChat => "plain",
            ChatMode::PdfChat => "pdf",
        }
    }
}

/// Shared dependencies of both handlers, built once at startup.
#[derive(Clone)]
pub struct ChatServices {
    pub generator: Arc<dyn Generator>,
    pub store: Arc<dyn VectorStore>,
    /// Past exchanges rendered into each prompt.
    pub history_window: usize,
    /// Chunks retrieved per question in PDF mode.
    pub top_k: usize,
    pub stop: Vec<String>,
}

/// The handler bound to a [`ChatMode`].
pub enum ChatHandler<'a> {
    Conversational(&'a ChatServices),
    Retrieval(&'a ChatServices),
}

/// Return the handler for `mode`. No side effects.
pub fn select_handler(mode: ChatMode, services: &ChatServices) -> ChatHandler<'_> {
    match mode {
        ChatMode::PlainChat => ChatHandler::Conversational(services),
        ChatMode::PdfChat => ChatHandler::Retrieval(services),
    }
}

impl ChatHandler<'_> {
    /// Answer `user_text` given the prior `history`. Never fails.
    pub async fn respond(&self, history: &[ChatTurn], user_text: &str) -> String {
        let (services, prompt) = match self {
            ChatHandler::Conversational(services) => (
                *services,
                chat_prompt(history, services.history_window, user_text),
            ),
            ChatHandler::Retrieval(services) => {
                let hits = match services
                    .store
                    .query(CHUNKS_COLLECTION, user_text, services.top_k)
                    .await
                {
                    Ok(hits) => hits,
                    Err(e) => {
                        error!(error = %e, "retrieval failed");
                        return GENERATION_FAILED.to_string();
                    }
                };
                debug!(hits = hits.len(), "retrieved context");
                (
                    *services,
                    retrieval_prompt(&hits, history, services.history_window, user_text),
                )
            }
        };

        match services.generator.generate(&prompt, &services.stop).await {
            Ok(text) if text.trim().is_empty() => {
                warn!("model returned an empty response");
                NO_RELEVANT_INFORMATION.to_string()
            }
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                error!(error = %e, model = services.generator.model_name(), "generation failed");
                GENERATION_FAILED.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Generator for Echo {
        fn model_name(&self) -> &str {
            "echo"
        }
        async fn generate(&self, prompt: &str, _stop: &[String]) -> Result<String, GenerationError> {
            Ok(format!("  {}  ", prompt.len()))
        }
    }

    fn services(generator: Arc<dyn Generator>) -> ChatServices {
        ChatServices {
            generator,
            store: Arc::new(InMemoryStore::new()),
            history_window: 3,
            top_k: 1,
            stop: vec!["Human:".into()],
        }
    }

    #[test]
    fn test_default_mode_is_plain() {
        assert_eq!(ChatMode::default(), ChatMode::PlainChat);
    }

    #[test]
    fn test_select_handler() {
        let s = services(Arc::new(Echo));
        assert!(matches!(
            select_handler(ChatMode::PlainChat, &s),
            ChatHandler::Conversational(_)
        ));
        assert!(matches!(
            select_handler(ChatMode::PdfChat, &s),
            ChatHandler::Retrieval(_)
        ));
    }

    #[tokio::test]
    async fn test_response_is_trimmed() {
        let s = services(Arc::new(Echo));
        let reply = select_handler(ChatMode::PlainChat, &s)
            .respond(&[], "hi")
            .await;
        assert_eq!(reply, reply.trim());
        assert!(reply.parse::<usize>().is_ok());
    }
}
