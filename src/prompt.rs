//! Prompt templates for the two chat handlers.
//!
//! Only the last `window` exchanges of history are rendered; older turns
//! stay in the session but are not sent to the model.

use crate::models::{ChatTurn, ScoredRecord};

/// Render the most recent `window` exchanges as `Speaker: text` lines.
pub fn render_history(history: &[ChatTurn], window: usize) -> String {
    let keep = window.saturating_mul(2);
    let start = history.len().saturating_sub(keep);
    history[start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for plain conversation.
pub fn chat_prompt(history: &[ChatTurn], window: usize, input: &str) -> String {
    let history = render_history(history, window);
    let mut prompt = String::from(
        "You are a helpful AI assistant having a conversation with a human. \
         Answer the human's latest message concisely and truthfully.\n\n",
    );
    if !history.is_empty() {
        prompt.push_str("Previous conversation:\n");
        prompt.push_str(&history);
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!("Human: {}\nAI:", input));
    prompt
}

/// "Stuff" prompt for retrieval chat: every retrieved chunk is placed in
/// the context block ahead of the question.
pub fn retrieval_prompt(
    context: &[ScoredRecord],
    history: &[ChatTurn],
    window: usize,
    question: &str,
) -> String {
    let context = context
        .iter()
        .map(|hit| hit.record.content.trim())
        .collect::<Vec<_>>()
        .join("\n\n");
    let history = render_history(history, window);

    let mut prompt = String::from(
        "Use the following pieces of context to answer the question at the end. \
         If you don't know the answer, just say that you don't know, \
         don't try to make up an answer.\n\n",
    );
    prompt.push_str(&context);
    prompt.push_str("\n\n");
    if !history.is_empty() {
        prompt.push_str(&history);
        prompt.push('\n');
    }
    prompt.push_str(&format!("Question: {}\nHelpful Answer:", question));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Metadata, Record};

    fn history(exchanges: usize) -> Vec<ChatTurn> {
        (0..exchanges)
            .flat_map(|i| {
                [
                    ChatTurn::human(format!("q{}", i)),
                    ChatTurn::assistant(format!("a{}", i)),
                ]
            })
            .collect()
    }

    #[test]
    fn test_render_history_window() {
        let rendered = render_history(&history(5), 3);
        assert_eq!(rendered, "Human: q2\nAI: a2\nHuman: q3\nAI: a3\nHuman: q4\nAI: a4");
        assert_eq!(render_history(&history(1), 3), "Human: q0\nAI: a0");
        assert_eq!(render_history(&[], 3), "");
        assert_eq!(render_history(&history(2), 0), "");
    }

    #[test]
    fn test_chat_prompt_ends_with_turn() {
        let prompt = chat_prompt(&history(1), 3, "what next?");
        assert!(prompt.contains("Previous conversation:\nHuman: q0\nAI: a0"));
        assert!(prompt.ends_with("Human: what next?\nAI:"));

        let first = chat_prompt(&[], 3, "hello");
        assert!(!first.contains("Previous conversation"));
    }

    #[test]
    fn test_retrieval_prompt_includes_context() {
        let hit = ScoredRecord {
            record: Record {
                id: "1".into(),
                content: "  The warranty lasts two years.\n".into(),
                metadata: Metadata::new(),
            },
            score: 1.0,
        };
        let prompt = retrieval_prompt(&[hit], &[], 3, "How long is the warranty?");
        assert!(prompt.contains("The warranty lasts two years.\n\nQuestion: How long"));
        assert!(prompt.ends_with("Helpful Answer:"));
    }
}
