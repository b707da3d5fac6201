//! services/api/src/adapters/generation_llm.rs
//!
//! This module contains the adapter for the flashcard-generating LLM.
//! It implements the `FlashcardGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use flashcards_core::{
    domain::FlashcardProposal,
    ports::{FlashcardGenerationService, PortError, PortResult},
};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

const SYSTEM_INSTRUCTIONS: &str = r#"You are a study assistant that writes flashcards.

Read the text the user provides and write flashcards that cover its key facts, definitions and ideas.

Rules:
- Each flashcard has a "front" (a question or prompt, at most 200 characters) and a "back" (the answer, at most 500 characters).
- One idea per card. Avoid yes/no questions.
- Write in the same language as the source text.
- Produce between 3 and 20 cards depending on how much material the text contains.

Respond with ONLY a JSON array, no prose and no markdown, in this exact shape:
[{"front": "...", "back": "..."}]"#;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `FlashcardGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiGenerationAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGenerationAdapter {
    /// Creates a new `OpenAiGenerationAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

#[derive(Deserialize)]
struct RawCard {
    front: String,
    back: String,
}

fn code_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("fence pattern is valid")
    })
}

/// Parses the model's reply into proposals, tolerating a surrounding markdown code fence.
pub fn parse_proposals(content: &str) -> PortResult<Vec<FlashcardProposal>> {
    let json = code_fence()
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(content);

    let cards: Vec<RawCard> = serde_json::from_str(json.trim()).map_err(|e| {
        PortError::Unexpected(format!("Generation LLM returned malformed JSON: {}", e))
    })?;

    Ok(cards
        .into_iter()
        .map(|c| FlashcardProposal {
            front: c.front,
            back: c.back,
        })
        .collect())
}

//=========================================================================================
// `FlashcardGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl FlashcardGenerationService for OpenAiGenerationAdapter {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate_flashcards(&self, source_text: &str) -> PortResult<Vec<FlashcardProposal>> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_INSTRUCTIONS)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(format!("SOURCE TEXT:\n---\n{}\n---", source_text))
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .temperature(0.3)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected(
                    "Generation LLM response contained no text content.".to_string(),
                )
            })?;

        parse_proposals(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_array() {
        let reply = r#"[{"front": "Q1", "back": "A1"}, {"front": "Q2", "back": "A2"}]"#;
        let cards = parse_proposals(reply).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].front, "Q2");
    }

    #[test]
    fn strips_markdown_fence() {
        let reply = "```json\n[{\"front\": \"Q\", \"back\": \"A\"}]\n```";
        let cards = parse_proposals(reply).unwrap();
        assert_eq!(cards[0].back, "A");
    }

    #[test]
    fn malformed_reply_is_an_error() {
        assert!(matches!(
            parse_proposals("Sure! Here are your cards."),
            Err(PortError::Unexpected(_))
        ));
    }
}
