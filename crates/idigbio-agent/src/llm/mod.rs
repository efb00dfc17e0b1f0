//! Language model access.
//!
//! The translator talks to models through the [`ChatModel`] trait. The
//! production implementation is [`LlmClient`], which speaks the
//! OpenAI-compatible chat completions protocol (OpenAI, Ollama, LM Studio,
//! vLLM and similar servers).

mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use client::LlmClient;

/// Role of the message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions for the model.
    System,
    /// The request being translated, or feedback on a rejected answer.
    User,
    /// A previous model answer.
    Assistant,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: MessageRole,
    /// Content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// A model that answers a conversation with a single JSON document.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    /// Send the conversation and return the content of the reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unreachable, rejects the request,
    /// or replies with no content.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}
