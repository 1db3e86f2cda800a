//! Request and response bodies exchanged with the frontend.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Conversation role as sent by the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// A single message in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ChatMessage {
    pub role: Role,
    #[validate(length(min = 1, message = "message content must not be empty"))]
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(nested)]
    pub messages: Vec<ChatMessage>,
    /// Display name of the model, e.g. `Gemini 2.5 Flash`.
    #[validate(length(min = 1, message = "model must not be empty"))]
    pub model: String,
}

impl ChatRequest {
    /// Last message of the conversation, if any.
    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

/// Body of `POST /api/completion`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub prompt: String,
    #[serde(default)]
    pub is_title: bool,
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub thread_id: String,
}

/// Response of `POST /api/completion`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub title: String,
    pub is_title: bool,
    pub message_id: String,
    pub thread_id: String,
}

/// JSON error body used by every non-streaming failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
