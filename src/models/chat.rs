use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub role: Role,
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
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub system: Option<String>,
}

impl ChatRequest {
    /// Rejects requests that would be refused by the provider anyway, before any
    /// quota is reserved for them.
    pub fn validate(&self) -> Result<()> {
        let last = self
            .messages
            .last()
            .ok_or_else(|| AppError::Validation("At least one message is required".to_string()))?;

        if self.messages.iter().any(|m| m.content.trim().is_empty()) {
            return Err(AppError::Validation(
                "Message content cannot be empty".to_string(),
            ));
        }

        if last.role != Role::User {
            return Err(AppError::Validation(
                "The last message must come from the user".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QuotaInfo {
    pub used: i32,
    pub limit: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub reply: String,
    pub model: String,
    pub usage: TokenUsage,
    /// Only present for free-tier accounts.
    pub quota: Option<QuotaInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest {
            messages,
            system: None,
        }
    }

    #[test]
    fn test_validate_accepts_conversation_ending_with_user() {
        let req = request(vec![
            ChatMessage::user("What should I journal about today?"),
            ChatMessage::assistant("Try gratitude."),
            ChatMessage::user("Give me three prompts."),
        ]);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_and_blank() {
        assert!(matches!(
            request(vec![]).validate(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            request(vec![ChatMessage::user("   ")]).validate(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_trailing_assistant_message() {
        let req = request(vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ]);
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_role_wire_format() {
        let msg: ChatMessage =
            serde_json::from_str(r#"{"role":"assistant","content":"ok"}"#).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert!(serde_json::from_str::<ChatMessage>(r#"{"role":"system","content":"x"}"#).is_err());
    }
}
