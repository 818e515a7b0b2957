use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ChatResponse, ChatRole, ChatTurn};
use crate::services::llm_service::LlmService;

pub const MAX_MESSAGE_CHARS: usize = 2000;
pub const MAX_HISTORY_TURNS: usize = 10;

pub const APOLOGY_REPLY: &str = "Maaf, asisten sedang tidak dapat menjawab. Silakan coba lagi beberapa saat lagi.";

const SYSTEM_PROMPT: &str = "Kamu adalah asisten bisnis untuk pelaku UMKM di Indonesia. \
Bantu pengguna memahami tren harga dan permintaan bahan pokok, stok, dan strategi penjualan. \
Jawab dalam bahasa Indonesia dengan ringkas dan praktis.";

fn build_prompt(message: &str, history: &[ChatTurn]) -> String {
    let start = history.len().saturating_sub(MAX_HISTORY_TURNS);
    let mut prompt = String::new();

    for turn in &history[start..] {
        let speaker = match turn.role {
            ChatRole::User => "Pengguna",
            ChatRole::Assistant => "Asisten",
        };
        prompt.push_str(&format!("{}: {}\n", speaker, turn.content.trim()));
    }
    prompt.push_str(&format!("Pengguna: {}\nAsisten:", message));
    prompt
}

/// Answer a dashboard chat message.
///
/// Only validation errors are returned; upstream failures produce the
/// apology reply with `degraded` set.
pub async fn reply(
    llm: &LlmService,
    user_id: Uuid,
    message: &str,
    history: &[ChatTurn],
) -> Result<ChatResponse, AppError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(AppError::Validation("message must not be empty".to_string()));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::Validation(format!(
            "message must be at most {} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    let prompt = build_prompt(message, history);
    match llm
        .generate_completion_for_user(user_id, SYSTEM_PROMPT, &prompt)
        .await
    {
        Ok(text) if !text.trim().is_empty() => Ok(ChatResponse {
            reply: text.trim().to_string(),
            degraded: false,
        }),
        Ok(_) => {
            warn!("Empty chat completion for user {}", user_id);
            Ok(degraded())
        }
        Err(e) => {
            warn!("Chat completion for user {} failed: {}", user_id, e);
            Ok(degraded())
        }
    }
}

fn degraded() -> ChatResponse {
    ChatResponse {
        reply: APOLOGY_REPLY.to_string(),
        degraded: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LlmError;
    use crate::services::llm_service::LlmProvider;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct PromptEcho;

    #[async_trait]
    impl LlmProvider for PromptEcho {
        async fn generate_completion(&self, _system: &str, prompt: &str) -> Result<String, LlmError> {
            Ok(prompt.to_string())
        }
    }

    fn turn(role: ChatRole, content: &str) -> ChatTurn {
        ChatTurn {
            role,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_disabled_llm_returns_apology() {
        let response = reply(&LlmService::disabled(), Uuid::new_v4(), "Halo", &[])
            .await
            .unwrap();
        assert!(response.degraded);
        assert_eq!(response.reply, APOLOGY_REPLY);
    }

    #[tokio::test]
    async fn test_validation() {
        let llm = LlmService::disabled();
        assert!(matches!(
            reply(&llm, Uuid::new_v4(), "  ", &[]).await,
            Err(AppError::Validation(_))
        ));
        let long = "a".repeat(MAX_MESSAGE_CHARS + 1);
        assert!(matches!(
            reply(&llm, Uuid::new_v4(), &long, &[]).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_history_is_truncated_to_recent_turns() {
        let llm = LlmService::with_provider(Arc::new(PromptEcho), 10);
        let history: Vec<ChatTurn> = (0..15)
            .map(|i| turn(ChatRole::User, &format!("pesan-{:02}", i)))
            .collect();

        let response = reply(&llm, Uuid::new_v4(), "Bagaimana harga cabai?", &history)
            .await
            .unwrap();
        assert!(!response.degraded);
        assert!(!response.reply.contains("pesan-04"));
        assert!(response.reply.contains("pesan-05"));
        assert!(response.reply.contains("pesan-14"));
        assert!(response.reply.ends_with("Bagaimana harga cabai?\nAsisten:"));
    }

    #[test]
    fn test_prompt_labels_roles() {
        let prompt = build_prompt(
            "lanjut",
            &[turn(ChatRole::User, "halo"), turn(ChatRole::Assistant, "hai")],
        );
        assert_eq!(prompt, "Pengguna: halo\nAsisten: hai\nPengguna: lanjut\nAsisten:");
    }
}
