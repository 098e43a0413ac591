pub mod gemini;

use async_trait::async_trait;
use std::sync::Arc;
use super::{ LlmConfig, LlmError };
use self::gemini::GeminiChatClient;
use crate::models::chat::ConversationTurn;

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

/// Single-shot text generation conditioned on a system prompt and prior turns.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// `history` is sent as-is before `message`, which becomes the final user turn.
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[ConversationTurn],
        message: &str
    ) -> Result<CompletionResponse, LlmError>;

    fn get_model(&self) -> String;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, LlmError> {
    let client = GeminiChatClient::from_config(config)?;
    Ok(Arc::new(client))
}
