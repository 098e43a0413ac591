use async_trait::async_trait;
use log::{ debug, info };

use super::{ ChatClient, CompletionResponse };
use crate::llm::{ LlmConfig, LlmError };
use crate::models::chat::{ ConversationTurn, Role };
use rllm::chat::{ ChatMessage, ChatRole, MessageType };
use rllm::builder::{ LLMBackend, LLMBuilder };

const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiChatClient {
    api_key: String,
    model: String,
    base_url: Option<String>,
}

impl GeminiChatClient {
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Self {
        let chat_model = model.unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string());
        Self { api_key, model: chat_model, base_url }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(LlmError::MissingApiKey("GeminiChatClient"))?;
        Ok(Self::new(api_key, config.completion_model.clone(), config.base_url.clone()))
    }
}

/// Prior turns in order, followed by `message` as the final user turn.
pub fn to_chat_messages(history: &[ConversationTurn], message: &str) -> Vec<ChatMessage> {
    history
        .iter()
        .map(|turn| ChatMessage {
            role: match turn.role {
                Role::User => ChatRole::User,
                Role::Model => ChatRole::Assistant,
            },
            content: turn.text.clone(),
            message_type: MessageType::Text,
        })
        .chain(
            std::iter::once(ChatMessage {
                role: ChatRole::User,
                content: message.to_string(),
                message_type: MessageType::Text,
            })
        )
        .collect()
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[ConversationTurn],
        message: &str
    ) -> Result<CompletionResponse, LlmError> {
        info!(
            "GeminiChatClient::generate() → model={} base_url={:?} history_turns={}",
            self.model,
            self.base_url,
            history.len()
        );

        let mut builder = LLMBuilder::new()
            .backend(LLMBackend::Google)
            .api_key(self.api_key.clone())
            .model(&self.model)
            .system(system_prompt)
            .stream(false);

        if let Some(url) = &self.base_url {
            builder = builder.base_url(url);
        }

        let provider = builder.build().map_err(|e| LlmError::Provider(e.to_string()))?;
        let messages = to_chat_messages(history, message);

        let resp = provider.chat(&messages).await.map_err(|e| LlmError::Provider(e.to_string()))?;
        let text = resp
            .text()
            .map(|s| s.to_string())
            .unwrap_or_default();
        debug!("GeminiChatClient::generate() ← {} chars", text.len());

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(CompletionResponse { response: text })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }
}
