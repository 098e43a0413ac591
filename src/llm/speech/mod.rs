pub mod gemini;

use async_trait::async_trait;
use std::sync::Arc;

use super::{ LlmConfig, LlmError };
use self::gemini::GeminiSpeechClient;
use crate::config::persona::VoiceConfig;
use crate::models::chat::InlineAudio;

/// Media type assumed when the upstream returns audio without declaring one.
pub const DEFAULT_AUDIO_MIME_TYPE: &str = "audio/L16;rate=24000";

#[async_trait]
pub trait SpeechClient: Send + Sync {
    /// `Ok(None)` means the call succeeded but carried no inline audio.
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceConfig
    ) -> Result<Option<InlineAudio>, LlmError>;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn SpeechClient>, LlmError> {
    let client = GeminiSpeechClient::from_config(config)?;
    Ok(Arc::new(client))
}
