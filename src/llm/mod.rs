pub mod chat;
pub mod speech;

use std::time::Duration;
use thiserror::Error;

/// Failures talking to an upstream generative service.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API key is required for {0}")]
    MissingApiKey(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("provider error: {0}")]
    Provider(String),
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
    #[error("upstream returned an empty response")]
    EmptyResponse,
    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub completion_model: Option<String>,
    pub speech_model: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            completion_model: None,
            speech_model: None,
            base_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}
