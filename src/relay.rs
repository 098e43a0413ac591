use crate::cli::Args;
use crate::config::persona::PersonaConfig;
use crate::llm::{ LlmConfig, LlmError };
use crate::llm::chat::{ ChatClient, new_client as new_chat_client };
use crate::llm::speech::{ SpeechClient, new_client as new_speech_client };
use crate::models::chat::{ ChatRequest, ChatResponse, ConversationTurn, InlineAudio, Role };

use log::{ debug, error, info, warn };
use std::error::Error;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error as ThisError;
use uuid::Uuid;

#[derive(Debug, ThisError)]
pub enum RelayError {
    #[error("upstream API key is not configured")]
    MissingCredential,
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("text generation failed: {0}")]
    Generation(#[source] LlmError),
}

/// Result of the best-effort synthesis step. `Unavailable` is logged, never returned as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    Ready(InlineAudio),
    Unavailable(String),
}

impl SpeechOutcome {
    pub fn into_audio(self) -> Option<InlineAudio> {
        match self {
            SpeechOutcome::Ready(audio) => Some(audio),
            SpeechOutcome::Unavailable(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct UpstreamClients {
    pub chat: Arc<dyn ChatClient>,
    pub speech: Arc<dyn SpeechClient>,
}

#[derive(Clone)]
pub struct ChatRelay {
    persona: Arc<PersonaConfig>,
    upstream: Option<UpstreamClients>,
    upstream_timeout: Duration,
}

/// Drops assistant turns ahead of the first user turn, plus turns with no text.
pub fn normalize_history(history: Vec<ConversationTurn>) -> Vec<ConversationTurn> {
    history
        .into_iter()
        .filter(|turn| !turn.text.trim().is_empty())
        .skip_while(|turn| turn.role == Role::Model)
        .collect()
}

async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, LlmError>
    where F: Future<Output = Result<T, LlmError>>
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(LlmError::Timeout(limit)),
    }
}

impl ChatRelay {
    pub fn new(
        persona: Arc<PersonaConfig>,
        upstream: Option<UpstreamClients>,
        upstream_timeout: Duration
    ) -> Self {
        Self { persona, upstream, upstream_timeout }
    }

    /// Builds the Gemini-backed relay. A missing key yields a relay that answers every chat with a 500.
    pub fn from_args(
        args: &Args,
        persona: Arc<PersonaConfig>
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let timeout = Duration::from_secs(args.upstream_timeout_secs.max(1));

        let Some(api_key) = args.api_key() else {
            warn!("GOOGLE_API_KEY is not set. Chat requests will fail until it is configured.");
            return Ok(Self::new(persona, None, timeout));
        };

        let chat_config = LlmConfig {
            api_key: Some(api_key.clone()),
            completion_model: Some(args.chat_model.clone()),
            speech_model: None,
            base_url: args.chat_base_url.clone(),
            timeout,
        };
        let chat = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Model={}, BaseURL={:?}",
            chat.get_model(),
            chat_config.base_url.as_deref().unwrap_or("adapter default")
        );

        let speech_config = LlmConfig {
            api_key: Some(api_key),
            completion_model: None,
            speech_model: Some(args.speech_model.clone()),
            base_url: Some(args.speech_base_url.clone()),
            timeout,
        };
        let speech = new_speech_client(&speech_config)?;
        info!(
            "Speech client configured: Model={}, Voice={}, BaseURL={}",
            args.speech_model,
            persona.voice.voice_name,
            args.speech_base_url
        );

        Ok(Self::new(persona, Some(UpstreamClients { chat, speech }), timeout))
    }

    pub fn persona(&self) -> &PersonaConfig {
        &self.persona
    }

    pub fn is_configured(&self) -> bool {
        self.upstream.is_some()
    }

    pub async fn respond(&self, request: ChatRequest) -> Result<ChatResponse, RelayError> {
        let request_id = Uuid::new_v4();
        let upstream = self.upstream.as_ref().ok_or_else(|| {
            error!("[{}] Rejecting chat request: upstream API key is missing", request_id);
            RelayError::MissingCredential
        })?;

        if request.message.trim().is_empty() {
            warn!("[{}] Rejecting chat request with empty message", request_id);
            return Err(RelayError::EmptyMessage);
        }

        let received = request.history.len();
        let history = normalize_history(request.history);
        if history.len() != received {
            debug!(
                "[{}] Dropped {} leading assistant or empty turn(s) from history",
                request_id,
                received - history.len()
            );
        }
        info!("[{}] Chat request received (history_turns={})", request_id, history.len());

        let completion = bounded(
            self.upstream_timeout,
            upstream.chat.generate(&self.persona.system_instruction, &history, &request.message)
        ).await.map_err(|e| {
            error!("[{}] Text generation failed: {:?}", request_id, e);
            RelayError::Generation(e)
        })?;
        let response_text = completion.response;

        let audio = self.synthesize(upstream, &response_text, request_id).await.into_audio();
        info!(
            "[{}] Chat response ready (chars={}, audio={})",
            request_id,
            response_text.len(),
            audio.is_some()
        );

        Ok(ChatResponse { response_text, audio })
    }

    async fn synthesize(
        &self,
        upstream: &UpstreamClients,
        text: &str,
        request_id: Uuid
    ) -> SpeechOutcome {
        let outcome = match
            bounded(self.upstream_timeout, upstream.speech.synthesize(text, &self.persona.voice)).await
        {
            Ok(Some(audio)) => SpeechOutcome::Ready(audio),
            Ok(None) => SpeechOutcome::Unavailable("response carried no inline audio".to_string()),
            Err(e) => SpeechOutcome::Unavailable(format!("{:?}", e)),
        };

        if let SpeechOutcome::Unavailable(reason) = &outcome {
            warn!("[{}] Speech synthesis unavailable, replying text-only: {}", request_id, reason);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::persona::{ VoiceConfig, DEFAULT_PERSONA };
    use crate::llm::chat::CompletionResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct GenerateCall {
        system_prompt: String,
        history: Vec<ConversationTurn>,
        message: String,
    }

    #[derive(Default)]
    struct StubChat {
        fail: bool,
        delay: Option<Duration>,
        calls: Mutex<Vec<GenerateCall>>,
    }

    #[async_trait]
    impl ChatClient for StubChat {
        async fn generate(
            &self,
            system_prompt: &str,
            history: &[ConversationTurn],
            message: &str
        ) -> Result<CompletionResponse, LlmError> {
            self.calls.lock().unwrap().push(GenerateCall {
                system_prompt: system_prompt.to_string(),
                history: history.to_vec(),
                message: message.to_string(),
            });
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(LlmError::Status { status: 429, body: "quota".into() });
            }
            Ok(CompletionResponse { response: format!("echo: {}", message) })
        }

        fn get_model(&self) -> String {
            "stub".into()
        }
    }

    #[derive(Default)]
    struct StubSpeech {
        fail: bool,
        silent: bool,
        delay: Option<Duration>,
        calls: Mutex<Vec<(String, VoiceConfig)>>,
    }

    #[async_trait]
    impl SpeechClient for StubSpeech {
        async fn synthesize(
            &self,
            text: &str,
            voice: &VoiceConfig
        ) -> Result<Option<InlineAudio>, LlmError> {
            self.calls.lock().unwrap().push((text.to_string(), voice.clone()));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(LlmError::MalformedResponse("no candidates".into()));
            }
            if self.silent {
                return Ok(None);
            }
            Ok(Some(InlineAudio { data: "AAAA".into(), mime_type: "audio/L16;rate=24000".into() }))
        }
    }

    fn relay(chat: Arc<StubChat>, speech: Arc<StubSpeech>) -> ChatRelay {
        ChatRelay::new(
            Arc::clone(&DEFAULT_PERSONA),
            Some(UpstreamClients { chat, speech }),
            Duration::from_secs(5)
        )
    }

    fn request(message: &str, history: Vec<ConversationTurn>) -> ChatRequest {
        ChatRequest { message: message.to_string(), history }
    }

    #[tokio::test]
    async fn returns_text_and_audio_on_success() {
        let chat = Arc::new(StubChat::default());
        let speech = Arc::new(StubSpeech::default());
        let resp = relay(chat.clone(), speech.clone()).respond(request("hello", vec![])).await.unwrap();

        assert_eq!(resp.response_text, "echo: hello");
        assert_eq!(resp.audio.unwrap().mime_type, "audio/L16;rate=24000");
        let speech_calls = speech.calls.lock().unwrap();
        assert_eq!(speech_calls.len(), 1);
        assert_eq!(speech_calls[0].0, "echo: hello");
    }

    #[tokio::test]
    async fn speech_failure_degrades_to_text_only() {
        let chat = Arc::new(StubChat::default());
        let speech = Arc::new(StubSpeech { fail: true, ..Default::default() });
        let resp = relay(chat, speech).respond(request("hello", vec![])).await.unwrap();

        assert_eq!(resp.response_text, "echo: hello");
        assert_eq!(resp.audio, None);
    }

    #[tokio::test]
    async fn speech_without_inline_audio_is_text_only() {
        let chat = Arc::new(StubChat::default());
        let speech = Arc::new(StubSpeech { silent: true, ..Default::default() });
        let resp = relay(chat, speech).respond(request("hello", vec![])).await.unwrap();
        assert_eq!(resp.audio, None);
    }

    #[tokio::test]
    async fn generation_failure_is_fatal_and_skips_speech() {
        let chat = Arc::new(StubChat { fail: true, ..Default::default() });
        let speech = Arc::new(StubSpeech::default());
        let err = relay(chat, speech.clone()).respond(request("hello", vec![])).await.unwrap_err();

        assert!(matches!(err, RelayError::Generation(LlmError::Status { status: 429, .. })));
        assert!(speech.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn slow_generation_times_out() {
        let chat = Arc::new(StubChat { delay: Some(Duration::from_secs(10)), ..Default::default() });
        let speech = Arc::new(StubSpeech::default());
        let relay = ChatRelay::new(
            Arc::clone(&DEFAULT_PERSONA),
            Some(UpstreamClients { chat, speech }),
            Duration::from_millis(20)
        );

        let err = relay.respond(request("hello", vec![])).await.unwrap_err();
        assert!(matches!(err, RelayError::Generation(LlmError::Timeout(_))));
    }

    #[tokio::test]
    async fn slow_speech_times_out_into_text_only_reply() {
        let chat = Arc::new(StubChat::default());
        let speech = Arc::new(StubSpeech { delay: Some(Duration::from_secs(10)), ..Default::default() });
        let relay = ChatRelay::new(
            Arc::clone(&DEFAULT_PERSONA),
            Some(UpstreamClients { chat, speech: speech.clone() }),
            Duration::from_millis(50)
        );

        let resp = relay.respond(request("hello", vec![])).await.unwrap();
        assert_eq!(resp.response_text, "echo: hello");
        assert_eq!(resp.audio, None);
        assert_eq!(speech.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn message_is_forwarded_verbatim() {
        let chat = Arc::new(StubChat::default());
        let speech = Arc::new(StubSpeech::default());
        relay(chat.clone(), speech).respond(request("  what are your rates?\n", vec![])).await.unwrap();

        assert_eq!(chat.calls.lock().unwrap()[0].message, "  what are your rates?\n");
    }

    #[tokio::test]
    async fn missing_credential_fails_without_upstream_calls() {
        let relay = ChatRelay::new(Arc::clone(&DEFAULT_PERSONA), None, Duration::from_secs(5));
        assert!(!relay.is_configured());
        let err = relay.respond(request("hello", vec![])).await.unwrap_err();
        assert!(matches!(err, RelayError::MissingCredential));
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_generation() {
        let chat = Arc::new(StubChat::default());
        let speech = Arc::new(StubSpeech::default());
        let err = relay(chat.clone(), speech).respond(request("   ", vec![])).await.unwrap_err();

        assert!(matches!(err, RelayError::EmptyMessage));
        assert!(chat.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn forwards_history_then_message_with_persona() {
        let chat = Arc::new(StubChat::default());
        let speech = Arc::new(StubSpeech::default());
        relay(chat.clone(), speech)
            .respond(request("there", vec![ConversationTurn::user("hi")])).await
            .unwrap();

        let calls = chat.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], GenerateCall {
            system_prompt: DEFAULT_PERSONA.system_instruction.clone(),
            history: vec![ConversationTurn::user("hi")],
            message: "there".into(),
        });
    }

    #[tokio::test]
    async fn leading_greeting_is_stripped_before_generation() {
        let chat = Arc::new(StubChat::default());
        let speech = Arc::new(StubSpeech::default());
        let history = vec![
            ConversationTurn::model("Hello! I am Karen."),
            ConversationTurn::user("hi"),
            ConversationTurn::model("hey"),
        ];
        relay(chat.clone(), speech).respond(request("rates?", history)).await.unwrap();

        let calls = chat.calls.lock().unwrap();
        assert_eq!(calls[0].history, vec![ConversationTurn::user("hi"), ConversationTurn::model("hey")]);
    }

    #[tokio::test]
    async fn persona_and_voice_are_stable_across_calls() {
        let chat = Arc::new(StubChat::default());
        let speech = Arc::new(StubSpeech::default());
        let relay = relay(chat.clone(), speech.clone());
        relay.respond(request("same", vec![])).await.unwrap();
        relay.respond(request("same", vec![])).await.unwrap();

        let chat_calls = chat.calls.lock().unwrap();
        assert_eq!(chat_calls[0], chat_calls[1]);
        let speech_calls = speech.calls.lock().unwrap();
        assert_eq!(speech_calls[0], speech_calls[1]);
        assert_eq!(speech_calls[0].1.voice_name, "Aoede");
    }

    #[test]
    fn normalize_keeps_order_after_first_user_turn() {
        let history = vec![
            ConversationTurn::model("greeting"),
            ConversationTurn::model("another"),
            ConversationTurn::user(""),
            ConversationTurn::user("a"),
            ConversationTurn::model("b"),
            ConversationTurn::user("c"),
        ];
        assert_eq!(normalize_history(history), vec![
            ConversationTurn::user("a"),
            ConversationTurn::model("b"),
            ConversationTurn::user("c"),
        ]);
        assert!(normalize_history(vec![ConversationTurn::model("only")]).is_empty());
    }
}
