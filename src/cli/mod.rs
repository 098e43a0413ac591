use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Upstream Credentials ---
    /// API key for the Google generative language API. Left empty, every chat request fails with a 500.
    #[arg(long, env = "GOOGLE_API_KEY", default_value = "", hide_env_values = true)]
    pub chat_api_key: String,

    // --- Text Generation Args ---
    /// Model used to generate the assistant's reply
    #[arg(long, env = "CHAT_MODEL", default_value = "gemini-2.5-flash")]
    pub chat_model: String,

    /// Base URL for the text generation API
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let the backend pick its own
    pub chat_base_url: Option<String>,

    // --- Speech Synthesis Args ---
    /// Model used to synthesize audio for the reply
    #[arg(long, env = "SPEECH_MODEL", default_value = "gemini-2.5-flash-preview-tts")]
    pub speech_model: String,

    /// Base URL for the speech synthesis API (everything before `/models/...`)
    #[arg(
        long,
        env = "SPEECH_BASE_URL",
        default_value = "https://generativelanguage.googleapis.com/v1beta"
    )]
    pub speech_base_url: String,

    /// Prebuilt voice name. Overrides the voice from the persona.
    #[arg(long, env = "VOICE_NAME")]
    pub voice_name: Option<String>,

    // --- Persona Args ---
    /// Optional path to a persona JSON file. The built-in Karen persona is used when unset.
    #[arg(long, env = "PERSONA_PATH")]
    pub persona_path: Option<String>,

    /// Hard timeout in seconds applied to each upstream call.
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value = "30")]
    pub upstream_timeout_secs: u64,

    // --- Server Args ---
    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:3000")]
    pub server_addr: String,

    /// Maximum accepted request body size in bytes.
    #[arg(long, env = "MAX_BODY_BYTES", default_value = "262144")]
    pub max_body_bytes: usize,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    // --- TTS Check Args ---
    /// Run a single speech synthesis call, report the result and exit without serving.
    #[arg(long, env = "TTS_CHECK", default_value = "false")]
    pub tts_check: bool,

    /// Text synthesized by --tts-check.
    #[arg(long, env = "TTS_CHECK_TEXT", default_value = "Hello, this is a test.")]
    pub tts_check_text: String,

    /// Where --tts-check writes the audio it received. Raw PCM is wrapped as WAV.
    #[arg(long, env = "TTS_CHECK_OUT")]
    pub tts_check_out: Option<String>,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}

impl Args {
    pub fn api_key(&self) -> Option<String> {
        let key = self.chat_api_key.trim();
        if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }
}
