use once_cell::sync::Lazy;
use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use log::info;

const DEFAULT_VOICE_NAME: &str = "Aoede";

const KAREN_SYSTEM_INSTRUCTION: &str = r#"You are "Karen", Hashintha Nishsanka's witty and efficient AI Assistant.

Persona:
- Name: Karen.
- Tone: Professional but slightly witty, confident, and very efficient. Think "advanced digital concierge".
- Key Trait: You answer questions directly and concisely. You don't fluff things up.

Context:
- Hashintha is a Full Stack Developer (Next.js, Node.js, AI Agents, Blockchain).
- He creates premium digital experiences.

Pricing:
- Small Web Apps: Up to $500.
- SaaS / AI Platforms: Starting from $1000.
- For custom quotes: Cost and timeline depend on the specific project requirements. Encourage them to reach out for a personalized estimate.

Contact:
- Email: hashinthaun@gmail.com

Goal:
- Impress the visitor with your speed and clarity.
- Guide them to contact Hashintha via email (hashinthaun@gmail.com) if they are interested in working together.

IMPORTANT: Your response is read aloud.
- Use plain text ONLY.
- Do NOT use markdown (no *asterisks*, no **bold**, no bullet points).
- Keep it conversational and punchy."#;

pub static DEFAULT_PERSONA: Lazy<Arc<PersonaConfig>> = Lazy::new(|| {
    Arc::new(PersonaConfig {
        name: "Karen".to_string(),
        system_instruction: KAREN_SYSTEM_INSTRUCTION.to_string(),
        voice: VoiceConfig::default(),
        greeting: Some(
            "Hello! I am Karen, Hashintha's personal AI Assistant. How can I assist you today?".to_string()
        ),
    })
});

#[derive(Debug)]
pub enum PersonaError {
    MissingField(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PersonaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonaError::MissingField(field) => write!(f, "Persona field '{}' must not be empty", field),
            PersonaError::IoError(e) => write!(f, "Persona file IO error: {}", e),
            PersonaError::JsonError(e) => write!(f, "Persona JSON parsing error: {}", e),
        }
    }
}

impl Error for PersonaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PersonaError::IoError(e) => Some(e),
            PersonaError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PersonaError {
    fn from(err: std::io::Error) -> Self {
        PersonaError::IoError(err)
    }
}

impl From<serde_json::Error> for PersonaError {
    fn from(err: serde_json::Error) -> Self {
        PersonaError::JsonError(err)
    }
}

/// Prebuilt voice passed to every speech synthesis call.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VoiceConfig {
    pub voice_name: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self { voice_name: DEFAULT_VOICE_NAME.to_string() }
    }
}

/// The assistant's fixed identity. Loaded once at startup and shared read-only.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PersonaConfig {
    pub name: String,
    pub system_instruction: String,
    #[serde(default)]
    pub voice: VoiceConfig,
    /// Static opening line the UI shows before the first turn. Never sent upstream.
    #[serde(default)]
    pub greeting: Option<String>,
}

impl PersonaConfig {
    fn validate(&self) -> Result<(), PersonaError> {
        if self.system_instruction.trim().is_empty() {
            return Err(PersonaError::MissingField("system_instruction".to_string()));
        }
        if self.voice.voice_name.trim().is_empty() {
            return Err(PersonaError::MissingField("voice.voice_name".to_string()));
        }
        Ok(())
    }

    pub fn with_voice_name(mut self, voice_name: &str) -> Self {
        self.voice.voice_name = voice_name.to_string();
        self
    }
}

pub fn load_persona<P: AsRef<Path>>(path: P) -> Result<Arc<PersonaConfig>, PersonaError> {
    let file_content = fs::read_to_string(&path)?;
    let config: PersonaConfig = serde_json::from_str(&file_content)?;
    config.validate()?;
    info!("Loaded persona '{}' from {}", config.name, path.as_ref().display());
    Ok(Arc::new(config))
}

/// Picks the persona for this process: a file when given, the built-in one otherwise,
/// with an optional voice override applied on top.
pub fn resolve_persona(
    path: Option<&str>,
    voice_override: Option<&str>
) -> Result<Arc<PersonaConfig>, PersonaError> {
    let persona = match path {
        Some(p) if !p.trim().is_empty() => load_persona(p)?,
        _ => Arc::clone(&DEFAULT_PERSONA),
    };

    match voice_override.map(str::trim).filter(|v| !v.is_empty()) {
        Some(voice) => Ok(Arc::new((*persona).clone().with_voice_name(voice))),
        None => Ok(persona),
    }
}
