use crate::audio;
use crate::cli::Args;
use crate::config::persona::PersonaConfig;
use crate::llm::LlmConfig;
use crate::llm::speech::{ SpeechClient, new_client as new_speech_client };
use log::{ info, warn };
use std::error::Error;
use std::fs;
use std::time::Duration;

/// One synthesis round trip against the configured speech model, for checking keys and voices.
pub async fn run_tts_check(
    args: &Args,
    persona: &PersonaConfig
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let api_key = args.api_key().ok_or("GOOGLE_API_KEY must be set to run the TTS check")?;
    let config = LlmConfig {
        api_key: Some(api_key),
        completion_model: None,
        speech_model: Some(args.speech_model.clone()),
        base_url: Some(args.speech_base_url.clone()),
        timeout: Duration::from_secs(args.upstream_timeout_secs.max(1)),
    };
    let client = new_speech_client(&config)?;
    check_with(client.as_ref(), args, persona).await
}

pub async fn check_with(
    client: &dyn SpeechClient,
    args: &Args,
    persona: &PersonaConfig
) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("Testing TTS generation with voice '{}'...", persona.voice.voice_name);
    let Some(inline) = client.synthesize(&args.tts_check_text, &persona.voice).await? else {
        warn!("TTS call succeeded but no audio data was found in the response.");
        return Ok(());
    };
    info!("Audio data present ({} base64 chars, {}).", inline.data.len(), inline.mime_type);

    if let Some(path) = &args.tts_check_out {
        let (bytes, mime_type) = audio::to_playable(&inline)?;
        fs::write(path, &bytes).map_err(|e| format!("Failed to write TTS check audio to '{}': {}", path, e))?;
        info!("Wrote {} bytes of {} to {}", bytes.len(), mime_type, path);
    }
    Ok(())
}
