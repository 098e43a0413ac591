pub mod audio;
pub mod cli;
pub mod config;
pub mod llm;
pub mod models;
pub mod tts_check;
pub mod relay;
pub mod server;

use cli::Args;
use config::persona::resolve_persona;
use log::info;
use relay::ChatRelay;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let persona = resolve_persona(args.persona_path.as_deref(), args.voice_name.as_deref())?;

    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("API Key Present: {}", args.api_key().is_some());
    info!("Chat Model: {}", args.chat_model);
    info!("Speech Model: {}", args.speech_model);
    info!("Persona: {} (voice: {})", persona.name, persona.voice.voice_name);
    info!("Persona Source: {}", args.persona_path.as_deref().unwrap_or("built-in"));
    info!("Upstream Timeout: {}s", args.upstream_timeout_secs);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    if args.tts_check {
        return tts_check::run_tts_check(&args, &persona).await;
    }

    let relay = Arc::new(ChatRelay::from_args(&args, persona)?);
    let server = Server::new(relay, args);
    server.run().await?;

    Ok(())
}
