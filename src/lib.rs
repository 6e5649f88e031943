pub mod agent;
pub mod cli;
pub mod config;
pub mod generator;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod server;

use agent::{ provider_configs, Companion };
use cli::Args;
use llm::normalize_api_key;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

fn configured(key: &str) -> &'static str {
    if normalize_api_key(key).is_some() { "configured" } else { "missing" }
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let providers = provider_configs(&args)?
        .iter()
        .map(|c| c.llm_type.label())
        .collect::<Vec<_>>();

    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Provider Order: {}", if providers.is_empty() { "none".to_string() } else { providers.join(" -> ") });
    info!("OpenAI Key: {} (model {})", configured(&args.openai_api_key), args.openai_model);
    info!("Gemini Key: {} (model {})", configured(&args.gemini_api_key), args.gemini_model);
    info!("ElevenLabs Key: {}", configured(&args.elevenlabs_api_key));
    info!("Image Endpoint: {}", args.image_endpoint);
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("built-in"));
    info!("Rate Limit: {} req/s", args.rate_limit_per_second);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let companion = Arc::new(Companion::new(&args)?);
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, companion, args.server_api_key.clone(), args.clone());
    server.run().await?;

    Ok(())
}
