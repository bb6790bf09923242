//! `toneshift generate`: One-off generation from the terminal.
//!
//! Uses an in-memory store seeded with the system tones, so only the
//! built-in tone parameters apply.

use std::sync::Arc;
use toneshift_config::AppConfig;
use toneshift_engine::{ServiceSettings, ToneService};
use toneshift_providers::OllamaGenerator;
use toneshift_store::InMemoryStore;

const CLI_USER: &str = "cli";

pub async fn run(message: String, tones: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let store = Arc::new(InMemoryStore::new());
    toneshift_engine::seed_system_tones(&*store).await?;
    let generator = Arc::new(OllamaGenerator::from_config(&config.generation)?);
    let service = ToneService::new(store, generator, ServiceSettings::from_config(&config));

    if let [tone] = tones.as_slice() {
        let reply = service.generate_tone_response(CLI_USER, &message, tone, None).await?;
        println!("{reply}");
        return Ok(());
    }

    let replies = service
        .generate_multiple_tone_responses(CLI_USER, &message, Some(&tones), None)
        .await?;
    for (tone, reply) in replies {
        println!("── {tone} ──");
        println!("{reply}\n");
    }

    Ok(())
}
