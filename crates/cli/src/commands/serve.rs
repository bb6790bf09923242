//! `toneshift serve`: Start the REST API server.

use toneshift_config::AppConfig;

pub async fn run(port_override: Option<u16>, memory: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if memory {
        config.storage.backend = "memory".into();
    }

    println!("ToneShift Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {} @ {}", config.generation.model, config.generation.api_url);
    println!("   Storage:   {}", config.storage.backend);

    toneshift_gateway::start(config).await?;

    Ok(())
}
