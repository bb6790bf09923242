//! `toneshift seed-tones`: Insert the built-in tones into the database.

use toneshift_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = toneshift_gateway::open_store(&config.storage).await?;

    let inserted = toneshift_engine::seed_system_tones(&*store).await?;
    if inserted == 0 {
        println!("  System tones already present, nothing to do");
    } else {
        println!("✅ Seeded {inserted} system tones into {}", config.storage.path);
    }

    Ok(())
}
