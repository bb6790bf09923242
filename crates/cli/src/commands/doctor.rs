//! `toneshift doctor`: Diagnose configuration, storage and the generation endpoint.

use toneshift_config::AppConfig;
use toneshift_core::Store;
use toneshift_core::generation::Generator;
use toneshift_providers::OllamaGenerator;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("ToneShift Doctor: System Diagnostics");
    println!("====================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file, using defaults: run `toneshift onboard`");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config and re-run doctor.");
            return Ok(());
        }
    };

    match toneshift_gateway::open_store(&config.storage).await {
        Ok(store) => println!("  ✅ Storage ready ({})", store.name()),
        Err(e) => {
            println!("  ❌ Storage unavailable: {e}");
            issues += 1;
        }
    }

    let generator = OllamaGenerator::from_config(&config.generation)?;
    match generator.health_check().await {
        Ok(true) => println!("  ✅ Generation endpoint reachable at {}", generator.base_url()),
        Ok(false) | Err(_) => {
            println!(
                "  ❌ Generation endpoint unreachable at {}: is Ollama running?",
                generator.base_url()
            );
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
