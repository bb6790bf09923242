//! ToneShift CLI, the main entry point.
//!
//! Commands:
//! - `onboard`     Write a default config to `~/.toneshift/config.toml`
//! - `serve`       Start the REST API server
//! - `seed-tones`  Insert the built-in tones into the database
//! - `generate`    Generate replies from the terminal
//! - `doctor`      Diagnose config, storage and the generation endpoint

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "toneshift",
    about = "ToneShift: tone-shifted messaging backend",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Start the REST API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Keep everything in memory instead of SQLite
        #[arg(long)]
        memory: bool,
    },

    /// Seed the built-in system tones (no-op when already seeded)
    SeedTones,

    /// Generate replies to a message in one or more tones
    Generate {
        /// The message to reply to
        message: String,

        /// Tone name; repeat for several. Defaults to the configured fallback tones
        #[arg(short, long = "tone")]
        tones: Vec<String>,
    },

    /// Diagnose system health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Serve { port, memory } => commands::serve::run(port, memory).await?,
        Commands::SeedTones => commands::seed_tones::run().await?,
        Commands::Generate { message, tones } => commands::generate::run(message, tones).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
