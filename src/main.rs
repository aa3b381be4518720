//! Skyframe command line.
//!
//! Reads configuration from `--config`, `~/.config/skyframe/config.toml` or
//! `./config.toml`, and API keys from the environment (a `.env` file is
//! loaded first when present).
//!
//! ```sh
//! # Print the prompt the current weather would produce
//! skyframe prompt --target wallpaper
//!
//! # Update every target once
//! skyframe once
//!
//! # Update every target on the configured interval
//! skyframe run
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use skyframe::logging::init_logging;
use skyframe::{
    Credentials, PromptPreview, PromptService, SkyframeConfig, SkyframeError, UpdateService,
};

#[derive(Parser)]
#[command(name = "skyframe", version, about)]
struct Cli {
    /// Configuration file to use instead of the default locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of the configured level.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Derive and print a prompt without generating anything.
    Prompt {
        /// Target whose location and profile to use. Defaults to the first.
        #[arg(long)]
        target: Option<String>,

        /// Sampling seed. Defaults to the configured seed source.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Generate and publish one image per target, then exit.
    Once,
    /// Keep updating every target on the configured interval.
    Run,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        match err.downcast_ref::<SkyframeError>() {
            Some(cause) => eprintln!("Error: {}\n{err:#}", cause.user_message()),
            None => eprintln!("Error: {err:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = SkyframeConfig::load_from_path(cli.config)?;
    init_logging(&config.logging, cli.verbose);
    let credentials = Credentials::from_env();

    match cli.command {
        Command::Prompt { target, seed } => {
            let service = PromptService::from_config(config, &credentials)?;
            let target = match target {
                Some(name) => service.config().target(&name)?.clone(),
                None => service
                    .config()
                    .targets
                    .first()
                    .cloned()
                    .context("No targets configured")?,
            };
            let preview = service.preview(&target, Utc::now(), seed).await?;
            print_preview(&preview);
        }
        Command::Once => {
            let service = UpdateService::from_config(config, &credentials)?;
            let total = service.config().targets.len();
            let updated = service.update_all(Utc::now()).await;
            info!("{} of {} targets updated", updated, total);
            if updated < total {
                anyhow::bail!("{} of {} targets failed", total - updated, total);
            }
        }
        Command::Run => {
            let service = UpdateService::from_config(config, &credentials)?;
            service.run_scheduled().await?;
        }
    }

    Ok(())
}

fn print_preview(preview: &PromptPreview) {
    println!("Target:   {}", preview.target);
    println!(
        "Location: {} ({})",
        preview.location.name,
        preview.location.format_coordinates()
    );
    println!("Time:     {}", preview.local_time.format("%Y-%m-%d %H:%M %Z"));
    println!(
        "Weather:  {} at {:.1}°C",
        preview.observation.condition.as_str(),
        preview.observation.temperature_celsius()
    );
    println!("Seed:     {}", preview.seed);
    println!();
    println!("Prompt:\n{}", preview.prompt.positive);
    println!();
    println!("Negative prompt:\n{}", preview.prompt.negative);
}
