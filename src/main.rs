//! paintbot - Telegram image generation bot daemon

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use teloxide::Bot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paintbot::bot::{self, Services};
use paintbot::config::Config;

/// Telegram image generation bot
#[derive(Parser, Debug)]
#[command(name = "paintbot", version, about = "Telegram image generation bot")]
struct Args {
    /// Path to the provider configuration file
    #[arg(short, long, default_value = "api_config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up .env before reading the environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paintbot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Configuration problems are fatal before any command can be handled
    let config = Config::load(&args.config)?;
    let services = Services::from_config(&config)?;

    let bot = Bot::new(&config.telegram_token);
    bot::run(bot, services).await;

    Ok(())
}
