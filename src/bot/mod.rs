//! Telegram bot - command dispatch and replies
//!
//! Each incoming command is handled to completion, including both outbound
//! API calls, before the reply goes out. No state is kept between messages.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{BotCommand as MenuCommand, InputFile};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::images::{self, GatewayClient, ImageGenError};
use crate::openai::ChatClient;

const HELP_TEXT: &str = "This is an image generation bot.\n\n\
    Commands:\n\
    /image <prompt> - SDXL (prompt auto-refined by DeepSeek)\n\
    /flux <prompt> - FLUX\n\n\
    Examples:\n\
    /image abstract ocean 16:9\n\
    /flux cyberpunk city night, neon, rain";

const USAGE_IMAGE: &str = "Usage: /image <prompt> (e.g. /image abstract ocean 16:9)";
const USAGE_FLUX: &str = "Usage: /flux <prompt> (e.g. /flux cute dog, watercolor)";

/// Caption length cap for the expanded prompt
const CAPTION_PROMPT_CHARS: usize = 120;

/// Shared API clients for the handlers
pub struct Services {
    /// DeepSeek prompt expansion
    pub expander: ChatClient,
    /// FLUX provider
    pub flux: ChatClient,
    /// Cloudflare gateway (SDXL)
    pub gateway: GatewayClient,
}

impl Services {
    /// Build all clients from the loaded configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            expander: ChatClient::new(&config.deepseek)?,
            flux: ChatClient::new(&config.flux)?,
            gateway: GatewayClient::new(&config.gateway)?,
        })
    }
}

/// A parsed bot command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start` - help text
    Start,
    /// `/image <prompt>` - SDXL generation
    Image(String),
    /// `/flux <prompt>` - FLUX generation
    Flux(String),
}

/// Parse the leading token of a message.
///
/// Returns `None` for plain text and unrecognized commands; those are
/// ignored without any outbound call. An `@BotName` suffix on the command
/// is accepted. An empty prompt argument comes back as an empty string so
/// the handler can report a usage error.
pub fn parse_command(text: &str) -> Option<Command> {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let head = parts.next()?;
    let rest = parts.next().unwrap_or("").trim();

    let name = head.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);

    match name {
        "start" => Some(Command::Start),
        "image" => Some(Command::Image(rest.to_string())),
        "flux" => Some(Command::Flux(rest.to_string())),
        _ => None,
    }
}

/// Run long polling until shutdown (ctrl-c)
pub async fn run(bot: Bot, services: Services) {
    reset_menu(&bot).await;

    let handler = Update::filter_message().endpoint(handle_message);

    info!("Bot polling started");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![Arc::new(services)])
        .default_handler(|_upd| async {})
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot polling stopped");
}

/// Reset the bot command menu
async fn reset_menu(bot: &Bot) {
    let commands = vec![
        MenuCommand::new("start", "Help and usage"),
        MenuCommand::new("image", "Generate an image with SDXL: /image <prompt>"),
        MenuCommand::new("flux", "Generate an image with FLUX: /flux <prompt>"),
    ];

    match bot.set_my_commands(commands).await {
        Ok(_) => info!("Bot menu (commands) reset"),
        Err(e) => warn!("Failed to reset bot menu: {}", e),
    }
}

/// Central message handler
async fn handle_message(
    bot: Bot,
    msg: Message,
    services: Arc<Services>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let Some(command) = parse_command(text) else {
        return Ok(());
    };

    match command {
        Command::Start => {
            bot.send_message(msg.chat.id, HELP_TEXT).await?;
        }
        Command::Image(prompt) if prompt.is_empty() => {
            bot.send_message(msg.chat.id, USAGE_IMAGE).await?;
        }
        Command::Flux(prompt) if prompt.is_empty() => {
            bot.send_message(msg.chat.id, USAGE_FLUX).await?;
        }
        Command::Image(prompt) => handle_image(&bot, &msg, &services, &prompt).await?,
        Command::Flux(prompt) => handle_flux(&bot, &msg, &services, &prompt).await?,
    }

    Ok(())
}

/// Handle `/image`: expand the prompt, render with SDXL, reply with bytes
async fn handle_image(
    bot: &Bot,
    msg: &Message,
    services: &Services,
    prompt: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let chat_id = msg.chat.id;
    info!("/image chat={} prompt={:?}", chat_id.0, prompt);

    // Best-effort status message, deleted once the reply is out
    let thinking = bot.send_message(chat_id, "Drawing (SDXL)...").await.ok();

    let result = generate_sdxl_reply(services, prompt).await;

    match result {
        Ok((caption, image)) => {
            let photo = InputFile::memory(image.data).file_name("image.png");
            if let Err(e) = bot.send_photo(chat_id, photo).caption(caption).await {
                error!("Failed to send photo: {}", e);
                send_failure(bot, chat_id, &e.to_string()).await;
            }
        }
        Err(e) => {
            error!("/image failed: {}", e);
            send_failure(bot, chat_id, &e.to_string()).await;
        }
    }

    if let Some(thinking) = thinking {
        bot.delete_message(chat_id, thinking.id).await.ok();
    }

    Ok(())
}

/// The two-step SDXL chain: expansion, then gateway render
async fn generate_sdxl_reply(
    services: &Services,
    prompt: &str,
) -> Result<(String, images::GeneratedImage), ImageGenError> {
    let expanded = images::expand_prompt(&services.expander, prompt).await?;
    let image = services
        .gateway
        .generate_sdxl(&expanded.text, expanded.width, expanded.height)
        .await?;

    let caption = format!(
        "SDXL | {}x{} | {}",
        expanded.width,
        expanded.height,
        truncate_chars(&expanded.text, CAPTION_PROMPT_CHARS)
    );
    Ok((caption, image))
}

/// Handle `/flux`: render with FLUX, reply with the image URL
async fn handle_flux(
    bot: &Bot,
    msg: &Message,
    services: &Services,
    prompt: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let chat_id = msg.chat.id;
    info!("/flux chat={} prompt={:?}", chat_id.0, prompt);

    let thinking = bot.send_message(chat_id, "Drawing (FLUX)...").await.ok();

    match images::generate_flux_url(&services.flux, prompt).await {
        Ok(url) => {
            let photo = InputFile::url(url);
            if let Err(e) = bot.send_photo(chat_id, photo).caption("FLUX").await {
                error!("Failed to send photo: {}", e);
                send_failure(bot, chat_id, &e.to_string()).await;
            }
        }
        Err(e) => {
            error!("/flux failed: {}", e);
            send_failure(bot, chat_id, &e.to_string()).await;
        }
    }

    if let Some(thinking) = thinking {
        bot.delete_message(chat_id, thinking.id).await.ok();
    }

    Ok(())
}

async fn send_failure(bot: &Bot, chat_id: ChatId, detail: &str) {
    bot.send_message(chat_id, format!("Image generation failed: {}", detail))
        .await
        .ok();
}

/// Truncate to at most `limit` characters on a char boundary
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
