//! paintbot - Telegram image generation bot
//!
//! Relays chat commands to external generation services:
//! - `/image` - DeepSeek expands the prompt, then SDXL renders it via the
//!   Cloudflare AI Gateway
//! - `/flux` - FLUX renders the raw prompt via an OpenAI-compatible endpoint

pub mod bot;
pub mod config;
pub mod images;
pub mod openai;
