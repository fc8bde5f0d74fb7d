//! FLUX image generation
//!
//! The FLUX provider is an OpenAI-compatible chat endpoint that answers
//! with text containing a link to the rendered image.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use super::ImageGenError;
use crate::openai::{ChatClient, ChatMessage, ChatOptions};

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s)]+").unwrap());

/// Pull the first http(s) URL out of the reply text
fn extract_url(text: &str) -> Option<Url> {
    let raw = URL_REGEX.find(text)?.as_str();
    Url::parse(raw).ok()
}

/// Generate an image via FLUX and return its URL
///
/// Issues exactly one chat request; the URL is forwarded unaltered.
pub async fn generate_flux_url(
    client: &ChatClient,
    prompt: &str,
) -> Result<Url, ImageGenError> {
    let text = client
        .chat(vec![ChatMessage::user(prompt)], ChatOptions::default())
        .await?;

    debug!("FLUX reply: {}", text);

    extract_url(&text).ok_or_else(|| {
        let preview: String = text.chars().take(200).collect();
        ImageGenError::MissingUrl(preview)
    })
}
