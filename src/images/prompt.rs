//! Prompt expansion for SDXL
//!
//! Two-step pipeline, step one: a short user request is rewritten by the
//! DeepSeek provider into a single vivid English prompt sized for the
//! target aspect ratio.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::ImageGenError;
use crate::openai::{ChatClient, ChatMessage, ChatOptions};

/// Explicit ratio token like "16:9" or "4 / 3"
static RATIO_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+\s*[:/]\s*\d+\b").unwrap());

/// An expanded prompt with its target dimensions
#[derive(Debug, Clone)]
pub struct ExpandedPrompt {
    pub text: String,
    pub width: u32,
    pub height: u32,
}

/// Detect an aspect-ratio token in the text. Defaults to 1024x1024.
pub fn pick_size(text: &str) -> (u32, u32) {
    let t = text.to_lowercase().replace(' ', "");
    if t.contains("16:9") || t.contains("16/9") {
        return (1024, 576);
    }
    if t.contains("9:16") || t.contains("9/16") {
        return (576, 1024);
    }
    if t.contains("4:3") || t.contains("4/3") {
        return (1024, 768);
    }
    if t.contains("3:4") || t.contains("3/4") {
        return (768, 1024);
    }
    (1024, 1024)
}

/// Strip an explicit ratio token so it does not pollute the actual prompt
fn strip_ratio_token(text: &str) -> String {
    RATIO_REGEX.replace_all(text, "").trim().to_string()
}

fn system_prompt(width: u32, height: u32) -> String {
    format!(
        "You are a text-to-image prompt engineer for SDXL. \
         Convert the user request into ONE concise but vivid English prompt suitable for SDXL. \
         Do not include any policy text. Do not output markdown. Do not output JSON. \
         Keep it descriptive: subject, style, composition, lighting, colors, details. \
         The target image size is {}x{} (keep composition suitable for this aspect ratio).",
        width, height
    )
}

/// Expand a user request into an SDXL prompt
///
/// Issues exactly one chat request; the expanded text comes back unmodified.
pub async fn expand_prompt(
    client: &ChatClient,
    user_text: &str,
) -> Result<ExpandedPrompt, ImageGenError> {
    let (width, height) = pick_size(user_text);
    let cleaned = strip_ratio_token(user_text);

    let messages = vec![
        ChatMessage::system(&system_prompt(width, height)),
        ChatMessage::user(&cleaned),
    ];

    debug!("Requesting prompt expansion for {}x{}", width, height);
    let text = client
        .chat(
            messages,
            ChatOptions {
                temperature: Some(0.6),
                max_tokens: Some(300),
            },
        )
        .await?;

    if text.is_empty() {
        return Err(ImageGenError::EmptyPrompt);
    }

    debug!("Expanded prompt: {}", text);
    Ok(ExpandedPrompt {
        text,
        width,
        height,
    })
}
