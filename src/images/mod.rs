//! Image generation pipelines
//!
//! Two providers:
//! - SDXL via the Cloudflare AI Gateway, with DeepSeek prompt expansion
//! - FLUX via an OpenAI-compatible chat endpoint that replies with a URL

mod flux;
mod gateway;
mod prompt;

pub use flux::generate_flux_url;
pub use gateway::{GatewayClient, GeneratedImage};
pub use prompt::{expand_prompt, pick_size, ExpandedPrompt};

use thiserror::Error;

use crate::openai::ChatError;

/// Image generation errors
///
/// Every variant surfaces to the user as a single "generation failed" reply;
/// nothing here is retried.
#[derive(Debug, Error)]
pub enum ImageGenError {
    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("model returned an empty prompt")]
    EmptyPrompt,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gateway error: {0}")]
    GatewayStatus(reqwest::StatusCode),

    #[error("unexpected gateway response (content-type: {0})")]
    UnexpectedResponse(String),

    #[error("invalid base64 image payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("no image URL in response: {0}")]
    MissingUrl(String),
}
