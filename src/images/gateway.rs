//! Cloudflare AI Gateway client for Workers AI image generation
//!
//! The gateway takes a universal array payload naming the provider,
//! endpoint, auth headers, and query. It usually answers with raw image
//! bytes, but sometimes wraps a base64 image in JSON.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use super::ImageGenError;
use crate::config::GatewayConfig;

/// Workers AI endpoint for SDXL
const SDXL_ENDPOINT: &str = "@cf/stabilityai/stable-diffusion-xl-base-1.0";

const DEFAULT_BASE_URL: &str = "https://gateway.ai.cloudflare.com/v1";

/// One step of the gateway's universal request payload
#[derive(Debug, Serialize)]
struct GatewayStep {
    provider: &'static str,
    endpoint: &'static str,
    headers: GatewayHeaders,
    query: ImageQuery,
}

#[derive(Debug, Serialize)]
struct GatewayHeaders {
    #[serde(rename = "Authorization")]
    authorization: String,
    #[serde(rename = "Content-Type")]
    content_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ImageQuery {
    prompt: String,
    width: u32,
    height: u32,
    num_steps: u32,
}

/// Raw image bytes plus mime type
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Cloudflare AI Gateway client
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    account_id: String,
    gateway_id: String,
    token: String,
}

impl GatewayClient {
    /// Create a client against the public gateway
    pub fn new(config: &GatewayConfig) -> Result<Self, ImageGenError> {
        Self::with_base_url(config, DEFAULT_BASE_URL)
    }

    /// Create a client against a non-default gateway URL (used by tests)
    pub fn with_base_url(
        config: &GatewayConfig,
        base_url: &str,
    ) -> Result<Self, ImageGenError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(180))
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            account_id: config.account_id.clone(),
            gateway_id: config.gateway_id.clone(),
            token: config.cloudflare_token.clone(),
        })
    }

    /// Generate an SDXL image
    ///
    /// Issues exactly one request; the returned bytes are forwarded
    /// unaltered. A non-success status never yields partial image data.
    pub async fn generate_sdxl(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
    ) -> Result<GeneratedImage, ImageGenError> {
        let payload = vec![GatewayStep {
            provider: "workers-ai",
            endpoint: SDXL_ENDPOINT,
            headers: GatewayHeaders {
                authorization: format!("Bearer {}", self.token),
                content_type: "application/json",
            },
            query: ImageQuery {
                prompt: prompt.to_string(),
                width,
                height,
                num_steps: 20,
            },
        }];

        let url = format!("{}/{}/{}/", self.base_url, self.account_id, self.gateway_id);
        debug!("Sending image generation request to gateway");

        let response = self.client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Gateway error: {} - {}", status, body);
            return Err(ImageGenError::GatewayStatus(status));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let body = response.bytes().await?;
        decode_image_body(&content_type, &body)
    }
}

/// Interpret the gateway response: direct image bytes, or JSON carrying a
/// base64 image under one of the known keys.
fn decode_image_body(
    content_type: &str,
    body: &[u8],
) -> Result<GeneratedImage, ImageGenError> {
    if content_type.starts_with("image/") {
        return Ok(GeneratedImage {
            data: body.to_vec(),
            mime_type: content_type.to_string(),
        });
    }

    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|_| ImageGenError::UnexpectedResponse(content_type.to_string()))?;

    let b64 = value
        .get("result")
        .and_then(|r| r.get("image").or_else(|| r.get("image_base64")))
        .or_else(|| value.get("image"))
        .or_else(|| value.get("image_base64"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| ImageGenError::UnexpectedResponse(content_type.to_string()))?;

    let data = BASE64.decode(b64)?;
    Ok(GeneratedImage {
        data,
        mime_type: "image/png".to_string(),
    })
}
