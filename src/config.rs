//! Startup configuration
//!
//! Provider credentials come from a flat JSON file (`api_config.json`);
//! gateway credentials and the bot token come from the environment. The
//! whole configuration is loaded once before polling starts and is
//! immutable afterwards.

use std::path::Path;

use figment::providers::{Env, Format, Json};
use figment::Figment;
use serde::Deserialize;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(#[from] figment::Error),

    #[error("missing configuration value: {0}")]
    Missing(&'static str),
}

/// Credentials for one OpenAI-compatible provider
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// API key
    pub key: String,
    /// API base URL
    pub base_url: String,
    /// Model identifier
    pub models: String,
}

/// Cloudflare AI Gateway credentials (from environment)
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub account_id: String,
    pub gateway_id: String,
    pub cloudflare_token: String,
}

/// Full bot configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Prompt expansion provider
    pub deepseek: ProviderConfig,
    /// FLUX image provider
    pub flux: ProviderConfig,
    /// Gateway for Workers AI (SDXL)
    pub gateway: GatewayConfig,
    /// Telegram bot token
    pub telegram_token: String,
}

impl Config {
    /// Load configuration from the provider file and the environment.
    ///
    /// Environment variables: `account_id`, `gateway_id`, `cloudflare_token`
    /// for the gateway and `TELEGRAM_BOT_API_TOKEN` for the transport. A
    /// missing or empty value is a startup failure.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: Config = Figment::new()
            .merge(Json::file_exact(path))
            .merge(
                Env::raw()
                    .only(&["account_id", "gateway_id", "cloudflare_token"])
                    .map(|key| format!("gateway.{}", key).into()),
            )
            .merge(
                Env::raw()
                    .only(&["TELEGRAM_BOT_API_TOKEN"])
                    .map(|_| "telegram_token".into()),
            )
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required: [(&'static str, &str); 10] = [
            ("deepseek.key", &self.deepseek.key),
            ("deepseek.base_url", &self.deepseek.base_url),
            ("deepseek.models", &self.deepseek.models),
            ("flux.key", &self.flux.key),
            ("flux.base_url", &self.flux.base_url),
            ("flux.models", &self.flux.models),
            ("account_id", &self.gateway.account_id),
            ("gateway_id", &self.gateway.gateway_id),
            ("cloudflare_token", &self.gateway.cloudflare_token),
            ("TELEGRAM_BOT_API_TOKEN", &self.telegram_token),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }

        Ok(())
    }
}
