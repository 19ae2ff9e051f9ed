//! Configuration management for Mailgate.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{MailgateError, Result};
use crate::ratelimit::LimitConfig;

/// Main configuration for the Mailgate service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MailgateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Hosted identity provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Limit for signup confirmation resends
    #[serde(default = "default_confirmation_limit")]
    pub confirmation: LimitConfig,

    /// Limit for password reset emails
    #[serde(default = "default_password_reset_limit")]
    pub password_reset: LimitConfig,

    /// Seconds between sweeps of expired entries
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl RateLimitingConfig {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            confirmation: default_confirmation_limit(),
            password_reset: default_password_reset_limit(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

fn default_confirmation_limit() -> LimitConfig {
    LimitConfig::new(Duration::from_secs(60), 3)
}

fn default_password_reset_limit() -> LimitConfig {
    LimitConfig::new(Duration::from_secs(60), 2)
}

fn default_cleanup_interval() -> u64 {
    300
}

/// Hosted identity provider configuration.
///
/// With no `base_url` the service logs emails instead of sending them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the hosted auth API
    #[serde(default)]
    pub base_url: Option<String>,

    /// API key sent with every provider request
    #[serde(default)]
    pub api_key: Option<String>,

    /// Where password reset links should land
    #[serde(default)]
    pub redirect_to: Option<String>,
}

impl MailgateConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| MailgateError::Config(format!("Failed to parse configuration: {}", e)))
    }

    /// Apply `MAILGATE_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("MAILGATE_HTTP_ADDR") {
            self.server.http_addr = addr
                .parse()
                .map_err(|e| MailgateError::Config(format!("Invalid MAILGATE_HTTP_ADDR: {}", e)))?;
        }
        if let Some(url) = lookup("MAILGATE_PROVIDER_URL") {
            self.provider.base_url = Some(url);
        }
        if let Some(key) = lookup("MAILGATE_PROVIDER_KEY") {
            self.provider.api_key = Some(key);
        }
        if let Some(redirect) = lookup("MAILGATE_REDIRECT_TO") {
            self.provider.redirect_to = Some(redirect);
        }
        Ok(())
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        let limits = [
            ("confirmation", &self.rate_limiting.confirmation),
            ("password_reset", &self.rate_limiting.password_reset),
        ];
        for (name, limit) in limits {
            if limit.window_ms == 0 {
                return Err(MailgateError::Config(format!(
                    "{} window_ms must be greater than zero",
                    name
                )));
            }
        }

        if self.rate_limiting.cleanup_interval_secs == 0 {
            return Err(MailgateError::Config(
                "cleanup_interval_secs must be greater than zero".to_string(),
            ));
        }

        if self.provider.base_url.is_some() && self.provider.api_key.is_none() {
            return Err(MailgateError::Config(
                "provider.api_key is required when provider.base_url is set".to_string(),
            ));
        }

        Ok(())
    }
}
