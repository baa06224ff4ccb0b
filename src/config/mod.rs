//! Configuration management for the kiosk
//!
//! This module handles loading and validating configuration from environment variables
//! and TOML files. Every section has defaults, so a config file only needs the
//! values that differ.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error;
use crate::fullscreen::HeadlessDisplay;
use crate::manifest::{HttpManifestClient, PushSource, WsPushSource};
use crate::models::AdMode;
use crate::probe::HttpAssetProbe;
use crate::scheduler::{RotationTimings, SchedulerError};
use crate::session::{KioskConfig, KioskDeps};
use crate::utils::retry::RetryConfig;
use std::sync::Arc;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rotation and ad source settings
    pub kiosk: KioskSettings,

    /// Shop API settings
    pub api: ApiConfig,

    /// Push channel settings
    pub push: PushConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Rotation and ad source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskSettings {
    /// Ad source: `static` or `manifest`
    pub mode: AdMode,

    /// Queue view duration in milliseconds
    pub queue_duration_ms: u64,

    /// Ad view duration in milliseconds
    pub ad_duration_ms: u64,

    /// Idle period before paused rotation resumes, in milliseconds
    pub idle_timeout_ms: u64,

    /// Asset URLs for static mode; slot `n` is entry `n - 1`
    pub static_slots: Vec<String>,

    /// Base for relative asset URLs (defaults to the API base URL)
    pub asset_base_url: Option<String>,
}

/// Shop API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API base URL, e.g. `https://shop.example.com/api`
    pub base_url: String,

    /// Shop identifier sent as `slug`
    pub shop_slug: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Manifest fetch retries after the first attempt
    pub manifest_retries: u32,

    /// Delay before the first manifest retry, in milliseconds
    pub retry_base_delay_ms: u64,

    /// Growth factor between manifest retries
    pub retry_backoff_multiplier: f64,
}

/// Push channel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// WebSocket endpoint (`ws://` or `wss://`); no push channel when unset
    pub url: Option<String>,

    /// Wait between reconnect attempts, in milliseconds
    pub reconnect_delay_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for KioskSettings {
    fn default() -> Self {
        Self {
            mode: AdMode::Static,
            queue_duration_ms: 15_000,
            ad_duration_ms: 15_000,
            idle_timeout_ms: 10_000,
            static_slots: vec![
                String::from("/ads/ad1.png"),
                String::from("/ads/ad2.png"),
                String::from("/ads/ad3.png"),
            ],
            asset_base_url: None,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("http://localhost:3001/api"),
            shop_slug: String::new(),
            request_timeout_secs: 8,
            manifest_retries: 2,
            retry_base_delay_ms: 400,
            retry_backoff_multiplier: 3.0,
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            url: None,
            reconnect_delay_ms: 3_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let static_slots = std::env::var("FILAKIOSK_STATIC_SLOTS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or(defaults.kiosk.static_slots);

        Ok(Self {
            kiosk: KioskSettings {
                mode: env_parse("FILAKIOSK_AD_MODE").unwrap_or(defaults.kiosk.mode),
                queue_duration_ms: env_parse("FILAKIOSK_QUEUE_DURATION_MS")
                    .unwrap_or(defaults.kiosk.queue_duration_ms),
                ad_duration_ms: env_parse("FILAKIOSK_AD_DURATION_MS")
                    .unwrap_or(defaults.kiosk.ad_duration_ms),
                idle_timeout_ms: env_parse("FILAKIOSK_IDLE_TIMEOUT_MS")
                    .unwrap_or(defaults.kiosk.idle_timeout_ms),
                static_slots,
                asset_base_url: std::env::var("FILAKIOSK_ASSET_BASE_URL").ok(),
            },
            api: ApiConfig {
                base_url: std::env::var("FILAKIOSK_API_URL").unwrap_or(defaults.api.base_url),
                shop_slug: std::env::var("FILAKIOSK_SHOP_SLUG").unwrap_or(defaults.api.shop_slug),
                request_timeout_secs: env_parse("FILAKIOSK_REQUEST_TIMEOUT")
                    .unwrap_or(defaults.api.request_timeout_secs),
                manifest_retries: env_parse("FILAKIOSK_MANIFEST_RETRIES")
                    .unwrap_or(defaults.api.manifest_retries),
                ..defaults.api
            },
            push: PushConfig {
                url: std::env::var("FILAKIOSK_PUSH_URL").ok(),
                reconnect_delay_ms: env_parse("FILAKIOSK_PUSH_RECONNECT_MS")
                    .unwrap_or(defaults.push.reconnect_delay_ms),
            },
            logging: LoggingConfig {
                level: std::env::var("FILAKIOSK_LOG_LEVEL").unwrap_or(defaults.logging.level),
                format: std::env::var("FILAKIOSK_LOG_FORMAT").unwrap_or(defaults.logging.format),
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `path` if given, else from the environment, then validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.rotation_timings()
            .validate()
            .context("invalid rotation timings")?;

        if self.kiosk.idle_timeout_ms == 0 {
            anyhow::bail!("idle_timeout_ms must be greater than 0");
        }

        match self.kiosk.mode {
            AdMode::Static if self.kiosk.static_slots.is_empty() => {
                return Err(SchedulerError::NoSlotsConfigured.into());
            }
            AdMode::Manifest if self.api.shop_slug.trim().is_empty() => {
                anyhow::bail!("manifest mode needs api.shop_slug");
            }
            _ => {}
        }

        if self.api.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.api.retry_backoff_multiplier <= 0.0 {
            anyhow::bail!("retry_backoff_multiplier must be positive");
        }

        if self.push.reconnect_delay_ms == 0 {
            anyhow::bail!("reconnect_delay_ms must be greater than 0");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    #[must_use]
    pub fn rotation_timings(&self) -> RotationTimings {
        RotationTimings {
            queue_duration: Duration::from_millis(self.kiosk.queue_duration_ms),
            ad_duration: Duration::from_millis(self.kiosk.ad_duration_ms),
        }
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.kiosk.idle_timeout_ms)
    }

    /// Retry schedule for manifest fetches
    #[must_use]
    pub fn manifest_retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.api.manifest_retries,
            base_delay_ms: self.api.retry_base_delay_ms,
            backoff_multiplier: self.api.retry_backoff_multiplier,
            ..RetryConfig::default()
        }
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.push.reconnect_delay_ms)
    }

    /// Base URL for relative asset paths
    pub fn asset_base_url(&self) -> &str {
        self.kiosk
            .asset_base_url
            .as_deref()
            .unwrap_or(&self.api.base_url)
    }

    /// Session settings derived from this configuration
    #[must_use]
    pub fn session_config(&self) -> KioskConfig {
        KioskConfig {
            timings: self.rotation_timings(),
            idle_timeout: self.idle_timeout(),
            mode: self.kiosk.mode,
            static_slots: self.kiosk.static_slots.clone(),
            retry: self.manifest_retry(),
            reconnect_delay: self.reconnect_delay(),
        }
    }

    /// Wire the HTTP probe and manifest client, the optional WebSocket push
    /// channel and a headless display
    pub fn kiosk_deps(&self) -> error::Result<KioskDeps> {
        let timeout = self.request_timeout();

        let probe = HttpAssetProbe::with_base_url(self.asset_base_url(), timeout)?;
        let manifest = HttpManifestClient::new(&self.api.base_url, &self.api.shop_slug, timeout)?;
        let push: Option<Arc<dyn PushSource>> = match &self.push.url {
            Some(url) => Some(Arc::new(WsPushSource::new(url, &self.api.shop_slug)?)),
            None => None,
        };

        Ok(KioskDeps {
            probe: Arc::new(probe),
            manifest: Arc::new(manifest),
            push,
            fullscreen: Arc::new(HeadlessDisplay::new()),
        })
    }
}
