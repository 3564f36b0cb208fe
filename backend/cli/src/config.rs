use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use soundrelay_channels::DeliveryMode;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 300;

/// soundrelay runtime configuration.
#[derive(Clone)]
pub struct Config {
    /// Telegram bot token; only `serve` requires it
    pub bot_token: Option<String>,
    pub mode: DeliveryMode,
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// Public origin used when registering the webhook
    pub public_base_url: Option<String>,
    pub acquire_timeout: Duration,
    /// Parent of per-request scratch directories; system temp when unset
    pub scratch_dir: Option<PathBuf>,
    pub ytdlp_path: PathBuf,
    /// Directory for rolling JSON logs
    pub log_dir: Option<PathBuf>,
    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: None,
            mode: DeliveryMode::Polling,
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            public_base_url: None,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            scratch_dir: None,
            ytdlp_path: PathBuf::from("yt-dlp"),
            log_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let mode = match get("SOUNDRELAY_MODE") {
            Some(raw) => raw.parse()?,
            None => defaults.mode,
        };
        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port: {raw}"))?,
            None => defaults.port,
        };
        let acquire_timeout = match get("SOUNDRELAY_ACQUIRE_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse().with_context(|| {
                format!("SOUNDRELAY_ACQUIRE_TIMEOUT_SECS is not a number of seconds: {raw}")
            })?),
            None => defaults.acquire_timeout,
        };
        let public_base_url = get("WEBHOOK_BASE_URL")
            .or_else(|| get("VERCEL_URL").map(|host| format!("https://{host}")));

        Ok(Self {
            bot_token: get("BOT_TOKEN"),
            mode,
            bind_address: get("SOUNDRELAY_BIND").unwrap_or(defaults.bind_address),
            port,
            public_base_url,
            acquire_timeout,
            scratch_dir: get("SOUNDRELAY_SCRATCH_DIR").map(PathBuf::from),
            ytdlp_path: get("YTDLP_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ytdlp_path),
            log_dir: get("SOUNDRELAY_LOG_DIR").map(PathBuf::from),
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
        })
    }

    pub fn require_token(&self) -> Result<&str> {
        self.bot_token
            .as_deref()
            .context("BOT_TOKEN environment variable is not set")
    }
}
