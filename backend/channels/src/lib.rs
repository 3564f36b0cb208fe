use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

pub mod router;
pub mod telegram;
pub mod telegram_commands;
pub mod webhook;

#[cfg(test)]
pub(crate) mod testing;

pub use router::{classify, Inbound, MessageRouter};
pub use telegram::{BotAccount, TelegramAdapter, TelegramTransport};
pub use telegram_commands::{BotCommand, TelegramCommands};
pub use webhook::{WebhookState, WEBHOOK_PATH};

/// How updates reach the bot. Exactly one per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Long-poll `getUpdates`.
    Polling,
    /// Telegram POSTs updates to [`WEBHOOK_PATH`].
    Webhook,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Polling => "polling",
            Self::Webhook => "webhook",
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "polling" | "poll" => Ok(Self::Polling),
            "webhook" => Ok(Self::Webhook),
            other => anyhow::bail!("unknown delivery mode '{other}' (expected polling or webhook)"),
        }
    }
}

/// All channel adapters implement this trait.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Human-readable adapter name for logging.
    fn name(&self) -> &str;

    /// Build the Axum router for this adapter's HTTP endpoints.
    /// Polling adapters still expose a health route.
    fn build_router(&self) -> axum::Router {
        axum::Router::new()
    }

    /// Run the adapter's background work until stopped. Webhook adapters return
    /// immediately since their work happens in the router.
    async fn start(&self) -> anyhow::Result<()>;

    /// Ask a running `start` to finish.
    async fn stop(&self);
}
