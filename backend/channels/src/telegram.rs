use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use soundrelay_core::{AudioAttachment, ChatRef, ChatTransport, MessageRef};
use teloxide::dispatching::ShutdownToken;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ParseMode};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::router::MessageRouter;
use crate::webhook::{health_router, webhook_router, WebhookState};
use crate::{ChannelAdapter, DeliveryMode};

/// Sends and edits messages through the Bot API, always in HTML parse mode.
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat: ChatRef, text: &str) -> Result<MessageRef> {
        let sent = self
            .bot
            .send_message(ChatId(chat.0), text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(MessageRef(sent.id.0))
    }

    async fn edit_text(&self, chat: ChatRef, message: MessageRef, text: &str) -> Result<()> {
        self.bot
            .edit_message_text(ChatId(chat.0), MessageId(message.0), text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }

    async fn delete_message(&self, chat: ChatRef, message: MessageRef) -> Result<()> {
        self.bot
            .delete_message(ChatId(chat.0), MessageId(message.0))
            .await?;
        Ok(())
    }

    async fn send_audio(&self, chat: ChatRef, audio: AudioAttachment) -> Result<()> {
        let file = InputFile::memory(Vec::from(audio.data)).file_name(audio.file_name);
        let mut req = self
            .bot
            .send_audio(ChatId(chat.0), file)
            .caption(audio.caption)
            .parse_mode(ParseMode::Html)
            .title(audio.title)
            .performer(audio.performer);
        if let Some(duration) = audio.duration_seconds {
            req = req.duration(duration);
        }
        req.await?;
        Ok(())
    }
}

/// Account-level Bot API calls used by the HTTP endpoints.
#[async_trait]
pub trait BotAccount: Send + Sync {
    async fn username(&self) -> Result<String>;

    async fn set_webhook(&self, url: &str) -> Result<()>;

    async fn webhook_info(&self) -> Result<Value>;
}

#[async_trait]
impl BotAccount for Bot {
    async fn username(&self) -> Result<String> {
        let me = self.get_me().await?;
        Ok(me.username().to_string())
    }

    async fn set_webhook(&self, url: &str) -> Result<()> {
        Requester::set_webhook(self, url::Url::parse(url)?).await?;
        Ok(())
    }

    async fn webhook_info(&self) -> Result<Value> {
        let info = self.get_webhook_info().await?;
        Ok(serde_json::to_value(&info)?)
    }
}

/// How long `stop` waits before retrying a dispatcher that has not begun
/// dispatching yet.
const STOP_RETRY: Duration = Duration::from_millis(50);

/// Dispatcher handle, plus whether a stop arrived before polling began.
#[derive(Default)]
struct PollingControl {
    token: Option<ShutdownToken>,
    stop_requested: bool,
}

/// The bot service: owns the Bot API client and the message router, and runs
/// in whichever delivery mode the deployment picked.
pub struct TelegramAdapter {
    bot: Bot,
    router: Arc<MessageRouter>,
    mode: DeliveryMode,
    public_base_url: Option<String>,
    polling: Mutex<PollingControl>,
}

impl TelegramAdapter {
    pub fn new(
        bot: Bot,
        router: Arc<MessageRouter>,
        mode: DeliveryMode,
        public_base_url: Option<String>,
    ) -> Self {
        Self {
            bot,
            router,
            mode,
            public_base_url,
            polling: Mutex::new(PollingControl::default()),
        }
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    fn webhook_state(&self) -> WebhookState {
        WebhookState {
            account: Arc::new(self.bot.clone()),
            router: Arc::clone(&self.router),
            mode: self.mode,
            public_base_url: self.public_base_url.clone(),
        }
    }

    async fn run_polling(&self) {
        let handler = Update::filter_message().endpoint(
            |msg: Message, router: Arc<MessageRouter>| async move {
                if let Some(text) = msg.text() {
                    debug!(chat_id = msg.chat.id.0, "Received Telegram message");
                    router.handle_text(ChatRef(msg.chat.id.0), text).await;
                }
                respond(())
            },
        );

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![Arc::clone(&self.router)])
            .build();

        {
            let mut control = self.polling.lock().await;
            if control.stop_requested {
                info!("Stop requested before polling began");
                return;
            }
            control.token = Some(dispatcher.shutdown_token());
        }
        dispatcher.dispatch().await;
        self.polling.lock().await.token.take();
    }
}

#[async_trait]
impl ChannelAdapter for TelegramAdapter {
    fn name(&self) -> &str {
        "telegram"
    }

    fn build_router(&self) -> axum::Router {
        match self.mode {
            DeliveryMode::Webhook => webhook_router(self.webhook_state()),
            DeliveryMode::Polling => health_router(self.webhook_state()),
        }
    }

    async fn start(&self) -> Result<()> {
        match self.mode {
            DeliveryMode::Polling => {
                info!("Starting Telegram adapter in polling mode");
                self.run_polling().await;
                info!("Telegram polling stopped");
            }
            DeliveryMode::Webhook => {
                info!("Telegram adapter in webhook mode; updates arrive over HTTP");
            }
        }
        Ok(())
    }

    /// Stops polling whether it is running, about to run, or not yet started.
    async fn stop(&self) {
        loop {
            let token = {
                let mut control = self.polling.lock().await;
                control.stop_requested = true;
                match &control.token {
                    Some(token) => token.clone(),
                    None => return,
                }
            };
            match token.shutdown() {
                Ok(done) => {
                    done.await;
                    return;
                }
                // Token handed out but `dispatch` has not started yet.
                Err(_) => {
                    debug!("Dispatcher not running yet, retrying stop");
                    tokio::time::sleep(STOP_RETRY).await;
                }
            }
        }
    }
}
