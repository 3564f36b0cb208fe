//! Offline doubles for router and webhook tests.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use soundrelay_core::{AudioAttachment, ChatRef, ChatTransport, MessageRef};
use soundrelay_media::{PipelineSettings, TrackAcquirer, TrackPipeline, YtDlpExtractor};

use crate::router::MessageRouter;
use crate::telegram::BotAccount;

#[derive(Default)]
pub(crate) struct RecordingTransport {
    texts: Mutex<Vec<(ChatRef, String)>>,
    next_id: AtomicI32,
}

impl RecordingTransport {
    /// Texts of every `send_text` and `edit_text`, in order.
    pub(crate) fn sent(&self) -> Vec<String> {
        self.texts.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }

    pub(crate) fn chats(&self) -> Vec<ChatRef> {
        self.texts.lock().unwrap().iter().map(|(c, _)| *c).collect()
    }

    pub(crate) fn last_text(&self) -> Option<String> {
        self.sent().pop()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, chat: ChatRef, text: &str) -> Result<MessageRef> {
        self.texts.lock().unwrap().push((chat, text.to_string()));
        Ok(MessageRef(self.next_id.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn edit_text(&self, chat: ChatRef, _message: MessageRef, text: &str) -> Result<()> {
        self.texts.lock().unwrap().push((chat, text.to_string()));
        Ok(())
    }

    async fn delete_message(&self, _chat: ChatRef, _message: MessageRef) -> Result<()> {
        Ok(())
    }

    async fn send_audio(&self, _chat: ChatRef, _audio: AudioAttachment) -> Result<()> {
        Ok(())
    }
}

/// Router whose extractor points at a binary that does not exist, so no test
/// ever reaches the network.
pub(crate) fn offline_router(transport: Arc<RecordingTransport>) -> MessageRouter {
    let extractor = Arc::new(YtDlpExtractor::with_binary("/nonexistent/soundrelay-yt-dlp"));
    let pipeline = TrackPipeline::new(
        Arc::new(TrackAcquirer::new(extractor)),
        transport.clone(),
        PipelineSettings::default(),
    );
    MessageRouter::new(transport, Arc::new(pipeline))
}

pub(crate) struct StubAccount {
    pub(crate) online: bool,
    pub(crate) webhooks: Mutex<Vec<String>>,
}

impl StubAccount {
    pub(crate) fn online() -> Self {
        Self {
            online: true,
            webhooks: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn offline() -> Self {
        Self {
            online: false,
            webhooks: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BotAccount for StubAccount {
    async fn username(&self) -> Result<String> {
        if !self.online {
            bail!("network unreachable");
        }
        Ok("relay_bot".to_string())
    }

    async fn set_webhook(&self, url: &str) -> Result<()> {
        if !self.online {
            bail!("network unreachable");
        }
        self.webhooks.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn webhook_info(&self) -> Result<Value> {
        if !self.online {
            bail!("network unreachable");
        }
        let url = self.webhooks.lock().unwrap().last().cloned().unwrap_or_default();
        Ok(json!({ "url": url, "pending_update_count": 0 }))
    }
}
