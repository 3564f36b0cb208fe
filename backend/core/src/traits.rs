use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::AcquireError;
use crate::types::{AudioAttachment, ChatRef, ExtractedInfo, MessageRef};

/// Outbound side of the messenger.
///
/// Text is sent with HTML formatting. Implementations must be usable from many
/// pipeline runs at once.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post a text message and return a handle to it.
    async fn send_text(&self, chat: ChatRef, text: &str) -> Result<MessageRef>;

    /// Replace the text of a message previously returned by `send_text`.
    async fn edit_text(&self, chat: ChatRef, message: MessageRef, text: &str) -> Result<()>;

    async fn delete_message(&self, chat: ChatRef, message: MessageRef) -> Result<()>;

    /// Upload an audio file with caption and track metadata.
    async fn send_audio(&self, chat: ChatRef, audio: AudioAttachment) -> Result<()>;
}

/// A tool that resolves a track URL to metadata and audio.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Fetch metadata only. `Ok(None)` means the tool produced nothing for the URL.
    async fn probe(&self, url: &str) -> Result<Option<ExtractedInfo>, AcquireError>;

    /// Download the audio so it lands at `<stem>.<ext>`, preferably `.mp3`.
    async fn download(&self, url: &str, stem: &Path) -> Result<(), AcquireError>;
}
