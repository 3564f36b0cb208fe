//! Inbound text routing: commands, track links, hints.

use std::sync::Arc;

use soundrelay_core::{ChatRef, ChatTransport, FailureKind, TrackRequest};
use soundrelay_media::{match_track_url, TrackPipeline};
use tracing::{info, warn};

use crate::telegram_commands::{BotCommand, TelegramCommands};

/// Words suggesting the user is trying to ask for a download without a link.
const HINT_KEYWORDS: [&str; 4] = ["soundcloud", "link", "download", "track"];

const LINK_HINT_TEXT: &str = "🔗 <b>Send a SoundCloud link</b>

Example of a valid link:
<code>https://soundcloud.com/artist/track-name</code>

I can only download public tracks!";

/// What an inbound text message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound<'a> {
    Command(BotCommand),
    Track(&'a str),
    Hint,
    NoMatch,
}

pub fn classify(text: &str) -> Inbound<'_> {
    if let Some(command) = TelegramCommands::parse(text) {
        return Inbound::Command(command);
    }
    if let Some(url) = match_track_url(text) {
        return Inbound::Track(url);
    }
    let lowered = text.to_lowercase();
    if HINT_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        Inbound::Hint
    } else {
        Inbound::NoMatch
    }
}

pub struct MessageRouter {
    transport: Arc<dyn ChatTransport>,
    pipeline: Arc<TrackPipeline>,
}

impl MessageRouter {
    pub fn new(transport: Arc<dyn ChatTransport>, pipeline: Arc<TrackPipeline>) -> Self {
        Self {
            transport,
            pipeline,
        }
    }

    /// Handle one text message to completion, including any download it triggers.
    pub async fn handle_text(&self, chat: ChatRef, text: &str) {
        match classify(text) {
            Inbound::Command(command) => self.reply(chat, TelegramCommands::reply(command)).await,
            Inbound::Track(url) => {
                let run = self.pipeline.run(TrackRequest::new(url, chat)).await;
                info!(
                    run_id = %run.run_id,
                    chat = %chat,
                    outcome = ?run.outcome,
                    "Track request finished"
                );
            }
            Inbound::Hint => self.reply(chat, LINK_HINT_TEXT).await,
            Inbound::NoMatch => self.reply(chat, FailureKind::NoMatch.user_message()).await,
        }
    }

    async fn reply(&self, chat: ChatRef, text: &str) {
        if let Err(e) = self.transport.send_text(chat, text).await {
            warn!(chat = %chat, error = %e, "Failed to send reply");
        }
    }
}
