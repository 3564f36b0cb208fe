//! Telegram Bot Commands
//!
//! Recognizes `/start` and `/help` (optionally addressed as `/help@botname`)
//! and holds their reply texts.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
}

const START_TEXT: &str = "🎵 <b>Welcome to the SoundCloud bot!</b>

I download music from SoundCloud for you.

<b>How to use:</b>
• Send me a link to a SoundCloud track
• I'll download it and send you the audio file

<b>Supported link formats:</b>
• https://soundcloud.com/artist/track-name
• https://www.soundcloud.com/artist/track-name

<b>Commands:</b>
/start - show this message
/help - help

Just send a link and I'll start downloading! 🎧";

const HELP_TEXT: &str = "🆘 <b>How to use the bot</b>

<b>Downloading a track:</b>
1. Find the track on SoundCloud
2. Copy the link to the track
3. Send the link to me in this chat
4. Wait for the download and receive the audio file

<b>Example links:</b>
• https://soundcloud.com/artist/song
• https://www.soundcloud.com/user/track-name

<b>Limits:</b>
• Only public tracks can be downloaded
• The file must not exceed 50MB
• A download can take a few minutes

<b>Problems?</b>
Make sure the link is correct and the track is publicly available.";

pub struct TelegramCommands;

impl TelegramCommands {
    /// Parse a known command at the start of `text`.
    pub fn parse(text: &str) -> Option<BotCommand> {
        let first = text.split_whitespace().next()?;
        let name = first.strip_prefix('/')?;
        let name = name.split_once('@').map(|(n, _)| n).unwrap_or(name);

        let command = match name {
            "start" => BotCommand::Start,
            "help" => BotCommand::Help,
            _ => return None,
        };
        debug!(?command, "Recognized Telegram command");
        Some(command)
    }

    pub fn reply(command: BotCommand) -> &'static str {
        match command {
            BotCommand::Start => START_TEXT,
            BotCommand::Help => HELP_TEXT,
        }
    }
}
