use serde::Serialize;
use thiserror::Error;

/// Categories a request can fail with. Each maps to exactly one message shown
/// to the user; the underlying detail only goes to the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NoMatch,
    ExtractionEmpty,
    NetworkOrPlatform,
    DownloadedFileMissing,
    RejectedEmpty,
    RejectedTooLarge,
    Timeout,
    Unclassified,
}

impl FailureKind {
    /// HTML text sent to the chat for this category.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoMatch => {
                "❓ <b>I don't understand</b>\n\n\
                 Send me a link to a SoundCloud track and I'll download it!\n\n\
                 Use /help for instructions."
            }
            Self::ExtractionEmpty | Self::NetworkOrPlatform => {
                "❌ <b>Could not download from SoundCloud</b>\n\n\
                 Possible reasons:\n\
                 • The track is unavailable or was removed\n\
                 • The track is private or access-restricted\n\
                 • SoundCloud could not be reached\n\n\
                 Try another link or retry later."
            }
            Self::DownloadedFileMissing => {
                "❌ <b>Error:</b> The downloaded file was not found.\n\
                 Please try again."
            }
            Self::RejectedEmpty => {
                "❌ <b>Error:</b> The downloaded file is empty.\n\
                 Please try again."
            }
            Self::RejectedTooLarge => {
                "❌ <b>Error:</b> The file is too large to send via Telegram (>50MB)."
            }
            Self::Timeout => {
                "⏱ <b>The download took too long</b>\n\n\
                 SoundCloud is responding slowly or the track is very long.\n\
                 Please try again in a few minutes."
            }
            Self::Unclassified => {
                "❌ <b>An unexpected error occurred</b>\n\n\
                 Possible reasons:\n\
                 • Temporary problems with the service\n\
                 • Internet connection problems\n\
                 • Unsupported track format\n\n\
                 Please try again in a few minutes."
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoMatch => "no_match",
            Self::ExtractionEmpty => "extraction_empty",
            Self::NetworkOrPlatform => "network_or_platform",
            Self::DownloadedFileMissing => "downloaded_file_missing",
            Self::RejectedEmpty => "rejected_empty",
            Self::RejectedTooLarge => "rejected_too_large",
            Self::Timeout => "timeout",
            Self::Unclassified => "unclassified",
        }
    }
}

/// Errors raised while fetching a track into its scratch directory.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("extractor returned no information for the url")]
    ExtractionEmpty,

    #[error("extractor failed: {0}")]
    NetworkOrPlatform(String),

    #[error("downloaded file not found under any known extension")]
    DownloadedFileMissing,

    #[error("malformed extractor output: {0}")]
    Malformed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AcquireError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ExtractionEmpty => FailureKind::ExtractionEmpty,
            Self::NetworkOrPlatform(_) => FailureKind::NetworkOrPlatform,
            Self::DownloadedFileMissing => FailureKind::DownloadedFileMissing,
            Self::Malformed(_) | Self::Io(_) => FailureKind::Unclassified,
        }
    }
}
