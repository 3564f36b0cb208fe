use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::FailureKind;

/// Largest attachment the bot will try to send (50 MiB).
pub const MAX_ATTACHMENT_BYTES: u64 = 50 * 1024 * 1024;

const UNKNOWN_TITLE: &str = "Unknown track";
const UNKNOWN_UPLOADER: &str = "Unknown artist";

/// Opaque handle for the chat a request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatRef(pub i64);

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle for a message the bot has already sent, used for edits and deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef(pub i32);

/// One matched link waiting to be fetched and delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRequest {
    pub source_url: String,
    pub chat: ChatRef,
}

impl TrackRequest {
    pub fn new(source_url: impl Into<String>, chat: ChatRef) -> Self {
        Self {
            source_url: source_url.into(),
            chat,
        }
    }
}

/// Raw metadata as reported by the extraction tool. Every field is optional
/// because the tool omits whatever the platform did not provide.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub duration: Option<serde_json::Value>,
    #[serde(default)]
    pub ext: Option<String>,
}

/// Track details used for the caption and the audio attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    pub uploader: String,
    pub duration_seconds: Option<u32>,
}

impl From<&ExtractedInfo> for TrackMetadata {
    fn from(info: &ExtractedInfo) -> Self {
        let title = info
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNKNOWN_TITLE);
        let uploader = info
            .uploader
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(UNKNOWN_UPLOADER);

        // Only plain positive numbers count; "2:05" and 0 are treated as unknown.
        let duration_seconds = info
            .duration
            .as_ref()
            .and_then(serde_json::Value::as_f64)
            .filter(|d| d.is_finite() && *d >= 0.0 && *d <= f64::from(u32::MAX))
            .map(|d| d as u32)
            .filter(|&d| d > 0);

        Self {
            title: title.to_string(),
            uploader: uploader.to_string(),
            duration_seconds,
        }
    }
}

/// An audio file sitting in a request's scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Everything the transport needs to post an audio message.
#[derive(Debug, Clone)]
pub struct AudioAttachment {
    pub file_name: String,
    pub data: Bytes,
    pub caption: String,
    pub title: String,
    pub performer: String,
    pub duration_seconds: Option<u32>,
}

/// Terminal result of one pipeline run. Never retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "kind", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent,
    RejectedTooLarge,
    RejectedEmpty,
    Failed(FailureKind),
}

impl DeliveryOutcome {
    /// The failure category behind a non-`Sent` outcome.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Sent => None,
            Self::RejectedTooLarge => Some(FailureKind::RejectedTooLarge),
            Self::RejectedEmpty => Some(FailureKind::RejectedEmpty),
            Self::Failed(kind) => Some(*kind),
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

impl From<FailureKind> for DeliveryOutcome {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::RejectedTooLarge => Self::RejectedTooLarge,
            FailureKind::RejectedEmpty => Self::RejectedEmpty,
            other => Self::Failed(other),
        }
    }
}
