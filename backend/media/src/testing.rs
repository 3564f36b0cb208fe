//! In-memory collaborators for pipeline tests.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::json;
use soundrelay_core::{
    AcquireError, AudioAttachment, ChatRef, ChatTransport, ExtractedInfo, MediaExtractor,
    MessageRef,
};

pub(crate) struct StubExtractor {
    info: Option<ExtractedInfo>,
    probe_error: Option<String>,
    payload_len: u64,
    artifact_ext: &'static str,
    delay: Option<Duration>,
}

impl StubExtractor {
    pub(crate) fn track(title: &str, uploader: &str, duration: u64) -> Self {
        Self {
            info: Some(ExtractedInfo {
                title: Some(title.to_string()),
                uploader: Some(uploader.to_string()),
                duration: Some(json!(duration)),
                ext: Some("mp3".to_string()),
            }),
            probe_error: None,
            payload_len: 1,
            artifact_ext: "mp3",
            delay: None,
        }
    }

    pub(crate) fn empty() -> Self {
        Self {
            info: None,
            probe_error: None,
            payload_len: 0,
            artifact_ext: "mp3",
            delay: None,
        }
    }

    pub(crate) fn failing(detail: &str) -> Self {
        Self {
            probe_error: Some(detail.to_string()),
            ..Self::empty()
        }
    }

    pub(crate) fn with_payload(mut self, len: u64) -> Self {
        self.payload_len = len;
        self
    }

    pub(crate) fn with_artifact_ext(mut self, ext: &'static str) -> Self {
        self.artifact_ext = ext;
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl MediaExtractor for StubExtractor {
    fn name(&self) -> &str {
        "stub"
    }

    async fn probe(&self, _url: &str) -> Result<Option<ExtractedInfo>, AcquireError> {
        match &self.probe_error {
            Some(detail) => Err(AcquireError::NetworkOrPlatform(detail.clone())),
            None => Ok(self.info.clone()),
        }
    }

    async fn download(&self, _url: &str, stem: &Path) -> Result<(), AcquireError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut path: OsString = stem.as_os_str().to_os_string();
        path.push(format!(".{}", self.artifact_ext));
        // Sparse file: large payloads cost no disk.
        let file = tokio::fs::File::create(PathBuf::from(path)).await?;
        file.set_len(self.payload_len).await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) enum TransportCall {
    Sent(String),
    Edited(String),
    Deleted,
    Audio(AudioAttachment),
}

#[derive(Default)]
pub(crate) struct RecordingTransport {
    calls: Mutex<Vec<TransportCall>>,
    next_id: AtomicI32,
    fail_text: bool,
    fail_edit: bool,
    fail_audio: bool,
}

impl RecordingTransport {
    pub(crate) fn failing_text() -> Self {
        Self {
            fail_text: true,
            ..Self::default()
        }
    }

    /// Sends work, every edit fails.
    pub(crate) fn failing_edits() -> Self {
        Self {
            fail_edit: true,
            ..Self::default()
        }
    }

    pub(crate) fn failing_audio() -> Self {
        Self {
            fail_audio: true,
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn audio(&self) -> Vec<AudioAttachment> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TransportCall::Audio(a) => Some(a),
                _ => None,
            })
            .collect()
    }

    /// Text of the most recent send or edit.
    pub(crate) fn last_text(&self) -> Option<String> {
        self.calls().into_iter().rev().find_map(|c| match c {
            TransportCall::Sent(t) | TransportCall::Edited(t) => Some(t),
            _ => None,
        })
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, _chat: ChatRef, text: &str) -> Result<MessageRef> {
        if self.fail_text {
            bail!("send_text unavailable");
        }
        self.record(TransportCall::Sent(text.to_string()));
        Ok(MessageRef(self.next_id.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn edit_text(&self, _chat: ChatRef, _message: MessageRef, text: &str) -> Result<()> {
        if self.fail_text || self.fail_edit {
            bail!("edit_text unavailable");
        }
        self.record(TransportCall::Edited(text.to_string()));
        Ok(())
    }

    async fn delete_message(&self, _chat: ChatRef, _message: MessageRef) -> Result<()> {
        self.record(TransportCall::Deleted);
        Ok(())
    }

    async fn send_audio(&self, _chat: ChatRef, audio: AudioAttachment) -> Result<()> {
        if self.fail_audio {
            bail!("Request Entity Too Large");
        }
        self.record(TransportCall::Audio(audio));
        Ok(())
    }
}

pub(crate) fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
