//! `yt-dlp` process wrapper.
//!
//! Metadata is read with `--dump-single-json`; the download writes
//! `<stem>.%(ext)s` and asks the post-processor for MP3.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use soundrelay_core::{AcquireError, ExtractedInfo, MediaExtractor};
use tokio::process::Command;
use tracing::debug;

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Flags passed to every `yt-dlp` invocation.
#[derive(Debug, Clone)]
pub struct YtDlpOptions {
    pub binary: PathBuf,
    /// Format selector, MP3 first then best available audio.
    pub format: String,
    pub audio_format: String,
    pub audio_quality: String,
    pub retries: u32,
    pub fragment_retries: u32,
    pub socket_timeout_secs: u32,
    pub user_agent: String,
    pub referer: String,
}

impl Default for YtDlpOptions {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            format: "best[ext=mp3]/best[acodec=mp3]/best[abr<=320]/best".to_string(),
            audio_format: "mp3".to_string(),
            audio_quality: "192K".to_string(),
            retries: 3,
            fragment_retries: 3,
            socket_timeout_secs: 30,
            user_agent: BROWSER_USER_AGENT.to_string(),
            referer: "https://soundcloud.com/".to_string(),
        }
    }
}

pub struct YtDlpExtractor {
    options: YtDlpOptions,
}

impl YtDlpExtractor {
    pub fn new(options: YtDlpOptions) -> Self {
        Self { options }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self::new(YtDlpOptions {
            binary: binary.into(),
            ..YtDlpOptions::default()
        })
    }

    fn common_args(&self) -> Vec<OsString> {
        let o = &self.options;
        [
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            "--socket-timeout".to_string(),
            o.socket_timeout_secs.to_string(),
            "--retries".to_string(),
            o.retries.to_string(),
            "--fragment-retries".to_string(),
            o.fragment_retries.to_string(),
            "--user-agent".to_string(),
            o.user_agent.clone(),
            "--referer".to_string(),
            o.referer.clone(),
        ]
        .into_iter()
        .map(OsString::from)
        .collect()
    }

    fn probe_args(&self, url: &str) -> Vec<OsString> {
        let mut args = self.common_args();
        args.push("--dump-single-json".into());
        args.push("--skip-download".into());
        args.push(url.into());
        args
    }

    fn download_args(&self, url: &str, stem: &Path) -> Vec<OsString> {
        let o = &self.options;
        let mut template = stem.as_os_str().to_os_string();
        template.push(".%(ext)s");

        let mut args = self.common_args();
        args.extend(
            [
                "--format",
                o.format.as_str(),
                "--extract-audio",
                "--audio-format",
                o.audio_format.as_str(),
                "--audio-quality",
                o.audio_quality.as_str(),
                "--no-write-info-json",
                "--no-write-thumbnail",
                "--output",
            ]
            .map(OsString::from),
        );
        args.push(template);
        args.push(url.into());
        args
    }

    async fn run(&self, args: Vec<OsString>) -> Result<Vec<u8>, AcquireError> {
        debug!(binary = %self.options.binary.display(), ?args, "Running yt-dlp");

        let output = Command::new(&self.options.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = error_detail(&stderr)
                .map(str::to_string)
                .unwrap_or_else(|| format!("yt-dlp exited with {}", output.status));
            return Err(AcquireError::NetworkOrPlatform(detail));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn probe(&self, url: &str) -> Result<Option<ExtractedInfo>, AcquireError> {
        let stdout = self.run(self.probe_args(url)).await?;
        parse_probe_output(&stdout)
    }

    async fn download(&self, url: &str, stem: &Path) -> Result<(), AcquireError> {
        self.run(self.download_args(url, stem)).await.map(|_| ())
    }
}

fn parse_probe_output(stdout: &[u8]) -> Result<Option<ExtractedInfo>, AcquireError> {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() || text == "null" {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| AcquireError::Malformed(e.to_string()))
}

/// Pick the most useful line out of yt-dlp's stderr: the last `ERROR:` line,
/// otherwise the last non-empty one.
fn error_detail(stderr: &str) -> Option<&str> {
    let mut lines = stderr.lines().map(str::trim).filter(|l| !l.is_empty());
    let last_error = lines.clone().filter(|l| l.starts_with("ERROR:")).last();
    last_error.or_else(|| lines.next_back())
}
