//! Track delivery pipeline.
//!
//! One [`TrackPipeline::run`] call takes a matched link from first status
//! message to delivered attachment (or categorized failure):
//!
//! `Started -> Downloading -> Validating -> Sending -> Done`, with `Failed`
//! reachable from the three middle stages. The request's scratch directory is
//! removed before the terminal stage is entered, whichever way the run ends.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use soundrelay_core::{
    AcquiredFile, AudioAttachment, ChatRef, ChatTransport, DeliveryOutcome, FailureKind,
    MessageRef, TrackMetadata, TrackRequest,
};
use soundrelay_logging::{PipelineEvent, PipelineEventLogger};
use tempfile::TempDir;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::acquire::TrackAcquirer;
use crate::caption::build_caption;
use crate::gate::gate;

const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Started,
    Downloading,
    Validating,
    Sending,
    Done,
    Failed(FailureKind),
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Downloading => "downloading",
            Self::Validating => "validating",
            Self::Sending => "sending",
            Self::Done => "done",
            Self::Failed(_) => "failed",
        }
    }

    /// Status text shown while the run is in this stage.
    fn status_text(&self) -> Option<&'static str> {
        match self {
            Self::Started => Some("🔄 <b>Starting download...</b>\nPlease wait."),
            Self::Downloading => Some("📥 <b>Downloading track from SoundCloud...</b>"),
            Self::Validating => Some("🔎 <b>Checking the file...</b>"),
            Self::Sending => Some("📤 <b>Sending audio file...</b>"),
            Self::Done => None,
            Self::Failed(kind) => Some(kind.user_message()),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(kind) => write!(f, "failed({})", kind.as_str()),
            other => f.write_str(other.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Upper bound for metadata probe plus download.
    pub acquire_timeout: Duration,
    /// Parent for per-request scratch directories; system temp dir when `None`.
    pub scratch_root: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            scratch_root: None,
        }
    }
}

/// What happened during one run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub stages: Vec<Stage>,
    pub outcome: DeliveryOutcome,
}

impl PipelineRun {
    pub fn reached(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }
}

/// Category plus operator-facing detail. The detail is logged, never sent.
#[derive(Debug)]
struct Failure {
    kind: FailureKind,
    detail: String,
}

impl Failure {
    fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

struct RunState {
    run_id: Uuid,
    chat: ChatRef,
    status: Option<MessageRef>,
    stages: Vec<Stage>,
}

pub struct TrackPipeline {
    acquirer: Arc<TrackAcquirer>,
    transport: Arc<dyn ChatTransport>,
    settings: PipelineSettings,
}

impl TrackPipeline {
    pub fn new(
        acquirer: Arc<TrackAcquirer>,
        transport: Arc<dyn ChatTransport>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            acquirer,
            transport,
            settings,
        }
    }

    /// Drive one request to a terminal stage. Never fails: every error ends up
    /// as a `Failed` stage with a user-facing message.
    pub async fn run(&self, request: TrackRequest) -> PipelineRun {
        let mut state = RunState {
            run_id: Uuid::new_v4(),
            chat: request.chat,
            status: None,
            stages: Vec::new(),
        };
        info!(run_id = %state.run_id, chat = %request.chat, url = %request.source_url, "Track request received");

        self.enter(&mut state, Stage::Started).await;

        let outcome = match self.drive(&mut state, &request).await {
            Ok(size_bytes) => {
                PipelineEventLogger::log_event(
                    state.run_id,
                    state.chat.0,
                    PipelineEvent::Delivered { size_bytes },
                );
                self.enter(&mut state, Stage::Done).await;
                DeliveryOutcome::Sent
            }
            Err(failure) => {
                error!(
                    run_id = %state.run_id,
                    kind = failure.kind.as_str(),
                    detail = %soundrelay_logging::redact_sensitive_data(&failure.detail),
                    "Track request failed"
                );
                PipelineEventLogger::log_event(
                    state.run_id,
                    state.chat.0,
                    PipelineEvent::Failed {
                        kind: failure.kind.as_str().to_string(),
                        detail: failure.detail,
                    },
                );
                self.enter(&mut state, Stage::Failed(failure.kind)).await;
                DeliveryOutcome::from(failure.kind)
            }
        };

        PipelineRun {
            run_id: state.run_id,
            stages: state.stages,
            outcome,
        }
    }

    async fn drive(&self, state: &mut RunState, request: &TrackRequest) -> Result<u64, Failure> {
        self.enter(state, Stage::Downloading).await;

        let scratch = self
            .scratch_dir()
            .map_err(|e| Failure::new(FailureKind::Unclassified, format!("scratch dir: {e}")))?;
        let result = self.deliver(state, request, scratch.path()).await;

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!(run_id = %state.run_id, path = %scratch_path.display(), error = %e, "Failed to remove scratch dir");
        }
        result
    }

    async fn deliver(
        &self,
        state: &mut RunState,
        request: &TrackRequest,
        scratch: &Path,
    ) -> Result<u64, Failure> {
        let (file, metadata) = self.acquire(request, scratch).await?;

        self.enter(state, Stage::Validating).await;
        gate(&file).map_err(|rejection| Failure::new(rejection.kind(), rejection.to_string()))?;

        self.enter(state, Stage::Sending).await;
        let attachment = self.attachment(&file, &metadata).await?;
        self.transport
            .send_audio(request.chat, attachment)
            .await
            .map_err(|e| Failure::new(FailureKind::Unclassified, format!("send_audio: {e:#}")))?;

        Ok(file.size_bytes)
    }

    /// Run the acquirer on its own task so a slow download never holds up the
    /// caller, and bound it by the configured timeout.
    async fn acquire(
        &self,
        request: &TrackRequest,
        scratch: &Path,
    ) -> Result<(AcquiredFile, TrackMetadata), Failure> {
        let acquirer = Arc::clone(&self.acquirer);
        let url = request.source_url.clone();
        let dir = scratch.to_path_buf();
        let mut task = tokio::spawn(async move { acquirer.acquire(&url, &dir).await });

        match tokio::time::timeout(self.settings.acquire_timeout, &mut task).await {
            Ok(Ok(Ok(acquired))) => Ok(acquired),
            Ok(Ok(Err(e))) => Err(Failure::new(e.kind(), e.to_string())),
            Ok(Err(join_error)) => Err(Failure::new(
                FailureKind::Unclassified,
                format!("acquire task: {join_error}"),
            )),
            Err(_) => {
                task.abort();
                // Wait for the extractor to be dropped before the directory goes away.
                let _ = task.await;
                Err(Failure::new(
                    FailureKind::Timeout,
                    format!("acquisition exceeded {:?}", self.settings.acquire_timeout),
                ))
            }
        }
    }

    async fn attachment(
        &self,
        file: &AcquiredFile,
        metadata: &TrackMetadata,
    ) -> Result<AudioAttachment, Failure> {
        let data = tokio::fs::read(&file.path)
            .await
            .map_err(|e| Failure::new(FailureKind::Unclassified, format!("read audio: {e}")))?;
        let file_name = file
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("track.mp3")
            .to_string();

        Ok(AudioAttachment {
            file_name,
            data: Bytes::from(data),
            caption: build_caption(metadata, file.size_bytes),
            title: metadata.title.clone(),
            performer: metadata.uploader.clone(),
            duration_seconds: metadata.duration_seconds,
        })
    }

    fn scratch_dir(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("soundrelay-");
        match &self.settings.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }

    /// Record the transition and update the status message. Status updates are
    /// best effort: a failure is logged and the run carries on.
    async fn enter(&self, state: &mut RunState, stage: Stage) {
        state.stages.push(stage);
        PipelineEventLogger::log_event(
            state.run_id,
            state.chat.0,
            PipelineEvent::StageEntered {
                stage: stage.to_string(),
            },
        );

        let chat = state.chat;
        let result = match (stage, state.status) {
            (Stage::Started, _) => match self.transport.send_text(chat, status_text(stage)).await {
                Ok(id) => {
                    state.status = Some(id);
                    Ok(())
                }
                Err(e) => Err(e),
            },
            (Stage::Done, Some(id)) => self.transport.delete_message(chat, id).await,
            (Stage::Done, None) => Ok(()),
            (Stage::Failed(_), Some(id)) => {
                match self.transport.edit_text(chat, id, status_text(stage)).await {
                    Ok(()) => Ok(()),
                    // The failure message must reach the user; fall back to a new message.
                    Err(_) => self.transport.send_text(chat, status_text(stage)).await.map(|_| ()),
                }
            }
            (Stage::Failed(_), None) => self
                .transport
                .send_text(chat, status_text(stage))
                .await
                .map(|_| ()),
            (_, Some(id)) => self.transport.edit_text(chat, id, status_text(stage)).await,
            (_, None) => Ok(()),
        };

        if let Err(e) = result {
            warn!(
                run_id = %state.run_id,
                stage = %stage,
                error = %soundrelay_logging::redact_sensitive_data(&format!("{e:#}")),
                "Status update failed"
            );
        }
    }
}

fn status_text(stage: Stage) -> &'static str {
    stage.status_text().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{dir_entries, RecordingTransport, StubExtractor, TransportCall};

    const URL: &str = "https://soundcloud.com/artist/song-title";
    const MB: u64 = 1024 * 1024;

    struct Harness {
        pipeline: TrackPipeline,
        transport: Arc<RecordingTransport>,
        scratch_root: tempfile::TempDir,
    }

    fn harness(stub: StubExtractor, transport: RecordingTransport, timeout: Duration) -> Harness {
        let scratch_root = tempfile::tempdir().unwrap();
        let transport = Arc::new(transport);
        let pipeline = TrackPipeline::new(
            Arc::new(TrackAcquirer::new(Arc::new(stub))),
            transport.clone(),
            PipelineSettings {
                acquire_timeout: timeout,
                scratch_root: Some(scratch_root.path().to_path_buf()),
            },
        );
        Harness {
            pipeline,
            transport,
            scratch_root,
        }
    }

    fn request() -> TrackRequest {
        TrackRequest::new(URL, ChatRef(7))
    }

    #[tokio::test]
    async fn delivers_track_with_caption() {
        let stub = StubExtractor::track("Song Title", "Artist", 125).with_payload(2 * MB);
        let h = harness(stub, RecordingTransport::default(), DEFAULT_ACQUIRE_TIMEOUT);

        let run = h.pipeline.run(request()).await;

        assert_eq!(run.outcome, DeliveryOutcome::Sent);
        assert_eq!(
            run.stages,
            vec![
                Stage::Started,
                Stage::Downloading,
                Stage::Validating,
                Stage::Sending,
                Stage::Done
            ]
        );

        let audio = h.transport.audio();
        assert_eq!(audio.len(), 1);
        assert!(audio[0].caption.contains("02:05"));
        assert!(audio[0].caption.contains("Song Title"));
        assert_eq!(audio[0].file_name, "Song Title.mp3");
        assert_eq!(audio[0].performer, "Artist");
        assert_eq!(audio[0].duration_seconds, Some(125));
        assert_eq!(audio[0].data.len() as u64, 2 * MB);

        assert!(dir_entries(h.scratch_root.path()).is_empty());
    }

    #[tokio::test]
    async fn status_message_walks_through_stages_then_is_deleted() {
        let stub = StubExtractor::track("Song Title", "Artist", 125).with_payload(10);
        let h = harness(stub, RecordingTransport::default(), DEFAULT_ACQUIRE_TIMEOUT);

        h.pipeline.run(request()).await;

        let calls = h.transport.calls();
        assert!(matches!(&calls[0], TransportCall::Sent(t) if t.contains("Starting")));
        assert!(matches!(&calls[1], TransportCall::Edited(t) if t.contains("Downloading")));
        assert!(matches!(&calls[2], TransportCall::Edited(t) if t.contains("Checking")));
        assert!(matches!(&calls[3], TransportCall::Edited(t) if t.contains("Sending")));
        assert!(matches!(&calls[4], TransportCall::Audio(_)));
        assert!(matches!(&calls[5], TransportCall::Deleted));
        assert_eq!(calls.len(), 6);
    }

    #[tokio::test]
    async fn private_track_fails_with_platform_message() {
        let stub = StubExtractor::failing("ERROR: [soundcloud] 1234: This track is private");
        let h = harness(stub, RecordingTransport::default(), DEFAULT_ACQUIRE_TIMEOUT);

        let run = h.pipeline.run(request()).await;

        assert_eq!(run.outcome, DeliveryOutcome::Failed(FailureKind::NetworkOrPlatform));
        assert!(run.reached(Stage::Failed(FailureKind::NetworkOrPlatform)));
        assert!(!run.reached(Stage::Validating));
        assert_eq!(
            h.transport.last_text().as_deref(),
            Some(FailureKind::NetworkOrPlatform.user_message())
        );
        assert!(h.transport.audio().is_empty());
        assert!(dir_entries(h.scratch_root.path()).is_empty());
    }

    #[tokio::test]
    async fn oversized_track_is_rejected_before_sending() {
        let stub = StubExtractor::track("Long Mix", "DJ", 7200).with_payload(60 * MB);
        let h = harness(stub, RecordingTransport::default(), DEFAULT_ACQUIRE_TIMEOUT);

        let run = h.pipeline.run(request()).await;

        assert_eq!(run.outcome, DeliveryOutcome::RejectedTooLarge);
        assert!(run.reached(Stage::Validating));
        assert!(!run.reached(Stage::Sending));
        assert!(h.transport.audio().is_empty());
        assert_eq!(
            h.transport.last_text().as_deref(),
            Some(FailureKind::RejectedTooLarge.user_message())
        );
        assert!(dir_entries(h.scratch_root.path()).is_empty());
    }

    #[tokio::test]
    async fn empty_track_is_rejected() {
        let stub = StubExtractor::track("Silence", "Nobody", 1).with_payload(0);
        let h = harness(stub, RecordingTransport::default(), DEFAULT_ACQUIRE_TIMEOUT);

        let run = h.pipeline.run(request()).await;

        assert_eq!(run.outcome, DeliveryOutcome::RejectedEmpty);
        assert!(h.transport.audio().is_empty());
    }

    #[tokio::test]
    async fn slow_acquisition_times_out() {
        let stub = StubExtractor::track("Slow", "Artist", 10)
            .with_payload(10)
            .with_delay(Duration::from_secs(30));
        let h = harness(stub, RecordingTransport::default(), Duration::from_millis(50));

        let run = h.pipeline.run(request()).await;

        assert_eq!(run.outcome, DeliveryOutcome::Failed(FailureKind::Timeout));
        assert_eq!(
            h.transport.last_text().as_deref(),
            Some(FailureKind::Timeout.user_message())
        );
        assert!(dir_entries(h.scratch_root.path()).is_empty());
    }

    #[tokio::test]
    async fn empty_extraction_fails_without_residue() {
        let h = harness(StubExtractor::empty(), RecordingTransport::default(), DEFAULT_ACQUIRE_TIMEOUT);

        let run = h.pipeline.run(request()).await;

        assert_eq!(run.outcome, DeliveryOutcome::Failed(FailureKind::ExtractionEmpty));
        assert!(dir_entries(h.scratch_root.path()).is_empty());
    }

    #[tokio::test]
    async fn status_failures_do_not_stop_delivery() {
        let stub = StubExtractor::track("Song Title", "Artist", 125).with_payload(10);
        let h = harness(stub, RecordingTransport::failing_text(), DEFAULT_ACQUIRE_TIMEOUT);

        let run = h.pipeline.run(request()).await;

        assert_eq!(run.outcome, DeliveryOutcome::Sent);
        assert_eq!(h.transport.audio().len(), 1);
    }

    #[tokio::test]
    async fn rejected_upload_fails_from_sending() {
        let stub = StubExtractor::track("Song Title", "Artist", 125).with_payload(2 * MB);
        let h = harness(stub, RecordingTransport::failing_audio(), DEFAULT_ACQUIRE_TIMEOUT);

        let run = h.pipeline.run(request()).await;

        assert_eq!(run.outcome, DeliveryOutcome::Failed(FailureKind::Unclassified));
        assert_eq!(
            run.stages,
            vec![
                Stage::Started,
                Stage::Downloading,
                Stage::Validating,
                Stage::Sending,
                Stage::Failed(FailureKind::Unclassified),
            ]
        );
        assert_eq!(
            h.transport.last_text().as_deref(),
            Some(FailureKind::Unclassified.user_message())
        );
        assert!(!h
            .transport
            .calls()
            .iter()
            .any(|c| matches!(c, TransportCall::Deleted)));
        assert!(dir_entries(h.scratch_root.path()).is_empty());
    }

    #[tokio::test]
    async fn failure_is_sent_fresh_when_edit_fails() {
        let stub = StubExtractor::failing("ERROR: [soundcloud] This track is private");
        let h = harness(stub, RecordingTransport::failing_edits(), DEFAULT_ACQUIRE_TIMEOUT);

        let run = h.pipeline.run(request()).await;

        assert_eq!(run.outcome, DeliveryOutcome::Failed(FailureKind::NetworkOrPlatform));
        let sent: Vec<String> = h
            .transport
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                TransportCall::Sent(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], status_text(Stage::Started));
        assert_eq!(sent[1], FailureKind::NetworkOrPlatform.user_message());
    }
}
