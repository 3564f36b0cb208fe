//! Pipeline Event Logger
//!
//! One structured record per stage transition or failure of a track run,
//! emitted under the `pipeline_events` target so it can be filtered apart.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageEntered {
        stage: String,
    },
    Failed {
        kind: String,
        detail: String,
    },
    Delivered {
        size_bytes: u64,
    },
}

#[derive(Debug, Serialize)]
pub struct PipelineEventEntry {
    pub run_id: Uuid,
    pub chat_id: i64,
    pub timestamp: DateTime<Utc>,
    pub event: PipelineEvent,
}

pub struct PipelineEventLogger;

impl PipelineEventLogger {
    /// Build the log entry for `event`, with failure details redacted.
    pub fn entry(run_id: Uuid, chat_id: i64, mut event: PipelineEvent) -> PipelineEventEntry {
        if let PipelineEvent::Failed { detail, .. } = &mut event {
            *detail = redact_sensitive_data(detail);
        }
        PipelineEventEntry {
            run_id,
            chat_id,
            timestamp: Utc::now(),
            event,
        }
    }

    pub fn log_event(run_id: Uuid, chat_id: i64, event: PipelineEvent) {
        let entry = Self::entry(run_id, chat_id, event);
        match serde_json::to_string(&entry) {
            Ok(json) => info!(target: "pipeline_events", %run_id, event = %json, "Pipeline event"),
            Err(_) => info!(target: "pipeline_events", %run_id, event = ?entry, "Pipeline event"),
        }
    }
}
