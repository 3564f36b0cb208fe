//! Structured logging for soundrelay.
//!
//! Console and rolling NDJSON output, secret redaction, and the per-run
//! pipeline event log.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{PipelineEvent, PipelineEventEntry, PipelineEventLogger};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
