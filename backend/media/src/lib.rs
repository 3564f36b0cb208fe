//! Track acquisition and delivery.
//!
//! Link recognition, file naming, the yt-dlp extractor, the acquirer that
//! drives it, the pre-send gate, and the pipeline tying them to a chat.

pub mod acquire;
pub mod caption;
pub mod gate;
pub mod link;
pub mod pipeline;
pub mod sanitize;
pub mod ytdlp;

#[cfg(test)]
pub(crate) mod testing;

pub use acquire::{TrackAcquirer, FALLBACK_EXTENSIONS};
pub use caption::{build_caption, format_duration};
pub use gate::{gate, GateRejection};
pub use link::match_track_url;
pub use pipeline::{PipelineRun, PipelineSettings, Stage, TrackPipeline};
pub use sanitize::{sanitize_filename, MAX_FILENAME_CHARS};
pub use ytdlp::{YtDlpExtractor, YtDlpOptions};
