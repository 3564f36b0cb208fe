pub mod error;
pub mod traits;
pub mod types;

pub use error::{AcquireError, FailureKind};
pub use traits::{ChatTransport, MediaExtractor};
pub use types::{
    AcquiredFile, AudioAttachment, ChatRef, DeliveryOutcome, ExtractedInfo, MessageRef,
    TrackMetadata, TrackRequest, MAX_ATTACHMENT_BYTES,
};
