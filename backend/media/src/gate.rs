//! Pre-send validation of an acquired file.

use soundrelay_core::{AcquiredFile, FailureKind, MAX_ATTACHMENT_BYTES};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateRejection {
    #[error("acquired file is missing")]
    RejectedMissing,

    #[error("acquired file is empty")]
    RejectedEmpty,

    #[error("acquired file is {size_bytes} bytes, over the attachment limit")]
    RejectedTooLarge { size_bytes: u64 },
}

impl GateRejection {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::RejectedMissing => FailureKind::DownloadedFileMissing,
            Self::RejectedEmpty => FailureKind::RejectedEmpty,
            Self::RejectedTooLarge { .. } => FailureKind::RejectedTooLarge,
        }
    }
}

/// Check existence, then emptiness, then the attachment ceiling.
pub fn gate(file: &AcquiredFile) -> Result<(), GateRejection> {
    if !file.path.is_file() {
        return Err(GateRejection::RejectedMissing);
    }
    match file.size_bytes {
        0 => Err(GateRejection::RejectedEmpty),
        size if size > MAX_ATTACHMENT_BYTES => {
            Err(GateRejection::RejectedTooLarge { size_bytes: size })
        }
        _ => Ok(()),
    }
}
