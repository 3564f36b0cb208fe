//! Fetches a track into a caller-owned scratch directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use soundrelay_core::{AcquireError, AcquiredFile, MediaExtractor, TrackMetadata};
use tokio::fs;
use tracing::{debug, info};

use crate::sanitize::sanitize_filename;

/// Extensions probed, in order, when the extractor did not leave an `.mp3` behind.
pub const FALLBACK_EXTENSIONS: [&str; 4] = ["mp3", "m4a", "opus", "webm"];

/// Stem used when the title sanitizes to nothing.
const FALLBACK_STEM: &str = "track";

/// Longest stem on disk, in bytes. Leaves room for an extension under the
/// usual 255-byte file name limit.
const MAX_STEM_BYTES: usize = 240;

pub struct TrackAcquirer {
    extractor: Arc<dyn MediaExtractor>,
}

impl TrackAcquirer {
    pub fn new(extractor: Arc<dyn MediaExtractor>) -> Self {
        Self { extractor }
    }

    /// Probe metadata, download the audio into `scratch_dir`, and make sure it
    /// ends up at `<sanitized title>.mp3`.
    pub async fn acquire(
        &self,
        url: &str,
        scratch_dir: &Path,
    ) -> Result<(AcquiredFile, TrackMetadata), AcquireError> {
        let info = self
            .extractor
            .probe(url)
            .await?
            .ok_or(AcquireError::ExtractionEmpty)?;
        let metadata = TrackMetadata::from(&info);

        let stem_name = match sanitize_filename(info.title.as_deref().unwrap_or_default()) {
            s if s.is_empty() => FALLBACK_STEM.to_string(),
            s => fit_stem(&s).to_string(),
        };
        let target = scratch_dir.join(format!("{stem_name}.mp3"));

        info!(
            extractor = self.extractor.name(),
            url,
            title = %metadata.title,
            "Downloading track"
        );
        self.extractor
            .download(url, &scratch_dir.join(&stem_name))
            .await?;

        if !fs::try_exists(&target).await? {
            let found = find_fallback(scratch_dir, &stem_name)
                .await?
                .ok_or(AcquireError::DownloadedFileMissing)?;
            debug!(from = %found.display(), to = %target.display(), "Renaming fallback artifact");
            fs::rename(&found, &target).await?;
        }

        let size_bytes = fs::metadata(&target).await?.len();
        Ok((
            AcquiredFile {
                path: target,
                size_bytes,
            },
            metadata,
        ))
    }
}

/// Cut `stem` to at most [`MAX_STEM_BYTES`] on a char boundary.
fn fit_stem(stem: &str) -> &str {
    if stem.len() <= MAX_STEM_BYTES {
        return stem;
    }
    let mut end = MAX_STEM_BYTES;
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    stem[..end].trim_end()
}

async fn find_fallback(dir: &Path, stem: &str) -> Result<Option<PathBuf>, AcquireError> {
    for ext in FALLBACK_EXTENSIONS {
        let candidate = dir.join(format!("{stem}.{ext}"));
        if fs::try_exists(&candidate).await? {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}
