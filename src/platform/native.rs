//! Native platform: file URIs, device completion checks, persisted reply

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::multipart::Part;

use super::{Platform, PlatformKind};
use crate::cache::ReplyCache;
use crate::device::{AudioMode, CaptureOutcome, PlaybackSource};
use crate::{Error, Result};

/// Platform that records to files and caches the reply on disk
pub struct NativePlatform {
    cache: ReplyCache,
}

impl NativePlatform {
    /// Create a native platform caching replies under `cache_dir`
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache: ReplyCache::new(cache_dir),
        }
    }

    /// Reply cache used for staging
    #[must_use]
    pub const fn cache(&self) -> &ReplyCache {
        &self.cache
    }
}

/// Strip a `file://` scheme, leaving a filesystem path
fn uri_to_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

/// MIME type declared for a recording, by extension
fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "wav" => "audio/wav",
        "m4a" => "audio/m4a",
        "mp3" => "audio/mpeg",
        "webm" => "audio/webm",
        "caf" => "audio/x-caf",
        "3gp" => "audio/3gpp",
        _ => "application/octet-stream",
    }
}

#[async_trait(?Send)]
impl Platform for NativePlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Native
    }

    fn playback_mode(&self) -> Option<AudioMode> {
        Some(AudioMode::PLAYBACK)
    }

    fn verify_recording(&self, outcome: &CaptureOutcome) -> Result<()> {
        if outcome.finished {
            Ok(())
        } else {
            Err(Error::IncompleteRecording)
        }
    }

    async fn audio_part(&self, uri: &str) -> Result<Part> {
        let path = uri_to_path(uri);
        let file = tokio::fs::File::open(&path).await?;
        let len = file.metadata().await?.len();

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("recording")
            .to_string();
        let mime = mime_for_path(&path);

        tracing::debug!(path = %path.display(), bytes = len, mime, "recording attached by URI");

        Ok(Part::stream_with_length(reqwest::Body::from(file), len)
            .file_name(file_name)
            .mime_str(mime)?)
    }

    async fn stage_reply(&self, payload: Vec<u8>) -> Result<PlaybackSource> {
        let encoded = ReplyCache::encode(&payload);
        let path = self.cache.write_base64(&encoded).await?;
        Ok(PlaybackSource::File(path))
    }

    fn discard_reply(&self, _source: &PlaybackSource) {
        // The cache file stays until the next reply overwrites it
    }

    async fn discard_recording(&self, uri: &str) {
        let path = uri_to_path(uri);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "recording removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove recording");
            }
        }
    }
}
