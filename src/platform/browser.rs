//! Browser-like platform: recordings and replies stay in memory

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::Part;

use super::{Platform, PlatformKind};
use crate::blob::{BLOB_SCHEME, BlobStore};
use crate::device::{CaptureOutcome, PlaybackSource};
use crate::{Error, Result};

/// Platform backed by a [`BlobStore`]
pub struct BrowserPlatform {
    blobs: BlobStore,
    client: reqwest::Client,
}

impl BrowserPlatform {
    /// Create a browser platform sharing `blobs` with the device
    ///
    /// `timeout` bounds fetching `http(s)` recording URIs.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(blobs: BlobStore, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { blobs, client })
    }

    /// Resolve a recording URI to its bytes
    async fn dereference(&self, uri: &str) -> Result<Vec<u8>> {
        if uri.starts_with(BLOB_SCHEME) {
            return self
                .blobs
                .get(uri)
                .ok_or_else(|| Error::Decode(format!("unknown blob: {uri}")));
        }

        if uri.starts_with("http://") || uri.starts_with("https://") {
            let response = self.client.get(uri).send().await?.error_for_status()?;
            return Ok(response.bytes().await?.to_vec());
        }

        Err(Error::Decode(format!("cannot dereference recording URI: {uri}")))
    }
}

/// File name and MIME type for recorded bytes
fn describe_recording(data: &[u8]) -> (&'static str, &'static str) {
    if data.starts_with(b"RIFF") {
        ("recording.wav", "audio/wav")
    } else {
        ("recording.webm", "audio/webm")
    }
}

#[async_trait(?Send)]
impl Platform for BrowserPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Browser
    }

    fn playback_mode(&self) -> Option<crate::device::AudioMode> {
        None
    }

    fn verify_recording(&self, _outcome: &CaptureOutcome) -> Result<()> {
        // The browser recorder has no completion flag
        Ok(())
    }

    async fn audio_part(&self, uri: &str) -> Result<Part> {
        let data = self.dereference(uri).await?;
        let (file_name, mime) = describe_recording(&data);

        tracing::debug!(uri, bytes = data.len(), mime, "recording read as blob");

        Ok(Part::bytes(data).file_name(file_name).mime_str(mime)?)
    }

    async fn stage_reply(&self, payload: Vec<u8>) -> Result<PlaybackSource> {
        let uri = self.blobs.create(payload.clone());
        Ok(PlaybackSource::Blob { uri, data: payload })
    }

    fn discard_reply(&self, source: &PlaybackSource) {
        if let PlaybackSource::Blob { uri, .. } = source {
            self.blobs.revoke(uri);
        }
    }

    async fn discard_recording(&self, uri: &str) {
        if self.blobs.revoke(uri) {
            tracing::debug!(uri, "recording blob revoked");
        }
    }
}
