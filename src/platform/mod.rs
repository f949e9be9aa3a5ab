//! Platform branches
//!
//! A browser-like host and a native mobile host record, upload and play audio
//! differently. Each is one [`Platform`] implementation, picked once at
//! startup, so the interaction code never checks which one it is running on.

mod browser;
mod native;

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::multipart::Part;

pub use browser::BrowserPlatform;
pub use native::NativePlatform;

use crate::blob::BlobStore;
use crate::device::{AudioMode, CaptureOutcome, PlaybackSource};
use crate::{Config, Error, Result};

/// Which platform branch to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformKind {
    /// In-memory blobs, no persisted files
    Browser,
    /// File URIs and a persisted reply cache
    Native,
}

impl FromStr for PlatformKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "browser" | "web" => Ok(Self::Browser),
            "native" | "mobile" => Ok(Self::Native),
            other => Err(Error::Config(format!("unknown platform: {other}"))),
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Browser => write!(f, "browser"),
            Self::Native => write!(f, "native"),
        }
    }
}

/// Platform-specific steps of a voice turn
#[async_trait(?Send)]
pub trait Platform {
    /// Which branch this is
    fn kind(&self) -> PlatformKind;

    /// Audio mode applied before recording
    fn capture_mode(&self) -> AudioMode {
        AudioMode::CAPTURE
    }

    /// Audio mode applied before playback, if the platform reconfigures
    fn playback_mode(&self) -> Option<AudioMode>;

    /// Check the device's report on a stopped recording
    ///
    /// # Errors
    ///
    /// Returns `Error::IncompleteRecording` if the platform requires a
    /// completion flag the device did not set
    fn verify_recording(&self, outcome: &CaptureOutcome) -> Result<()>;

    /// Build the `file` part of the upload from a recording URI
    async fn audio_part(&self, uri: &str) -> Result<Part>;

    /// Turn reply bytes into something a playback session can load
    async fn stage_reply(&self, payload: Vec<u8>) -> Result<PlaybackSource>;

    /// Forget a staged reply once its playback session is released
    fn discard_reply(&self, source: &PlaybackSource);

    /// Remove a recording that is no longer needed
    async fn discard_recording(&self, uri: &str);
}

/// Build the platform branch selected in `config`
///
/// `blobs` backs the browser branch, the configured cache dir the native one.
///
/// # Errors
///
/// Returns error if the browser branch's HTTP client cannot be built
pub fn for_kind(config: &Config, blobs: BlobStore) -> Result<Rc<dyn Platform>> {
    let platform: Rc<dyn Platform> = match config.platform {
        PlatformKind::Browser => Rc::new(BrowserPlatform::new(blobs, config.timeout)?),
        PlatformKind::Native => Rc::new(NativePlatform::new(config.cache_dir.clone())),
    };
    Ok(platform)
}
