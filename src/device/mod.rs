//! Audio device capability interface
//!
//! The controller reaches microphones and speakers only through these traits.
//! [`CpalDevice`] drives the desktop default devices; tests plug in a fake.
//!
//! Everything here runs on a single-threaded runtime, so the traits are
//! `?Send` and handles may hold thread-affine driver objects.

mod desktop;

use std::path::PathBuf;

use async_trait::async_trait;

pub use desktop::{CpalDevice, SAMPLE_RATE, RecordingSink, decode_mp3, samples_to_wav};

use crate::Result;

/// Audio session mode requested from the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioMode {
    /// Microphone may be open
    pub allows_recording: bool,
    /// Audio keeps playing when the ringer is muted
    pub plays_in_silent_mode: bool,
    /// Session survives the app being backgrounded
    pub stays_active_in_background: bool,
    /// Lower other apps' audio while we hold the session
    pub duck_others: bool,
    /// Route output to the earpiece instead of the speaker
    pub play_through_earpiece: bool,
}

impl AudioMode {
    /// Mode used while recording an utterance
    pub const CAPTURE: Self = Self {
        allows_recording: true,
        plays_in_silent_mode: true,
        stays_active_in_background: true,
        duck_others: true,
        play_through_earpiece: false,
    };

    /// Mode used while playing a reply
    pub const PLAYBACK: Self = Self {
        allows_recording: false,
        plays_in_silent_mode: true,
        stays_active_in_background: true,
        duck_others: false,
        play_through_earpiece: false,
    };
}

/// What the device reports when a capture is stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    /// Where the recording was finalized to, if anything was recorded
    pub uri: Option<String>,
    /// Device confirms the recording was fully written
    pub finished: bool,
}

/// Audio a playback session is loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSource {
    /// Transient in-memory handle
    Blob {
        /// `blob:` URI registered in the blob store
        uri: String,
        /// Encoded audio
        data: Vec<u8>,
    },
    /// Persisted file
    File(PathBuf),
}

impl PlaybackSource {
    /// URI-ish description for logs
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Blob { uri, .. } => uri.clone(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// Synchronous resource release, usable from `Drop`
pub trait Release {
    /// Give the underlying device claim back
    ///
    /// Must be safe to call more than once
    fn release(&mut self);
}

/// An active recording
#[async_trait(?Send)]
pub trait CaptureHandle: Release {
    /// Stop recording and finalize the audio
    async fn stop(&mut self) -> Result<CaptureOutcome>;
}

/// A loaded reply
#[async_trait(?Send)]
pub trait PlaybackHandle: Release {
    /// Begin playback; returns once audio has started
    async fn start(&mut self) -> Result<()>;
}

/// Platform audio capability
#[async_trait(?Send)]
pub trait AudioDevice {
    /// Ask for microphone permission
    ///
    /// Returns `Ok(true)` only when access is explicitly granted
    async fn request_permission(&self) -> Result<bool>;

    /// Apply an audio session mode
    async fn configure_mode(&self, mode: AudioMode) -> Result<()>;

    /// Open the microphone and start recording
    async fn acquire_capture(&self) -> Result<Box<dyn CaptureHandle>>;

    /// Load a reply for playback
    async fn acquire_playback(&self, source: &PlaybackSource) -> Result<Box<dyn PlaybackHandle>>;
}

/// Single owner of a device handle
///
/// The handle is released exactly once: explicitly via [`SessionGuard::release`]
/// or when the guard is dropped.
pub struct SessionGuard<H: Release + ?Sized> {
    handle: Option<Box<H>>,
}

impl<H: Release + ?Sized> SessionGuard<H> {
    /// Take ownership of a freshly acquired handle
    #[must_use]
    pub fn new(handle: Box<H>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Borrow the handle if it has not been released
    pub fn get_mut(&mut self) -> Option<&mut H> {
        self.handle.as_deref_mut()
    }

    /// Whether the handle is still held
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Release the handle now
    pub fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.release();
        }
    }
}

impl<H: Release + ?Sized> Drop for SessionGuard<H> {
    fn drop(&mut self) {
        self.release();
    }
}
