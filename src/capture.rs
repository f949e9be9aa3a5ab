//! Capture session lifecycle: acquire, configure, start, stop, finalize

use std::rc::Rc;

use crate::device::{AudioDevice, CaptureHandle, SessionGuard};
use crate::platform::Platform;
use crate::probe::CapabilityState;
use crate::{Error, Result};

/// Owns at most one recording at a time
pub struct CaptureManager {
    device: Rc<dyn AudioDevice>,
    platform: Rc<dyn Platform>,
    session: Option<SessionGuard<dyn CaptureHandle>>,
}

impl CaptureManager {
    /// Create a manager with no active session
    #[must_use]
    pub fn new(device: Rc<dyn AudioDevice>, platform: Rc<dyn Platform>) -> Self {
        Self {
            device,
            platform,
            session: None,
        }
    }

    /// Whether a recording is in progress
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(SessionGuard::is_active)
    }

    /// Start recording
    ///
    /// Does nothing if a recording is already in progress.
    ///
    /// # Errors
    ///
    /// Returns `CaptureUnavailable` if the probe found no usable microphone,
    /// `PermissionDenied` if permission is not granted, or the device error
    /// if configuring or opening the microphone fails. No session is kept
    /// on error.
    pub async fn start(&mut self, capability: CapabilityState) -> Result<()> {
        if !capability.available {
            return Err(Error::CaptureUnavailable);
        }

        if self.is_active() {
            tracing::debug!("capture already active");
            return Ok(());
        }

        if !self.device.request_permission().await? {
            return Err(Error::PermissionDenied);
        }

        self.device
            .configure_mode(self.platform.capture_mode())
            .await?;

        let handle = self.device.acquire_capture().await?;
        self.session = Some(SessionGuard::new(handle));

        tracing::info!("recording started");
        Ok(())
    }

    /// Stop recording and finalize it to a URI
    ///
    /// Returns `Ok(None)` when no recording is in progress. The device
    /// session is released on every path.
    ///
    /// # Errors
    ///
    /// Returns `NoRecordingProduced` if the device yields no URI,
    /// `IncompleteRecording` if the platform requires a completion flag the
    /// device did not set, or the device error if stopping fails
    pub async fn stop(&mut self) -> Result<Option<String>> {
        let Some(mut session) = self.session.take() else {
            return Ok(None);
        };

        let outcome = match session.get_mut() {
            Some(handle) => handle.stop().await,
            None => return Ok(None),
        };
        session.release();
        let outcome = outcome?;

        let uri = outcome.uri.clone().ok_or(Error::NoRecordingProduced)?;

        if let Err(e) = self.platform.verify_recording(&outcome) {
            self.platform.discard_recording(&uri).await;
            return Err(e);
        }

        tracing::info!(uri = %uri, "recording finalized");
        Ok(Some(uri))
    }

    /// Release any open recording without finalizing it
    pub fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.release();
            tracing::debug!("capture session released on teardown");
        }
    }
}
