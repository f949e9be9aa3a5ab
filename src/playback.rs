//! Playback session lifecycle: stage, release previous, load, start

use std::rc::Rc;

use crate::device::{AudioDevice, PlaybackHandle, PlaybackSource, SessionGuard};
use crate::platform::Platform;
use crate::{Error, Result};

/// A reply bound to a device session
struct LoadedReply {
    session: SessionGuard<dyn PlaybackHandle>,
    source: PlaybackSource,
}

/// Owns at most one loaded reply at a time
pub struct PlaybackManager {
    device: Rc<dyn AudioDevice>,
    platform: Rc<dyn Platform>,
    loaded: Option<LoadedReply>,
}

/// Keep decode failures distinct, fold everything else into preparation errors
fn preparation_error(e: Error) -> Error {
    match e {
        Error::Decode(_) | Error::PlaybackPreparation(_) => e,
        other => Error::PlaybackPreparation(other.to_string()),
    }
}

impl PlaybackManager {
    /// Create a manager with nothing loaded
    #[must_use]
    pub fn new(device: Rc<dyn AudioDevice>, platform: Rc<dyn Platform>) -> Self {
        Self {
            device,
            platform,
            loaded: None,
        }
    }

    /// Whether a reply session is currently held
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Stage the reply, swap it in for the previous one, and start playing
    ///
    /// Returns once playback has started; the audio keeps playing until the
    /// session is replaced or torn down.
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` if the payload cannot be converted, otherwise
    /// `Error::PlaybackPreparation`
    pub async fn play(&mut self, payload: Vec<u8>) -> Result<()> {
        if payload.is_empty() {
            return Err(Error::PlaybackPreparation(
                "reply payload is empty".to_string(),
            ));
        }

        let source = self
            .platform
            .stage_reply(payload)
            .await
            .map_err(preparation_error)?;

        self.unload();

        match self.load_and_start(&source).await {
            Ok(session) => {
                tracing::info!(source = %source.describe(), "reply playing");
                self.loaded = Some(LoadedReply { session, source });
                Ok(())
            }
            Err(e) => {
                self.platform.discard_reply(&source);
                Err(preparation_error(e))
            }
        }
    }

    async fn load_and_start(
        &self,
        source: &PlaybackSource,
    ) -> Result<SessionGuard<dyn PlaybackHandle>> {
        let handle = self.device.acquire_playback(source).await?;
        let mut session = SessionGuard::new(handle);

        if let Some(mode) = self.platform.playback_mode() {
            self.device.configure_mode(mode).await?;
        }

        if let Some(handle) = session.get_mut() {
            handle.start().await?;
        }

        Ok(session)
    }

    /// Release the loaded reply, if any
    pub fn unload(&mut self) {
        if let Some(mut loaded) = self.loaded.take() {
            loaded.session.release();
            self.platform.discard_reply(&loaded.source);
            tracing::debug!(source = %loaded.source.describe(), "previous reply released");
        }
    }
}
