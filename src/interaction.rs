//! Voice turn state machine
//!
//! Drives one turn at a time through record, upload and playback:
//!
//! ```text
//!  Unavailable            (probe said no microphone)
//!
//!  Idle ──start──▶ Capturing ──stop──▶ AwaitingReply ──done/failed──▶ Idle
//! ```
//!
//! Every stage error is logged and ends the turn at `Idle`; nothing is
//! returned to the caller. Observers read [`InteractionStatus`] through
//! [`Interaction::subscribe`].

use std::rc::Rc;

use tokio::sync::watch;

use crate::capture::CaptureManager;
use crate::device::AudioDevice;
use crate::playback::PlaybackManager;
use crate::platform::Platform;
use crate::probe::{CapabilityState, probe};
use crate::transport::TransportClient;
use crate::{Error, Result};

/// Where the current turn is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    /// No usable microphone; capture requests are refused
    Unavailable,
    /// Ready for a new turn
    Idle,
    /// Recording the user
    Capturing,
    /// Recording stopped; finalizing, uploading, starting the reply
    AwaitingReply,
}

/// Flags exposed to the embedding caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InteractionStatus {
    /// A recording is in progress
    pub capturing: bool,
    /// A reply is being fetched or prepared
    pub awaiting_reply: bool,
    /// The microphone can be used
    pub capture_available: bool,
}

impl InteractionState {
    /// Flags for this state
    #[must_use]
    pub const fn status(self) -> InteractionStatus {
        InteractionStatus {
            capturing: matches!(self, Self::Capturing),
            awaiting_reply: matches!(self, Self::AwaitingReply),
            capture_available: !matches!(self, Self::Unavailable),
        }
    }
}

/// The voice turn controller
pub struct Interaction {
    state: InteractionState,
    capability: CapabilityState,
    status_tx: watch::Sender<InteractionStatus>,
    platform: Rc<dyn Platform>,
    capture: CaptureManager,
    transport: TransportClient,
    playback: PlaybackManager,
}

impl Interaction {
    /// Probe the device once and build an idle controller
    pub async fn new(
        device: Rc<dyn AudioDevice>,
        platform: Rc<dyn Platform>,
        transport: TransportClient,
    ) -> Self {
        let capability = probe(device.as_ref()).await;
        let state = if capability.available {
            InteractionState::Idle
        } else {
            InteractionState::Unavailable
        };
        let (status_tx, _) = watch::channel(state.status());

        tracing::debug!(platform = %platform.kind(), ?state, "interaction ready");

        Self {
            state,
            capability,
            status_tx,
            capture: CaptureManager::new(Rc::clone(&device), Rc::clone(&platform)),
            playback: PlaybackManager::new(device, Rc::clone(&platform)),
            platform,
            transport,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> InteractionState {
        self.state
    }

    /// Current flags
    #[must_use]
    pub const fn status(&self) -> InteractionStatus {
        self.state.status()
    }

    /// Result of the startup probe
    #[must_use]
    pub const fn capability(&self) -> CapabilityState {
        self.capability
    }

    /// Watch the flags as they change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<InteractionStatus> {
        self.status_tx.subscribe()
    }

    /// Whether a reply session is currently held
    #[must_use]
    pub fn has_reply_loaded(&self) -> bool {
        self.playback.is_loaded()
    }

    fn transition(&mut self, next: InteractionState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "state change");
            self.state = next;
            self.status_tx.send_replace(next.status());
        }
    }

    /// Begin recording a turn
    ///
    /// Refused while unavailable or while another turn is active.
    pub async fn start_capture(&mut self) {
        match self.state {
            InteractionState::Unavailable => {
                tracing::error!(error = %Error::CaptureUnavailable, "cannot start recording");
            }
            InteractionState::Capturing | InteractionState::AwaitingReply => {
                tracing::warn!(state = ?self.state, "turn already active, start ignored");
            }
            InteractionState::Idle => match self.capture.start(self.capability).await {
                Ok(()) => self.transition(InteractionState::Capturing),
                Err(e) => {
                    tracing::error!(error = %e, "failed to start recording");
                }
            },
        }
    }

    /// Stop recording and run the rest of the turn
    ///
    /// A no-op unless a recording is in progress. Returns once the reply has
    /// started playing or the turn has failed; either way the state is `Idle`.
    pub async fn stop_capture(&mut self) {
        if self.state != InteractionState::Capturing {
            tracing::debug!(state = ?self.state, "no recording to stop");
            return;
        }

        self.transition(InteractionState::AwaitingReply);

        if let Err(e) = self.finish_turn().await {
            if let Error::Transport { status, body } = &e {
                tracing::error!(status, body = %body, "turn aborted by assistant service");
            } else {
                tracing::error!(error = %e, "turn aborted");
            }
        }

        self.transition(InteractionState::Idle);
    }

    async fn finish_turn(&mut self) -> Result<()> {
        let uri = self
            .capture
            .stop()
            .await?
            .ok_or(Error::NoRecordingProduced)?;

        let sent = self.transport.send(self.platform.as_ref(), &uri).await;
        self.platform.discard_recording(&uri).await;

        self.playback.play(sent?).await
    }

    /// Release any held microphone or speaker session
    pub fn shutdown(&mut self) {
        self.capture.teardown();
        self.playback.unload();
        if self.state != InteractionState::Unavailable {
            self.transition(InteractionState::Idle);
        }
    }
}

impl Drop for Interaction {
    fn drop(&mut self) {
        self.shutdown();
    }
}
