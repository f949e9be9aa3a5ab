//! talkback - push-to-talk voice turns against a remote assistant
//!
//! One turn records the user, uploads the recording with a fixed persona
//! prompt, and plays the synthesized reply:
//! - Capability probe (is the microphone usable)
//! - Capture and playback session management
//! - Multipart upload to the assistant's `/talk` endpoint
//! - The interaction state machine tying them together
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   Interaction                        │
//! │   Idle → Capturing → AwaitingReply → Idle           │
//! └───────┬───────────────┬──────────────────┬──────────┘
//!         │               │                  │
//! ┌───────▼──────┐ ┌──────▼───────┐ ┌────────▼────────┐
//! │   Capture    │ │  Transport   │ │    Playback     │
//! └───────┬──────┘ └──────┬───────┘ └────────┬────────┘
//!         │               │                  │
//! ┌───────▼───────────────▼──────────────────▼──────────┐
//! │   AudioDevice  │  Platform (browser | native)       │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod blob;
pub mod cache;
pub mod capture;
pub mod config;
pub mod device;
pub mod error;
pub mod interaction;
pub mod platform;
pub mod playback;
pub mod probe;
pub mod transport;

pub use blob::BlobStore;
pub use cache::ReplyCache;
pub use config::Config;
pub use device::{AudioDevice, AudioMode, CaptureOutcome, CpalDevice, PlaybackSource};
pub use error::{Error, Result};
pub use interaction::{Interaction, InteractionState, InteractionStatus};
pub use platform::{Platform, PlatformKind};
pub use probe::{CapabilityState, probe};
pub use transport::TransportClient;
