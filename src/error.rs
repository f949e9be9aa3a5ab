//! Error types for the voice turn controller

use thiserror::Error;

/// Result type alias for talkback operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during a voice turn
#[derive(Debug, Error)]
pub enum Error {
    /// Capture was requested but the probe found no usable microphone
    #[error("audio capture is not available")]
    CaptureUnavailable,

    /// The platform refused microphone access
    #[error("microphone permission denied")]
    PermissionDenied,

    /// Finalizing the capture produced no recording URI
    #[error("no recording was produced")]
    NoRecordingProduced,

    /// The device did not report the recording as finished
    #[error("recording did not complete")]
    IncompleteRecording,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The assistant service answered with a non-success status
    #[error("transport error {status}: {body}")]
    Transport {
        /// HTTP status code
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// Reply could not be staged or started
    #[error("playback preparation failed: {0}")]
    PlaybackPreparation(String),

    /// Base64 or blob conversion failure
    #[error("decode error: {0}")]
    Decode(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
