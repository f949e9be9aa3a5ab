//! Startup check for a usable microphone

use crate::device::AudioDevice;

/// Whether audio capture can be used on this host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilityState {
    /// Permission was explicitly granted
    pub available: bool,
}

/// Ask the device for capture permission
///
/// Never fails: a missing capture subsystem or a permission API error both
/// count as unavailable.
pub async fn probe(device: &dyn AudioDevice) -> CapabilityState {
    let available = match device.request_permission().await {
        Ok(true) => true,
        Ok(false) => {
            tracing::warn!("microphone permission not granted");
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, "capability probe failed");
            false
        }
    };

    tracing::info!(available, "capture capability probed");
    CapabilityState { available }
}
