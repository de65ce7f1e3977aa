//! Microphone permission detection.
//!
//! cpal has no permission API. Hosts that gate the microphone (macOS TCC,
//! Windows privacy settings, PipeWire portals) fail stream creation with a
//! backend-specific message instead, so those messages are classified here.

use cpal::traits::DeviceTrait;

use audio_record_core::models::error::CaptureError;

use crate::device_enumerator::DeviceEnumerator;

const DENIAL_MARKERS: [&str; 4] = ["permission", "access denied", "not permitted", "unauthorized"];

/// Check whether the default microphone can be configured.
///
/// Returns `Ok(false)` when no device exists or access was refused.
pub fn check_microphone_permission() -> Result<bool, CaptureError> {
    let enumerator = DeviceEnumerator::new();
    let device = match enumerator.find_capture_device(None) {
        Ok(device) => device,
        Err(_) => return Ok(false),
    };

    match device.default_input_config() {
        Ok(_) => Ok(true),
        Err(e) => match classify_device_error(&e.to_string()) {
            CaptureError::PermissionDenied => Ok(false),
            CaptureError::DeviceNotAvailable(_) => Ok(false),
            other => Err(other),
        },
    }
}

/// Map a cpal error message onto the recorder's error taxonomy.
pub fn classify_device_error(message: &str) -> CaptureError {
    let lower = message.to_ascii_lowercase();
    if DENIAL_MARKERS.iter().any(|m| lower.contains(m)) {
        CaptureError::PermissionDenied
    } else if lower.contains("not available") || lower.contains("no such device") || lower.contains("disconnected") {
        CaptureError::DeviceNotAvailable(message.to_string())
    } else {
        CaptureError::ConfigurationFailed(message.to_string())
    }
}
