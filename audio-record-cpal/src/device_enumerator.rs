//! Input device enumeration via the cpal default host.
//!
//! cpal exposes no stable endpoint IDs, so the device name doubles as the
//! identifier handed back through `OpenRequest::device_id`.

use cpal::traits::{DeviceTrait, HostTrait};

use audio_record_core::models::audio_models::AudioSource;
use audio_record_core::models::error::CaptureError;

/// Audio device enumerator over the platform's default cpal host.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Whether the host reports a default capture device.
    pub fn has_capture_device(&self) -> bool {
        self.host.default_input_device().is_some()
    }

    /// Name of the default capture device.
    pub fn default_capture_device_id(&self) -> Option<String> {
        self.host.default_input_device().and_then(|d| d.name().ok())
    }

    /// List capture (microphone) devices, default first.
    pub fn list_capture_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
        let default_id = self.default_capture_device_id();
        let devices = self
            .host
            .input_devices()
            .map_err(|e| CaptureError::DeviceNotAvailable(format!("failed to list input devices: {}", e)))?;

        let mut sources: Vec<AudioSource> = devices
            .filter_map(|device| match device.name() {
                Ok(name) => Some(name),
                Err(e) => {
                    log::debug!("skipping input device without a name: {}", e);
                    None
                }
            })
            .map(|name| AudioSource {
                is_default: default_id.as_deref() == Some(name.as_str()),
                id: name.clone(),
                name,
            })
            .collect();

        sources.sort_by_key(|s| !s.is_default);
        sources.dedup_by(|a, b| a.id == b.id);
        Ok(sources)
    }

    /// Resolve a capture device by ID, or the default one when `id` is None.
    pub fn find_capture_device(&self, id: Option<&str>) -> Result<cpal::Device, CaptureError> {
        match id {
            None => self
                .host
                .default_input_device()
                .ok_or_else(|| CaptureError::DeviceNotAvailable("no default input device".into())),
            Some(id) => {
                let mut devices = self
                    .host
                    .input_devices()
                    .map_err(|e| CaptureError::DeviceNotAvailable(format!("failed to list input devices: {}", e)))?;
                devices
                    .find(|d| d.name().map(|n| n == id).unwrap_or(false))
                    .ok_or_else(|| CaptureError::DeviceNotAvailable(format!("input device not found: {}", id)))
            }
        }
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}
