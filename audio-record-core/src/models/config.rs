use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use super::audio_models::{AudioInputSource, PcmFormat};
use super::error::CaptureError;

pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_CHANNELS: u16 = 1;
pub const DEFAULT_BITS_PER_SAMPLE: u16 = 16;
pub const DEFAULT_WAV_FILE: &str = "audio.wav";
/// Highest accepted sample rate in Hz.
pub const MAX_SAMPLE_RATE: u32 = 768_000;
/// Subdirectory of the system temp dir holding scratch files.
pub const STAGING_SUBDIR: &str = "audio-record";

/// Configuration for a recording session.
///
/// Cloned into the session on start, so later changes never affect a
/// capture in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfiguration {
    /// Sample rate in Hz (default: 44100).
    pub sample_rate: u32,

    /// 1 (mono) or 2 (stereo). Default: 1.
    pub channels: u16,

    /// 8 or 16. Default: 16.
    pub bits_per_sample: u16,

    /// Input source selector handed to the sample source.
    pub audio_source: AudioInputSource,

    /// Specific input device, or None for the system default.
    pub device_id: Option<String>,

    /// Where the finished WAV file is written.
    pub output_path: PathBuf,

    /// Directory for the per-session PCM scratch file.
    pub staging_directory: PathBuf,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.sample_rate == 0 || self.sample_rate > MAX_SAMPLE_RATE {
            return Err(CaptureError::ConfigurationFailed(format!(
                "sample rate must be between 1 and {} Hz, got {}",
                MAX_SAMPLE_RATE, self.sample_rate
            )));
        }
        if ![8, 16].contains(&self.bits_per_sample) {
            return Err(CaptureError::ConfigurationFailed(format!(
                "unsupported bits per sample: {}",
                self.bits_per_sample
            )));
        }
        if ![1, 2].contains(&self.channels) {
            return Err(CaptureError::ConfigurationFailed(format!(
                "unsupported channel count: {}",
                self.channels
            )));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(CaptureError::ConfigurationFailed("output path is empty".into()));
        }
        Ok(())
    }

    pub fn format(&self) -> PcmFormat {
        PcmFormat::new(self.sample_rate, self.channels, self.bits_per_sample)
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            bits_per_sample: DEFAULT_BITS_PER_SAMPLE,
            audio_source: AudioInputSource::default(),
            device_id: None,
            output_path: PathBuf::from(DEFAULT_WAV_FILE),
            staging_directory: std::env::temp_dir().join(STAGING_SUBDIR),
        }
    }
}

/// Capture-loop policy constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturePolicy {
    /// Non-empty buffers dropped at the start of every session (start-up click).
    pub warmup_buffers: u32,

    /// Device buffer size as a multiple of the source's minimum buffer size.
    pub device_buffer_multiplier: usize,
}

impl Default for CapturePolicy {
    fn default() -> Self {
        Self {
            warmup_buffers: 2,
            device_buffer_multiplier: 3,
        }
    }
}

/// Host-facing recording options, as received from the embedding application.
///
/// Every field is optional; missing fields take the documented defaults,
/// present but invalid fields are rejected by [`RecordOptions::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOptions {
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub bits_per_sample: Option<u16>,
    pub audio_source: Option<AudioInputSource>,
    pub wav_file: Option<String>,
    pub device_id: Option<String>,
}

impl RecordOptions {
    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        serde_json::from_str(json)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("invalid options: {}", e)))
    }

    /// Resolve into a validated configuration. The WAV file lands under
    /// `storage_root`; absolute paths and `..` components are refused.
    pub fn resolve(&self, storage_root: &Path) -> Result<CaptureConfiguration, CaptureError> {
        let wav_file = self.wav_file.as_deref().unwrap_or(DEFAULT_WAV_FILE);
        let relative = Path::new(wav_file);
        let escapes_root = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if wav_file.is_empty() || escapes_root {
            return Err(CaptureError::ConfigurationFailed(format!(
                "wav file must be a relative path inside the storage root: {:?}",
                wav_file
            )));
        }

        let config = CaptureConfiguration {
            sample_rate: self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE),
            channels: self.channels.unwrap_or(DEFAULT_CHANNELS),
            bits_per_sample: self.bits_per_sample.unwrap_or(DEFAULT_BITS_PER_SAMPLE),
            audio_source: self.audio_source.unwrap_or_default(),
            device_id: self.device_id.clone(),
            output_path: storage_root.join(relative),
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }
}
