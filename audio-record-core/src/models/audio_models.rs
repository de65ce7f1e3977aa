use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Input source selector, numbered like Android's `MediaRecorder.AudioSource`
/// so host payloads can pass the integer straight through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum AudioInputSource {
    Default,
    Mic,
    VoiceUplink,
    VoiceDownlink,
    VoiceCall,
    Camcorder,
    /// Input tuned for speech recognition (AGC and noise suppression off).
    #[default]
    VoiceRecognition,
    VoiceCommunication,
    RemoteSubmix,
    Unprocessed,
    VoicePerformance,
}

impl AudioInputSource {
    pub fn code(self) -> u32 {
        match self {
            Self::Default => 0,
            Self::Mic => 1,
            Self::VoiceUplink => 2,
            Self::VoiceDownlink => 3,
            Self::VoiceCall => 4,
            Self::Camcorder => 5,
            Self::VoiceRecognition => 6,
            Self::VoiceCommunication => 7,
            Self::RemoteSubmix => 8,
            Self::Unprocessed => 9,
            Self::VoicePerformance => 10,
        }
    }
}

impl TryFrom<u32> for AudioInputSource {
    type Error = CaptureError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => Self::Default,
            1 => Self::Mic,
            2 => Self::VoiceUplink,
            3 => Self::VoiceDownlink,
            4 => Self::VoiceCall,
            5 => Self::Camcorder,
            6 => Self::VoiceRecognition,
            7 => Self::VoiceCommunication,
            8 => Self::RemoteSubmix,
            9 => Self::Unprocessed,
            10 => Self::VoicePerformance,
            other => {
                return Err(CaptureError::ConfigurationFailed(format!(
                    "unknown audio source: {}",
                    other
                )))
            }
        })
    }
}

impl From<AudioInputSource> for u32 {
    fn from(source: AudioInputSource) -> Self {
        source.code()
    }
}

/// Linear PCM stream layout shared by the source, the meter and the WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl PcmFormat {
    pub fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample / 8) as usize
    }

    /// Bytes in one frame (one sample for every channel).
    pub fn block_align(&self) -> usize {
        self.bytes_per_sample() * self.channels as usize
    }

    /// Bytes per second, or None when it does not fit the 32-bit WAV field.
    pub fn byte_rate(&self) -> Option<u32> {
        u32::try_from(self.block_align()).ok()?.checked_mul(self.sample_rate)
    }

    /// Loudness metering is only defined for 16-bit mono streams.
    pub fn metering_supported(&self) -> bool {
        self.bits_per_sample == 16 && self.channels == 1
    }
}

/// An audio input device available for capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_source_round_trips_through_code() {
        for code in 0..=10 {
            let source = AudioInputSource::try_from(code).unwrap();
            assert_eq!(source.code(), code);
        }
        assert!(AudioInputSource::try_from(11).is_err());
    }

    #[test]
    fn input_source_defaults_to_voice_recognition() {
        assert_eq!(AudioInputSource::default().code(), 6);
    }

    #[test]
    fn input_source_deserializes_from_integer() {
        let source: AudioInputSource = serde_json::from_str("1").unwrap();
        assert_eq!(source, AudioInputSource::Mic);
        assert!(serde_json::from_str::<AudioInputSource>("42").is_err());
    }

    #[test]
    fn derived_sizes() {
        let format = PcmFormat::new(44100, 2, 16);
        assert_eq!(format.bytes_per_sample(), 2);
        assert_eq!(format.block_align(), 4);
        assert_eq!(format.byte_rate(), Some(176_400));

        let format = PcmFormat::new(8000, 1, 8);
        assert_eq!(format.block_align(), 1);
        assert_eq!(format.byte_rate(), Some(8000));

        assert_eq!(PcmFormat::new(u32::MAX / 2, 2, 16).byte_rate(), None);
    }

    #[test]
    fn metering_only_for_16_bit_mono() {
        assert!(PcmFormat::new(16000, 1, 16).metering_supported());
        assert!(!PcmFormat::new(16000, 2, 16).metering_supported());
        assert!(!PcmFormat::new(16000, 1, 8).metering_supported());
        assert!(!PcmFormat::new(16000, 2, 8).metering_supported());
    }
}
