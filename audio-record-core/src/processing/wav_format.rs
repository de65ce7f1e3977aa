/// WAV container header.
///
/// Canonical 44-byte RIFF/PCM header with only `fmt ` and `data` chunks.
/// It is built once the staged PCM length is known, so no field is ever
/// patched after the fact.
use crate::models::audio_models::PcmFormat;
use crate::models::error::CaptureError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Bytes counted by the RIFF chunk size on top of the PCM data.
const RIFF_OVERHEAD: u32 = 36;

/// Largest data chunk a 32-bit RIFF size field can describe.
pub const MAX_DATA_LEN: u64 = (u32::MAX - RIFF_OVERHEAD) as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub total_audio_len: u32,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl WavHeader {
    /// Header for `total_audio_len` bytes of PCM in `format`.
    pub fn for_data(format: &PcmFormat, total_audio_len: u64) -> Result<Self, CaptureError> {
        if total_audio_len > MAX_DATA_LEN {
            return Err(CaptureError::StorageError(format!(
                "recording of {} bytes exceeds the WAV size limit",
                total_audio_len
            )));
        }
        if format.byte_rate().is_none() {
            return Err(CaptureError::ConfigurationFailed(format!(
                "byte rate of {:?} exceeds the WAV field",
                format
            )));
        }
        Ok(Self {
            total_audio_len: total_audio_len as u32,
            sample_rate: format.sample_rate,
            channels: format.channels,
            bits_per_sample: format.bits_per_sample,
        })
    }

    /// Saturates at `u32::MAX`; [`WavHeader::for_data`] rejects formats
    /// that would need it.
    pub fn byte_rate(&self) -> u32 {
        let rate = self.sample_rate as u64 * self.channels as u64 * self.bits_per_sample as u64 / 8;
        u32::try_from(rate).unwrap_or(u32::MAX)
    }

    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    /// Layout:
    /// ```text
    /// [0-3]    "RIFF"
    /// [4-7]    36 + data_size
    /// [8-11]   "WAVE"
    /// [12-15]  "fmt "
    /// [16-19]  16 (PCM format chunk size)
    /// [20-21]  1 (PCM format code)
    /// [22-23]  channels
    /// [24-27]  sample_rate
    /// [28-31]  byte_rate = sample_rate * channels * bits / 8
    /// [32-33]  block_align = channels * bits / 8
    /// [34-35]  bits_per_sample
    /// [36-39]  "data"
    /// [40-43]  data_size
    /// ```
    pub fn to_bytes(&self) -> [u8; WAV_HEADER_SIZE] {
        let mut header = [0u8; WAV_HEADER_SIZE];

        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&(RIFF_OVERHEAD + self.total_audio_len).to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");

        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&16u32.to_le_bytes());
        header[20..22].copy_from_slice(&1u16.to_le_bytes());
        header[22..24].copy_from_slice(&self.channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());

        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&self.total_audio_len.to_le_bytes());

        header
    }

    /// Parse a canonical header. Returns `None` for anything that is not a
    /// 44-byte PCM header with consistent chunk sizes.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < WAV_HEADER_SIZE {
            return None;
        }
        let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        let u32_at = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);

        if &bytes[0..4] != b"RIFF"
            || &bytes[8..12] != b"WAVE"
            || &bytes[12..16] != b"fmt "
            || &bytes[36..40] != b"data"
            || u32_at(16) != 16
            || u16_at(20) != 1
        {
            return None;
        }

        let header = Self {
            total_audio_len: u32_at(40),
            sample_rate: u32_at(24),
            channels: u16_at(22),
            bits_per_sample: u16_at(34),
        };
        let consistent = u32_at(4) == header.total_audio_len.checked_add(RIFF_OVERHEAD)?
            && u32_at(28) == header.byte_rate()
            && u16_at(32) == header.block_align();
        consistent.then_some(header)
    }
}
