use crate::models::audio_models::PcmFormat;
use crate::processing::endian::ByteOrder;

/// Conversion from a device's float stream to the requested PCM layout:
/// channel remix, linear-interpolation resampling, quantization.
///
/// Device backends feed it whatever the hardware delivers, one callback at a
/// time. The resampler carries its phase and the last input frame across
/// calls, so consecutive chunks join without gaps or dropped frames. The
/// output is always whole frames of `target`.
#[derive(Debug, Clone)]
pub struct FormatConverter {
    pub target: PcmFormat,
    /// Source position of the next output frame, relative to the start of
    /// the next input chunk. Never below -1, which addresses the held frame.
    position: f64,
    /// Last input frame of the previous chunk (target channel layout).
    previous: Vec<f32>,
    source_rate: u32,
}

impl FormatConverter {
    pub fn new(target: PcmFormat) -> Self {
        Self {
            target,
            position: 0.0,
            previous: Vec::new(),
            source_rate: 0,
        }
    }

    /// Forget resampler state; the next chunk starts a new stream.
    pub fn reset(&mut self) {
        self.position = 0.0;
        self.previous.clear();
        self.source_rate = 0;
    }

    /// Convert interleaved `[-1.0, 1.0]` samples into PCM bytes in `order`.
    pub fn convert(&mut self, samples: &[f32], source_rate: u32, source_channels: u16, order: ByteOrder) -> Vec<u8> {
        let remixed = self.remix(samples, source_channels);
        let resampled = self.resample(&remixed, source_rate);
        encode_pcm(&resampled, self.target.bits_per_sample, order)
    }

    /// Map interleaved frames of `source_channels` onto the target channel count.
    ///
    /// Mono targets average every channel; stereo targets duplicate a mono
    /// source or keep the first two channels of a wider one.
    pub fn remix(&self, samples: &[f32], source_channels: u16) -> Vec<f32> {
        let source_channels = source_channels.max(1) as usize;
        let target_channels = self.target.channels as usize;
        if source_channels == target_channels {
            return samples.to_vec();
        }

        let frame_count = samples.len() / source_channels;
        let mut out = Vec::with_capacity(frame_count * target_channels);
        for frame in samples.chunks_exact(source_channels) {
            if target_channels == 1 {
                let sum: f32 = frame.iter().sum();
                out.push(sum / source_channels as f32);
            } else if source_channels == 1 {
                out.push(frame[0]);
                out.push(frame[0]);
            } else {
                out.extend_from_slice(&frame[..target_channels]);
            }
        }
        out
    }

    /// Streaming linear-interpolation resampling of interleaved
    /// target-layout frames.
    ///
    /// Returns input unchanged if rates match. A change of `source_rate`
    /// restarts the stream.
    pub fn resample(&mut self, samples: &[f32], source_rate: u32) -> Vec<f32> {
        let target_rate = self.target.sample_rate;
        if source_rate == target_rate || source_rate == 0 || target_rate == 0 {
            return samples.to_vec();
        }
        if source_rate != self.source_rate {
            self.reset();
            self.source_rate = source_rate;
        }

        let channels = self.target.channels.max(1) as usize;
        let frame_count = samples.len() / channels;
        if frame_count == 0 {
            return Vec::new();
        }

        let step = source_rate as f64 / target_rate as f64;
        let frame_at = |index: i64, ch: usize| -> f32 {
            if index < 0 {
                self.previous.get(ch).copied().unwrap_or(0.0)
            } else {
                samples[index as usize * channels + ch]
            }
        };

        let mut output = Vec::with_capacity(((frame_count as f64 / step) as usize + 1) * channels);
        let mut position = self.position;
        // Interpolation needs the following frame, so the last one waits for the next chunk.
        while (position.floor() as i64) + 1 < frame_count as i64 {
            let index = position.floor() as i64;
            let fraction = (position - index as f64) as f32;
            for ch in 0..channels {
                output.push(frame_at(index, ch) * (1.0 - fraction) + frame_at(index + 1, ch) * fraction);
            }
            position += step;
        }

        self.position = position - frame_count as f64;
        let last = (frame_count - 1) * channels;
        self.previous.clear();
        self.previous.extend_from_slice(&samples[last..last + channels]);
        output
    }
}

/// Quantize `[-1.0, 1.0]` samples to 8-bit unsigned or 16-bit signed PCM.
///
/// Clamps out-of-range values. 8-bit PCM is offset binary (silence = 128),
/// as WAV expects.
pub fn encode_pcm(samples: &[f32], bits_per_sample: u16, order: ByteOrder) -> Vec<u8> {
    match bits_per_sample {
        8 => samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * 127.0 + 128.0).round() as u8)
            .collect(),
        _ => {
            let mut data = Vec::with_capacity(samples.len() * 2);
            for &sample in samples {
                let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                let bytes = match order {
                    ByteOrder::Little => value.to_le_bytes(),
                    ByteOrder::Big => value.to_be_bytes(),
                };
                data.extend_from_slice(&bytes);
            }
            data
        }
    }
}
