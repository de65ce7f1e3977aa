use crate::models::audio_models::{AudioInputSource, AudioSource, PcmFormat};
use crate::models::error::CaptureError;
use crate::processing::endian::ByteOrder;

/// Parameters for opening a sample source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub audio_source: AudioInputSource,
    pub device_id: Option<String>,
    pub format: PcmFormat,
    /// Suggested size of the device-side buffer in bytes.
    pub buffer_size_hint: usize,
}

/// An open, started stream of raw PCM bytes.
///
/// Pulled by the capture loop on its own thread. `read` may block briefly
/// (at most about one buffer duration) and returns 0 when nothing is ready
/// yet. Returned lengths are always whole frames.
pub trait SampleSource: Send {
    /// Fill `buffer` with up to `buffer.len()` bytes, returning the count.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, CaptureError>;

    /// Actual sample rate of the delivered stream.
    fn sample_rate(&self) -> u32;

    /// Actual channel count of the delivered stream.
    fn channel_count(&self) -> u16;

    /// Byte order of delivered 16-bit samples.
    fn byte_order(&self) -> ByteOrder {
        ByteOrder::native()
    }

    /// Stop the stream and release the device.
    fn close(&mut self) -> Result<(), CaptureError>;
}

/// Factory for sample sources backed by a platform audio API.
pub trait SampleSourceProvider: Send + Sync {
    type Source: SampleSource + 'static;

    /// Whether any capture device is present.
    fn is_available(&self) -> bool;

    /// Input devices that can be selected through `OpenRequest::device_id`.
    fn available_sources(&self) -> Result<Vec<AudioSource>, CaptureError> {
        Ok(Vec::new())
    }

    /// Smallest read size, in bytes, the source supports for `format`.
    fn min_buffer_size(&self, format: &PcmFormat) -> Result<usize, CaptureError>;

    /// Open and start the source. Device and permission failures surface here.
    fn open(&self, request: &OpenRequest) -> Result<Self::Source, CaptureError>;
}
