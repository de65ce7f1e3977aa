//! cpal microphone sample source.
//!
//! The cpal callback converts whatever the device delivers (f32/i16/u16,
//! any rate, any channel count) into the requested PCM layout and pushes it
//! into a jitter ring buffer. The capture thread pulls whole frames out of
//! that buffer through [`SampleSource::read`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};

use audio_record_core::models::audio_models::{AudioSource, PcmFormat};
use audio_record_core::models::error::CaptureError;
use audio_record_core::processing::convert::FormatConverter;
use audio_record_core::processing::endian::ByteOrder;
use audio_record_core::processing::ring_buffer::RingBuffer;
use audio_record_core::traits::sample_source::{OpenRequest, SampleSource, SampleSourceProvider};

use crate::device_enumerator::DeviceEnumerator;
use crate::permissions::classify_device_error;

/// Duration of the smallest read handed to the capture loop.
const MIN_BUFFER_DURATION_MS: u32 = 40;
/// Longest a single `read` blocks waiting for a full buffer.
const READ_TIMEOUT: Duration = Duration::from_millis(100);
/// Longest `open` waits for the stream thread to report readiness.
const OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Hands out [`CpalSampleSource`]s on the platform's default cpal host.
///
/// The audio input source selector is advisory: desktop hosts have a single
/// capture path per device, so it is only logged.
#[derive(Debug, Default, Clone)]
pub struct CpalSourceProvider;

impl CpalSourceProvider {
    pub fn new() -> Self {
        Self
    }
}

impl SampleSourceProvider for CpalSourceProvider {
    type Source = CpalSampleSource;

    fn is_available(&self) -> bool {
        DeviceEnumerator::new().has_capture_device()
    }

    fn available_sources(&self) -> Result<Vec<AudioSource>, CaptureError> {
        DeviceEnumerator::new().list_capture_devices()
    }

    fn min_buffer_size(&self, format: &PcmFormat) -> Result<usize, CaptureError> {
        min_buffer_bytes(format)
    }

    fn open(&self, request: &OpenRequest) -> Result<CpalSampleSource, CaptureError> {
        CpalSampleSource::open(request)
    }
}

fn min_buffer_bytes(format: &PcmFormat) -> Result<usize, CaptureError> {
    let frame = format.block_align();
    if format.sample_rate == 0 || frame == 0 {
        return Err(CaptureError::ConfigurationFailed(format!("unsupported format {:?}", format)));
    }
    let frames = (format.sample_rate as u64 * MIN_BUFFER_DURATION_MS as u64 / 1000).max(1);
    usize::try_from(frames)
        .ok()
        .and_then(|frames| frames.checked_mul(frame))
        .ok_or_else(|| CaptureError::ConfigurationFailed(format!("buffer for {:?} is too large", format)))
}

/// State shared between the cpal callback and the pulling side.
struct Shared {
    ring: Mutex<RingBuffer<u8>>,
    data_ready: Condvar,
    failure: Mutex<Option<CaptureError>>,
    overrun_bytes: AtomicU64,
}

impl Shared {
    fn push(&self, bytes: &[u8]) {
        let dropped = self.ring.lock().write(bytes);
        if dropped > 0 {
            let total = self.overrun_bytes.fetch_add(dropped as u64, Ordering::Relaxed) + dropped as u64;
            log::warn!("capture buffer overrun: dropped {} bytes ({} total)", dropped, total);
        }
        self.data_ready.notify_one();
    }

    fn fail(&self, error: CaptureError) {
        let mut failure = self.failure.lock();
        if failure.is_none() {
            *failure = Some(error);
        }
        drop(failure);
        self.data_ready.notify_all();
    }
}

/// Running cpal input stream delivering PCM in the requested format.
pub struct CpalSampleSource {
    format: PcmFormat,
    shared: Arc<Shared>,
    shutdown: Option<Sender<()>>,
    stream_thread: Option<thread::JoinHandle<()>>,
}

impl CpalSampleSource {
    /// Open the device and start streaming.
    ///
    /// The stream lives on its own thread because cpal streams are not
    /// `Send` on every host.
    pub fn open(request: &OpenRequest) -> Result<Self, CaptureError> {
        let format = request.format;
        let frame = format.block_align().max(1);
        let capacity = request.buffer_size_hint.max(frame).div_ceil(frame) * frame;
        let shared = Arc::new(Shared {
            ring: Mutex::new(RingBuffer::new(capacity)),
            data_ready: Condvar::new(),
            failure: Mutex::new(None),
            overrun_bytes: AtomicU64::new(0),
        });

        log::debug!(
            "opening input {:?} (source {:?}) with a {} byte jitter buffer",
            request.device_id.as_deref().unwrap_or("default"),
            request.audio_source,
            capacity
        );

        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let device_id = request.device_id.clone();
        let stream_shared = Arc::clone(&shared);
        let stream_thread = thread::Builder::new()
            .name("audio-record-cpal".into())
            .spawn(move || run_stream(device_id, format, stream_shared, ready_tx, shutdown_rx))
            .map_err(|e| CaptureError::Unknown(format!("failed to spawn stream thread: {}", e)))?;

        let mut source = Self {
            format,
            shared,
            shutdown: Some(shutdown_tx),
            stream_thread: Some(stream_thread),
        };

        let ready = ready_rx
            .recv_timeout(OPEN_TIMEOUT)
            .unwrap_or_else(|_| Err(CaptureError::DeviceNotAvailable("input stream did not start".into())));
        if let Err(e) = ready {
            source.shutdown_stream();
            return Err(e);
        }
        Ok(source)
    }

    /// Bytes discarded because the capture thread fell behind the device.
    pub fn overrun_bytes(&self) -> u64 {
        self.shared.overrun_bytes.load(Ordering::Relaxed)
    }

    fn shutdown_stream(&mut self) {
        // Dropping the sender wakes the stream thread.
        self.shutdown.take();
        if let Some(handle) = self.stream_thread.take() {
            if handle.join().is_err() {
                log::error!("cpal stream thread panicked");
            }
        }
    }
}

impl SampleSource for CpalSampleSource {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, CaptureError> {
        if let Some(error) = self.shared.failure.lock().clone() {
            return Err(error);
        }

        let frame = self.format.block_align().max(1);
        let wanted = buffer.len() / frame * frame;
        if wanted == 0 {
            return Ok(0);
        }

        let mut ring = self.shared.ring.lock();
        if ring.count() < wanted {
            self.shared.data_ready.wait_for(&mut ring, READ_TIMEOUT);
        }
        let available = ring.count().min(wanted) / frame * frame;
        Ok(ring.read_into(&mut buffer[..available]))
    }

    fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    fn channel_count(&self) -> u16 {
        self.format.channels
    }

    fn byte_order(&self) -> ByteOrder {
        ByteOrder::native()
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        self.shutdown_stream();
        Ok(())
    }
}

impl Drop for CpalSampleSource {
    fn drop(&mut self) {
        if self.stream_thread.is_some() {
            log::debug!("dropping open cpal source, stopping stream");
            self.shutdown_stream();
        }
    }
}

/// Body of the stream thread: build, play, park until shutdown.
fn run_stream(
    device_id: Option<String>,
    format: PcmFormat,
    shared: Arc<Shared>,
    ready: Sender<Result<(), CaptureError>>,
    shutdown: Receiver<()>,
) {
    let stream = match build_stream(device_id.as_deref(), format, Arc::clone(&shared)) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = ready.send(Err(classify_device_error(&e.to_string())));
        return;
    }
    if ready.send(Ok(())).is_err() {
        return;
    }

    // Returns once the sender side is dropped.
    let _ = shutdown.recv();
    drop(stream);
    log::debug!("cpal input stream stopped");
}

fn build_stream(device_id: Option<&str>, format: PcmFormat, shared: Arc<Shared>) -> Result<cpal::Stream, CaptureError> {
    let device = DeviceEnumerator::new().find_capture_device(device_id)?;
    let supported = device
        .default_input_config()
        .map_err(|e| classify_device_error(&e.to_string()))?;

    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    log::info!(
        "input device {:?}: {} Hz, {} ch, {:?} -> {} Hz, {} ch, {} bit",
        device.name().unwrap_or_else(|_| "unknown".into()),
        config.sample_rate.0,
        config.channels,
        sample_format,
        format.sample_rate,
        format.channels,
        format.bits_per_sample
    );

    let converter = FormatConverter::new(format);
    match sample_format {
        SampleFormat::F32 => build_stream_typed::<f32>(&device, &config, converter, shared),
        SampleFormat::I16 => build_stream_typed::<i16>(&device, &config, converter, shared),
        SampleFormat::U16 => build_stream_typed::<u16>(&device, &config, converter, shared),
        other => Err(CaptureError::ConfigurationFailed(format!(
            "unsupported device sample format: {:?}",
            other
        ))),
    }
}

fn build_stream_typed<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut converter: FormatConverter,
    shared: Arc<Shared>,
) -> Result<cpal::Stream, CaptureError>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let device_rate = config.sample_rate.0;
    let device_channels = config.channels;
    let error_shared = Arc::clone(&shared);
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                scratch.clear();
                scratch.extend(data.iter().map(|&s| f32::from_sample_(s)));
                let pcm = converter.convert(&scratch, device_rate, device_channels, ByteOrder::native());
                shared.push(&pcm);
            },
            move |err: cpal::StreamError| {
                log::error!("input stream error: {}", err);
                error_shared.fail(classify_device_error(&err.to_string()));
            },
            None,
        )
        .map_err(|e| classify_device_error(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared(capacity: usize) -> Arc<Shared> {
        Arc::new(Shared {
            ring: Mutex::new(RingBuffer::new(capacity)),
            data_ready: Condvar::new(),
            failure: Mutex::new(None),
            overrun_bytes: AtomicU64::new(0),
        })
    }

    /// A source wired to a shared buffer but without a device behind it.
    fn detached(format: PcmFormat, shared: Arc<Shared>) -> CpalSampleSource {
        CpalSampleSource {
            format,
            shared,
            shutdown: None,
            stream_thread: None,
        }
    }

    #[test]
    fn min_buffer_is_forty_milliseconds_of_frames() {
        assert_eq!(min_buffer_bytes(&PcmFormat::new(16000, 1, 16)).unwrap(), 640 * 2);
        assert_eq!(min_buffer_bytes(&PcmFormat::new(44100, 2, 16)).unwrap(), 1764 * 4);
        assert_eq!(min_buffer_bytes(&PcmFormat::new(8000, 1, 8)).unwrap(), 320);
        assert!(min_buffer_bytes(&PcmFormat::new(0, 1, 16)).is_err());
        assert_eq!(
            min_buffer_bytes(&PcmFormat::new(u32::MAX, 2, 16)).unwrap(),
            (u32::MAX as usize * 40 / 1000) * 4
        );
    }

    #[test]
    fn reads_return_whole_frames_only() {
        let shared = shared(64);
        shared.push(&[1, 2, 3, 4, 5]);
        let mut source = detached(PcmFormat::new(16000, 2, 16), Arc::clone(&shared));

        let mut buffer = [0u8; 16];
        assert_eq!(source.read(&mut buffer).unwrap(), 4);
        assert_eq!(&buffer[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn read_times_out_with_zero_when_idle() {
        let mut source = detached(PcmFormat::new(16000, 1, 16), shared(64));
        let mut buffer = [0u8; 32];
        assert_eq!(source.read(&mut buffer).unwrap(), 0);
    }

    #[test]
    fn read_wakes_when_the_callback_delivers() {
        let shared = shared(1024);
        let mut source = detached(PcmFormat::new(16000, 1, 16), Arc::clone(&shared));
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            shared.push(&[7u8; 32]);
        });

        let mut buffer = [0u8; 32];
        let mut total = 0;
        while total == 0 {
            total = source.read(&mut buffer).unwrap();
        }
        producer.join().unwrap();
        assert_eq!(total, 32);
    }

    #[test]
    fn stream_errors_surface_on_the_next_read() {
        let shared = shared(64);
        shared.fail(CaptureError::DeviceNotAvailable("unplugged".into()));
        let mut source = detached(PcmFormat::new(16000, 1, 16), shared);

        let mut buffer = [0u8; 32];
        assert!(matches!(source.read(&mut buffer), Err(CaptureError::DeviceNotAvailable(_))));
    }

    #[test]
    fn overruns_are_counted() {
        let shared = shared(8);
        shared.push(&[0u8; 8]);
        shared.push(&[0u8; 4]);
        let source = detached(PcmFormat::new(16000, 1, 16), shared);
        assert_eq!(source.overrun_bytes(), 4);
    }
}
