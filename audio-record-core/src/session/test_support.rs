//! Scripted sample sources and recording delegates shared by session tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::audio_models::PcmFormat;
use crate::models::error::CaptureError;
use crate::models::metering::MeteringEvent;
use crate::models::state::CaptureState;
use crate::processing::endian::ByteOrder;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::sample_source::{OpenRequest, SampleSource, SampleSourceProvider};

pub(crate) fn pcm16(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// `count` samples of a 440 Hz sine at `rate`, 16-bit little-endian.
pub(crate) fn sine_pcm16(count: usize, rate: u32, offset: usize) -> Vec<u8> {
    let samples: Vec<i16> = (offset..offset + count)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * 440.0 * i as f64 / rate as f64;
            (phase.sin() * 12000.0) as i16
        })
        .collect();
    pcm16(&samples)
}

pub(crate) fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// Source that replays a fixed list of reads, then idles (or fails).
pub(crate) struct ScriptedSource {
    script: VecDeque<Vec<u8>>,
    byte_order: ByteOrder,
    format: PcmFormat,
    fail_when_drained: bool,
    stop_when_drained: Option<Arc<AtomicBool>>,
    reads: usize,
    delivered: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Vec<u8>>) -> Self {
        Self {
            script: script.into(),
            byte_order: ByteOrder::Little,
            format: PcmFormat::new(16000, 1, 16),
            fail_when_drained: false,
            stop_when_drained: None,
            reads: 0,
            delivered: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    /// Return a device error once the script is exhausted.
    pub fn fail_after_script(mut self) -> Self {
        self.fail_when_drained = true;
        self
    }

    /// Flag that flips to true once the script is exhausted.
    pub fn stop_when_drained(&mut self) -> Arc<AtomicBool> {
        let stop = Arc::new(AtomicBool::new(false));
        self.stop_when_drained = Some(Arc::clone(&stop));
        stop
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl SampleSource for ScriptedSource {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, CaptureError> {
        self.reads += 1;
        match self.script.pop_front() {
            Some(chunk) => {
                let n = chunk.len().min(buffer.len());
                buffer[..n].copy_from_slice(&chunk[..n]);
                if n > 0 {
                    self.delivered.fetch_add(1, Ordering::SeqCst);
                }
                Ok(n)
            }
            None if self.fail_when_drained => Err(CaptureError::DeviceNotAvailable("scripted failure".into())),
            None => {
                match &self.stop_when_drained {
                    Some(stop) => stop.store(true, Ordering::Release),
                    None => thread::sleep(Duration::from_millis(1)),
                }
                Ok(0)
            }
        }
    }

    fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    fn channel_count(&self) -> u16 {
        self.format.channels
    }

    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Provider handing out [`ScriptedSource`]s that replay the same script.
pub(crate) struct ScriptedProvider {
    script: Vec<Vec<u8>>,
    min_buffer: usize,
    fail_after_script: bool,
    open_error: Option<CaptureError>,
    delivered: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
    last_request: Mutex<Option<OpenRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Vec<u8>>, min_buffer: usize) -> Self {
        Self {
            script,
            min_buffer,
            fail_after_script: false,
            open_error: None,
            delivered: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing_open(error: CaptureError) -> Self {
        let mut provider = Self::new(Vec::new(), 320);
        provider.open_error = Some(error);
        provider
    }

    pub fn fail_after_script(mut self) -> Self {
        self.fail_after_script = true;
        self
    }

    /// Non-empty buffers handed out across all sessions.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close flag shared with every source, readable after the provider is gone.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    pub fn last_request(&self) -> Option<OpenRequest> {
        self.last_request.lock().clone()
    }
}

impl SampleSourceProvider for ScriptedProvider {
    type Source = ScriptedSource;

    fn is_available(&self) -> bool {
        self.open_error.is_none()
    }

    fn min_buffer_size(&self, _format: &PcmFormat) -> Result<usize, CaptureError> {
        Ok(self.min_buffer)
    }

    fn open(&self, request: &OpenRequest) -> Result<ScriptedSource, CaptureError> {
        if let Some(error) = &self.open_error {
            return Err(error.clone());
        }
        *self.last_request.lock() = Some(request.clone());
        let mut source = ScriptedSource::new(self.script.clone());
        source.format = request.format;
        source.fail_when_drained = self.fail_after_script;
        source.delivered = Arc::clone(&self.delivered);
        source.closed = Arc::clone(&self.closed);
        Ok(source)
    }
}

/// Delegate that remembers everything it was told.
#[derive(Default)]
pub(crate) struct RecordingDelegate {
    events: Mutex<Vec<MeteringEvent>>,
    states: Mutex<Vec<CaptureState>>,
    errors: Mutex<Vec<CaptureError>>,
}

impl RecordingDelegate {
    pub fn events(&self) -> Vec<MeteringEvent> {
        self.events.lock().clone()
    }

    pub fn state_names(&self) -> Vec<&'static str> {
        self.states.lock().iter().map(CaptureState::name).collect()
    }

    pub fn errors(&self) -> Vec<CaptureError> {
        self.errors.lock().clone()
    }
}

impl CaptureDelegate for RecordingDelegate {
    fn on_state_changed(&self, state: &CaptureState) {
        self.states.lock().push(state.clone());
    }

    fn on_metering(&self, event: &MeteringEvent) {
        self.events.lock().push(*event);
    }

    fn on_error(&self, error: &CaptureError) {
        self.errors.lock().push(error.clone());
    }
}
