use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::audio_models::{AudioSource, PcmFormat};
use crate::models::config::{CaptureConfiguration, CapturePolicy};
use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::CaptureState;
use crate::session::capture_loop::{run_capture_loop, LoopSettings};
use crate::storage::staging_writer::{cleanup_stale_staging_files, StagingFile, StagingWriter};
use crate::storage::wav_finalizer::finalize_wav;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::sample_source::{OpenRequest, SampleSource, SampleSourceProvider};

type Outcome = Result<RecordingResult, CaptureError>;

/// Control-path state guarded by one mutex, so "is a session active" and
/// "signal its stop" can never interleave.
struct Control {
    config: Option<CaptureConfiguration>,
    active: Option<ActiveSession>,
}

struct ActiveSession {
    id: Uuid,
    stop: Arc<AtomicBool>,
    result_rx: Receiver<Outcome>,
    worker: thread::JoinHandle<()>,
}

/// Everything the capture thread needs, moved onto it at start.
struct SessionContext {
    id: Uuid,
    config: CaptureConfiguration,
    settings: LoopSettings,
    stop: Arc<AtomicBool>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
    state: Arc<Mutex<CaptureState>>,
}

/// Clears the "previous session still finalizing" flag on every exit path.
struct FinalizingGuard(Arc<AtomicBool>);

impl Drop for FinalizingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Result of a stopped session that may still be finalizing.
///
/// Exactly one outcome is produced per stop. If the capture thread dies
/// without reporting, `wait` returns [`CaptureError::Unknown`].
pub struct PendingRecording {
    session_id: Uuid,
    result_rx: Receiver<Outcome>,
    worker: Option<thread::JoinHandle<()>>,
}

impl PendingRecording {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Block until finalization completes.
    pub fn wait(mut self) -> Outcome {
        let outcome = self.result_rx.recv().unwrap_or_else(|_| Err(worker_lost()));
        self.join_worker();
        outcome
    }

    /// Wait at most `timeout`. On timeout the pending result is handed back
    /// untouched; finalization keeps running.
    pub fn wait_timeout(mut self, timeout: Duration) -> Result<Outcome, PendingRecording> {
        match self.result_rx.recv_timeout(timeout) {
            Ok(outcome) => {
                self.join_worker();
                Ok(outcome)
            }
            Err(RecvTimeoutError::Timeout) => Err(self),
            Err(RecvTimeoutError::Disconnected) => {
                self.join_worker();
                Ok(Err(worker_lost()))
            }
        }
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("capture thread for session {} panicked", self.session_id);
            }
        }
    }
}

fn worker_lost() -> CaptureError {
    CaptureError::Unknown("capture thread exited without a result".into())
}

/// Records one session at a time from a [`SampleSourceProvider`] into a WAV file.
///
/// ```text
/// [SampleSource] → warm-up drop → LE normalize → [Meter → delegate]
///                                              → [StagingWriter] → finalize_wav → WAV
/// ```
///
/// Control methods take `&self`; share the recorder through an `Arc` to
/// stop from another thread than the one that started.
pub struct AudioRecorder<P: SampleSourceProvider> {
    provider: P,
    policy: CapturePolicy,
    delegate: Option<Arc<dyn CaptureDelegate>>,
    control: Mutex<Control>,
    state: Arc<Mutex<CaptureState>>,
    finalizing: Arc<AtomicBool>,
}

impl<P: SampleSourceProvider> AudioRecorder<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            policy: CapturePolicy::default(),
            delegate: None,
            control: Mutex::new(Control {
                config: None,
                active: None,
            }),
            state: Arc::new(Mutex::new(CaptureState::Idle)),
            finalizing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_policy(mut self, policy: CapturePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn state(&self) -> CaptureState {
        self.state.lock().clone()
    }

    pub fn is_capturing(&self) -> bool {
        self.control.lock().active.is_some()
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_available()
    }

    pub fn available_audio_sources(&self) -> Result<Vec<AudioSource>, CaptureError> {
        self.provider.available_sources()
    }

    /// Apply configuration for the next session. Transitions: → ready.
    pub fn configure(&self, config: CaptureConfiguration) -> Result<(), CaptureError> {
        config.validate()?;

        let mut control = self.control.lock();
        if control.active.is_some() || self.finalizing.load(Ordering::Acquire) {
            return Err(CaptureError::AlreadyRecording);
        }
        control.config = Some(config);
        self.set_state(CaptureState::Ready);
        Ok(())
    }

    /// Open the source and start capturing on a dedicated thread.
    ///
    /// Device failures are returned here and no session is created.
    pub fn start_capture(&self) -> Result<(), CaptureError> {
        let mut control = self.control.lock();
        if control.active.is_some() || self.finalizing.load(Ordering::Acquire) {
            return Err(CaptureError::AlreadyRecording);
        }
        let config = control.config.clone().ok_or(CaptureError::NotConfigured)?;
        if !self.state.lock().can_start() {
            return Err(CaptureError::NotConfigured);
        }
        let requested = config.format();

        let buffer_size = session_buffer_size(self.provider.min_buffer_size(&requested)?, &requested);
        let request = OpenRequest {
            audio_source: config.audio_source,
            device_id: config.device_id.clone(),
            format: requested,
            buffer_size_hint: buffer_size * self.policy.device_buffer_multiplier.max(1),
        };

        let mut source = self.provider.open(&request)?;
        let (staging, writer) = match StagingFile::create(&config.staging_directory) {
            Ok(staging) => staging,
            Err(e) => {
                if let Err(close_err) = source.close() {
                    log::warn!("failed to close source after staging error: {}", close_err);
                }
                return Err(e);
            }
        };

        let delivered = PcmFormat::new(source.sample_rate(), source.channel_count(), requested.bits_per_sample);
        if delivered != requested {
            log::warn!("source delivers {:?} instead of requested {:?}", delivered, requested);
        }

        let id = Uuid::new_v4();
        let stop = Arc::new(AtomicBool::new(false));
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);
        let context = SessionContext {
            id,
            config,
            settings: LoopSettings {
                buffer_size,
                warmup_buffers: self.policy.warmup_buffers,
                format: delivered,
            },
            stop: Arc::clone(&stop),
            delegate: self.delegate.clone(),
            state: Arc::clone(&self.state),
        };

        // Published before the worker exists, so its terminal state always wins.
        self.set_state(CaptureState::Capturing);
        self.finalizing.store(true, Ordering::Release);
        let finalizing = FinalizingGuard(Arc::clone(&self.finalizing));
        let spawned = thread::Builder::new()
            .name("audio-record-capture".into())
            .spawn(move || run_session(context, source, staging, writer, finalizing, result_tx));
        let worker = match spawned {
            Ok(worker) => worker,
            Err(e) => {
                let error = CaptureError::Unknown(format!("failed to spawn capture thread: {}", e));
                self.set_state(CaptureState::Failed(error.clone()));
                return Err(error);
            }
        };

        control.active = Some(ActiveSession {
            id,
            stop,
            result_rx,
            worker,
        });
        drop(control);

        log::info!(
            "recording session {} started: {} Hz, {} ch, {} bit, {} byte buffers",
            id,
            delivered.sample_rate,
            delivered.channels,
            delivered.bits_per_sample,
            buffer_size
        );
        Ok(())
    }

    /// Signal the active session to stop. Transitions: capturing → stopping.
    ///
    /// Returns immediately; the capture thread finishes its current read,
    /// finalizes the WAV file and then fulfills the returned handle.
    pub fn stop_capture(&self) -> Result<PendingRecording, CaptureError> {
        let mut control = self.control.lock();
        let active = control.active.take().ok_or(CaptureError::NotRecording)?;

        {
            let mut state = self.state.lock();
            if state.is_capturing() {
                *state = CaptureState::Stopping;
                drop(state);
                self.notify_state(&CaptureState::Stopping);
            }
        }
        active.stop.store(true, Ordering::Release);
        drop(control);

        log::info!("stop requested for recording session {}", active.id);
        Ok(PendingRecording {
            session_id: active.id,
            result_rx: active.result_rx,
            worker: Some(active.worker),
        })
    }

    /// Stop and block until the recording is finalized.
    pub fn stop_capture_and_wait(&self) -> Result<RecordingResult, CaptureError> {
        self.stop_capture()?.wait()
    }

    /// Remove scratch files left over from sessions that never finished.
    pub fn cleanup_files(&self) -> Result<usize, CaptureError> {
        let control = self.control.lock();
        if control.active.is_some() || self.finalizing.load(Ordering::Acquire) {
            return Err(CaptureError::AlreadyRecording);
        }
        let staging_directory = control
            .config
            .as_ref()
            .map(|c| c.staging_directory.clone())
            .unwrap_or_else(|| CaptureConfiguration::default().staging_directory);
        drop(control);

        cleanup_stale_staging_files(Path::new(&staging_directory))
    }

    fn set_state(&self, new_state: CaptureState) {
        *self.state.lock() = new_state.clone();
        self.notify_state(&new_state);
    }

    fn notify_state(&self, state: &CaptureState) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(state);
        }
    }
}

/// Dropping the recorder stops an active session and waits until it has
/// been finalized.
impl<P: SampleSourceProvider> Drop for AudioRecorder<P> {
    fn drop(&mut self) {
        let Some(active) = self.control.get_mut().active.take() else {
            return;
        };
        log::warn!("recorder dropped while session {} was active; stopping it", active.id);
        active.stop.store(true, Ordering::Release);
        let pending = PendingRecording {
            session_id: active.id,
            result_rx: active.result_rx,
            worker: Some(active.worker),
        };
        if let Err(e) = pending.wait() {
            log::error!("session {} ended with an error during shutdown: {}", active.id, e);
        }
    }
}

/// Round the source's minimum read size down to whole frames (at least one).
fn session_buffer_size(min_buffer: usize, format: &PcmFormat) -> usize {
    let frame = format.block_align().max(1);
    (min_buffer / frame).max(1) * frame
}

/// Body of the capture thread: capture, finalize, clean up, report once.
fn run_session<S: SampleSource>(
    context: SessionContext,
    mut source: S,
    staging: StagingFile,
    writer: StagingWriter,
    finalizing: FinalizingGuard,
    result_tx: Sender<Outcome>,
) {
    let outcome = capture_and_finalize(&context, &mut source, &staging, writer);

    // Scratch data is gone before anyone can observe the outcome.
    drop(staging);

    let terminal = match &outcome {
        Ok(result) => {
            log::info!(
                "recording session {} finished: {} samples, {:.3}s -> {}",
                context.id,
                result.sample_count,
                result.duration_secs,
                result.file_path.display()
            );
            CaptureState::Completed(Box::new(result.clone()))
        }
        Err(e) => {
            log::error!("recording session {} failed: {}", context.id, e);
            if let Some(ref delegate) = context.delegate {
                delegate.on_error(e);
            }
            CaptureState::Failed(e.clone())
        }
    };
    *context.state.lock() = terminal.clone();
    if let Some(ref delegate) = context.delegate {
        delegate.on_state_changed(&terminal);
    }

    drop(finalizing);
    if result_tx.send(outcome).is_err() {
        log::debug!("result of session {} dropped: nobody is waiting", context.id);
    }
}

fn capture_and_finalize<S: SampleSource>(
    context: &SessionContext,
    source: &mut S,
    staging: &StagingFile,
    mut writer: StagingWriter,
) -> Result<RecordingResult, CaptureError> {
    let settings = &context.settings;
    let captured = run_capture_loop(
        source,
        &mut writer,
        settings,
        &context.stop,
        context.delegate.as_deref(),
    );
    let closed = source.close();
    let totals = captured?;
    closed?;

    let staged_bytes = writer.finish()?;
    debug_assert_eq!(staged_bytes, totals.bytes_staged);

    let format = &settings.format;
    let finalized = finalize_wav(staging.path(), &context.config.output_path, format)?;

    let sample_count = staged_bytes / format.block_align().max(1) as u64;
    Ok(RecordingResult {
        file_path: context.config.output_path.clone(),
        sample_rate: format.sample_rate,
        sample_count,
        duration_secs: sample_count as f64 / format.sample_rate.max(1) as f64,
        data_bytes: finalized.data_bytes,
        metering_enabled: settings.metering_enabled(),
        checksum: finalized.checksum,
    })
}
