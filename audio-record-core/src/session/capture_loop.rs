use std::sync::atomic::{AtomicBool, Ordering};

use crate::models::audio_models::PcmFormat;
use crate::models::error::CaptureError;
use crate::models::metering::MeteringEvent;
use crate::processing::endian::normalize_to_little_endian;
use crate::processing::meter;
use crate::storage::staging_writer::StagingWriter;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::sample_source::SampleSource;

/// Fixed parameters of one capture loop run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LoopSettings {
    /// Bytes requested per pull.
    pub buffer_size: usize,
    /// Non-empty pulls discarded before anything is staged.
    pub warmup_buffers: u32,
    /// Format actually delivered by the source.
    pub format: PcmFormat,
}

impl LoopSettings {
    pub fn metering_enabled(&self) -> bool {
        self.format.metering_supported()
    }
}

/// Counters accumulated while capturing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LoopTotals {
    pub bytes_staged: u64,
    pub buffers_staged: u64,
    pub buffers_discarded: u64,
    pub metering_events: u64,
}

/// Pull buffers from `source` into `staging` until `stop` is set.
///
/// Per non-empty pull beyond the warm-up: count, normalize to little-endian,
/// meter (16-bit mono only), append. Zero-length pulls have no effect. The
/// stop flag is checked once per iteration, so exit latency is bounded by a
/// single `read`.
pub(crate) fn run_capture_loop<S: SampleSource + ?Sized>(
    source: &mut S,
    staging: &mut StagingWriter,
    settings: &LoopSettings,
    stop: &AtomicBool,
    delegate: Option<&dyn CaptureDelegate>,
) -> Result<LoopTotals, CaptureError> {
    let mut buffer = vec![0u8; settings.buffer_size.max(1)];
    let mut totals = LoopTotals::default();
    let mut pulls: u64 = 0;

    let byte_order = source.byte_order();
    let normalize = settings.format.bits_per_sample == 16;
    let metering = settings.metering_enabled();
    let bytes_per_sample = settings.format.bytes_per_sample().max(1) as f64;
    let sample_rate = settings.format.sample_rate.max(1) as f64;

    while !stop.load(Ordering::Acquire) {
        let read = source.read(&mut buffer)?.min(buffer.len());
        if read == 0 {
            continue;
        }

        pulls += 1;
        if pulls <= settings.warmup_buffers as u64 {
            totals.buffers_discarded += 1;
            log::trace!("discarding warm-up buffer {} ({} bytes)", pulls, read);
            continue;
        }

        let chunk = &mut buffer[..read];
        totals.bytes_staged += read as u64;

        if normalize {
            normalize_to_little_endian(chunk, byte_order);
        }

        if metering {
            if let Some(delegate) = delegate {
                let position = totals.bytes_staged as f64 / bytes_per_sample / sample_rate;
                delegate.on_metering(&MeteringEvent::new(meter::measure(chunk), position));
                totals.metering_events += 1;
            }
        }

        staging.write(chunk)?;
        totals.buffers_staged += 1;
    }

    log::debug!(
        "capture loop stopped: {} bytes in {} buffers, {} warm-up buffers dropped",
        totals.bytes_staged,
        totals.buffers_staged,
        totals.buffers_discarded
    );
    Ok(totals)
}
