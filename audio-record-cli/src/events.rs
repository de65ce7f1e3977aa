use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use serde_json::json;

use audio_record_core::{MeteringEvent, RecorderEvent};

/// Minimum spacing of metering lines in the log when not printing every event.
const METER_LOG_INTERVAL: Duration = Duration::from_millis(500);

/// Drains recorder events on a background thread.
///
/// With `emit_json` every event becomes a `{"event": …, "data": …}` line on
/// stdout; otherwise state changes and errors are logged and metering is
/// logged at most every [`METER_LOG_INTERVAL`].
pub struct EventPrinter {
    handle: thread::JoinHandle<()>,
}

impl EventPrinter {
    pub fn spawn(events: Receiver<RecorderEvent>, emit_json: bool) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("audio-record-events".into())
            .spawn(move || drain(events, emit_json))
            .context("failed to spawn event thread")?;
        Ok(Self { handle })
    }

    /// Wait until every sender is gone and the backlog is printed.
    pub fn join(self) {
        if self.handle.join().is_err() {
            log::error!("event thread panicked");
        }
    }
}

fn drain(events: Receiver<RecorderEvent>, emit_json: bool) {
    let mut last_meter_log: Option<Instant> = None;
    for event in events {
        if emit_json {
            println!("{}", event_json(&event));
            continue;
        }
        match event {
            RecorderEvent::StateChanged(state) => log::info!("state: {}", state.name()),
            RecorderEvent::Error(error) => log::error!("recording error: {}", error),
            RecorderEvent::Metering(meter) => {
                if last_meter_log.map_or(true, |t| t.elapsed() >= METER_LOG_INTERVAL) {
                    last_meter_log = Some(Instant::now());
                    log::info!(
                        "{:>7.2}s  avg {:>7.1} dB  peak {:>7.1} dB",
                        meter.position_secs,
                        meter.average_db,
                        meter.peak_db
                    );
                }
            }
        }
    }
}

fn event_json(event: &RecorderEvent) -> serde_json::Value {
    match event {
        RecorderEvent::StateChanged(state) => json!({ "event": "stateChanged", "data": state.name() }),
        RecorderEvent::Metering(meter) => json!({ "event": MeteringEvent::NAME, "data": meter }),
        RecorderEvent::Error(error) => json!({ "event": "error", "data": error.to_string() }),
    }
}
