use std::io::{self, BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use audio_record_core::{AudioInputSource, AudioRecorder, ChannelDelegate, RecordOptions};
use audio_record_cpal::{check_microphone_permission, CpalSourceProvider, DeviceEnumerator};

use crate::events::EventPrinter;
use crate::RecordArgs;

/// Backlog of undelivered recorder events before new ones are dropped.
const EVENT_BACKLOG: usize = 256;

pub fn default_storage_root() -> PathBuf {
    dirs_next::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("audio-record")
}

/// Merge the JSON options with individual flags; flags win.
fn record_options(args: &RecordArgs) -> Result<RecordOptions> {
    let mut options = match args.options.as_deref() {
        Some(json) => RecordOptions::from_json(json)?,
        None => RecordOptions::default(),
    };
    if let Some(rate) = args.sample_rate {
        options.sample_rate = Some(rate);
    }
    if let Some(channels) = args.channels {
        options.channels = Some(channels);
    }
    if let Some(bits) = args.bits_per_sample {
        options.bits_per_sample = Some(bits);
    }
    if let Some(code) = args.audio_source {
        options.audio_source = Some(AudioInputSource::try_from(code)?);
    }
    if let Some(ref wav_file) = args.wav_file {
        options.wav_file = Some(wav_file.clone());
    }
    if let Some(ref device) = args.device {
        options.device_id = Some(device.clone());
    }
    Ok(options)
}

/// What ends a `record` session.
#[derive(Debug, Clone, Copy, PartialEq)]
enum StopTrigger {
    Timer(Duration),
    Enter,
}

/// `--seconds` wins; without it the session waits for Enter, which needs an
/// interactive stdin. A piped or closed stdin would hit EOF at once and stop
/// the recording before any audio arrived.
fn stop_trigger(seconds: Option<f64>, stdin_is_terminal: bool) -> Result<StopTrigger> {
    match seconds {
        Some(seconds) => Duration::try_from_secs_f64(seconds)
            .ok()
            .filter(|duration| !duration.is_zero())
            .map(StopTrigger::Timer)
            .ok_or_else(|| anyhow!("--seconds must be a positive number, got {}", seconds)),
        None if stdin_is_terminal => Ok(StopTrigger::Enter),
        None => Err(anyhow!("stdin is not a terminal; pass --seconds to bound the recording")),
    }
}

pub fn record(storage_root: &Path, args: RecordArgs) -> Result<()> {
    let config = record_options(&args)?.resolve(storage_root)?;
    let trigger = stop_trigger(args.seconds, io::stdin().is_terminal())?;

    let mut recorder = AudioRecorder::new(CpalSourceProvider::new());
    if !recorder.is_available() {
        return Err(anyhow!("no microphone available"));
    }
    let (delegate, events) = ChannelDelegate::bounded(EVENT_BACKLOG);
    recorder.set_delegate(delegate.clone());
    let printer = EventPrinter::spawn(events, args.events)?;

    recorder.configure(config)?;
    recorder.start_capture()?;

    let waited = match trigger {
        StopTrigger::Timer(duration) => {
            log::info!("recording for {:.1}s", duration.as_secs_f64());
            thread::sleep(duration);
            Ok(())
        }
        StopTrigger::Enter => {
            eprintln!("Recording... press Enter to stop.");
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .map(|_| ())
                .context("failed to read stdin")
        }
    };
    if let Err(ref e) = waited {
        log::error!("{:#}; stopping", e);
    }

    let outcome = recorder.stop_capture_and_wait();

    // Closing the last sender ends the printer.
    drop(recorder);
    if delegate.dropped() > 0 {
        log::warn!("{} recorder events were dropped", delegate.dropped());
    }
    drop(delegate);
    printer.join();

    let result = outcome?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    waited
}

pub fn list_devices() -> Result<()> {
    let devices = DeviceEnumerator::new().list_capture_devices()?;
    println!("{}", serde_json::to_string_pretty(&devices)?);
    Ok(())
}

pub fn check() -> Result<()> {
    let available = check_microphone_permission()?;
    println!("{}", serde_json::json!({ "available": available }));
    Ok(())
}

pub fn cleanup() -> Result<()> {
    let recorder = AudioRecorder::new(CpalSourceProvider::new());
    let removed = recorder.cleanup_files()?;
    log::info!("removed {} stale scratch files", removed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RecordArgs {
        RecordArgs {
            options: None,
            sample_rate: None,
            channels: None,
            bits_per_sample: None,
            audio_source: None,
            wav_file: None,
            device: None,
            seconds: None,
            events: false,
        }
    }

    #[test]
    fn flags_override_json_options() {
        let mut args = args();
        args.options = Some(r#"{"sampleRate":16000,"channels":2,"wavFile":"a.wav"}"#.into());
        args.channels = Some(1);
        args.audio_source = Some(1);

        let options = record_options(&args).unwrap();
        assert_eq!(options.sample_rate, Some(16000));
        assert_eq!(options.channels, Some(1));
        assert_eq!(options.audio_source, Some(AudioInputSource::Mic));
        assert_eq!(options.wav_file.as_deref(), Some("a.wav"));
    }

    #[test]
    fn bad_audio_source_flag_is_rejected() {
        let mut args = args();
        args.audio_source = Some(42);
        assert!(record_options(&args).is_err());
    }

    #[test]
    fn resolved_path_lands_under_storage_root() {
        let mut args = args();
        args.wav_file = Some("takes/one.wav".into());
        let config = record_options(&args).unwrap().resolve(Path::new("/srv/rec")).unwrap();
        assert_eq!(config.output_path, PathBuf::from("/srv/rec/takes/one.wav"));
    }

    #[test]
    fn seconds_bound_the_session_even_without_a_terminal() {
        assert_eq!(
            stop_trigger(Some(1.5), false).unwrap(),
            StopTrigger::Timer(Duration::from_millis(1500))
        );
    }

    #[test]
    fn enter_is_only_offered_on_a_terminal() {
        assert_eq!(stop_trigger(None, true).unwrap(), StopTrigger::Enter);
        assert!(stop_trigger(None, false).is_err());
    }

    #[test]
    fn non_positive_seconds_are_rejected() {
        for seconds in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            assert!(stop_trigger(Some(seconds), true).is_err(), "{}", seconds);
        }
    }
}
