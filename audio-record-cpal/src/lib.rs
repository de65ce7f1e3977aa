//! # audio-record-cpal
//!
//! Cross-platform microphone backend for audio-record, built on cpal.
//!
//! Provides:
//! - `CpalSourceProvider` / `CpalSampleSource`: microphone capture converted to the requested PCM layout
//! - `DeviceEnumerator`: input device listing on the default host
//! - `permissions`: microphone access check and error classification
//!
//! ## Usage
//! ```ignore
//! use audio_record_cpal::CpalSourceProvider;
//! use audio_record_core::{AudioRecorder, RecordOptions};
//!
//! let recorder = AudioRecorder::new(CpalSourceProvider::new());
//! recorder.configure(RecordOptions::default().resolve(storage_root)?)?;
//! recorder.start_capture()?;
//! let result = recorder.stop_capture_and_wait()?;
//! ```

pub mod device_enumerator;
pub mod mic_source;
pub mod permissions;

pub use device_enumerator::DeviceEnumerator;
pub use mic_source::{CpalSampleSource, CpalSourceProvider};
pub use permissions::check_microphone_permission;
