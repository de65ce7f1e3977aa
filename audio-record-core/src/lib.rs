//! # audio-record-core
//!
//! Platform-agnostic PCM recording core.
//!
//! Pulls raw PCM buffers from a [`SampleSource`], drops the start-up click,
//! normalizes 16-bit samples to little-endian, meters mono 16-bit audio,
//! stages everything in a scratch file and finally wraps it in a canonical
//! 44-byte-header WAV file. Platform backends implement
//! [`SampleSourceProvider`] and plug into the generic [`AudioRecorder`].
//!
//! ## Architecture
//!
//! ```text
//! audio-record-core (this crate)
//! ├── traits/       ← SampleSource, SampleSourceProvider, CaptureDelegate
//! ├── models/       ← CaptureError, CaptureState, CaptureConfiguration, RecordOptions, etc.
//! ├── processing/   ← endian normalizer, level meter, RingBuffer, FormatConverter, WAV header
//! ├── session/      ← AudioRecorder (control path) + capture loop (capture thread)
//! └── storage/      ← staging file, WAV finalizer
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioInputSource, AudioSource, PcmFormat};
pub use models::config::{CaptureConfiguration, CapturePolicy, RecordOptions};
pub use models::error::CaptureError;
pub use models::metering::{MeteringEvent, MeteringSample};
pub use models::recording_result::RecordingResult;
pub use models::state::CaptureState;
pub use processing::convert::FormatConverter;
pub use processing::endian::ByteOrder;
pub use processing::ring_buffer::RingBuffer;
pub use processing::wav_format::WavHeader;
pub use session::recorder::{AudioRecorder, PendingRecording};
pub use storage::wav_finalizer::{finalize_wav, FinalizedWav};
pub use traits::capture_delegate::{CaptureDelegate, ChannelDelegate, RecorderEvent};
pub use traits::sample_source::{OpenRequest, SampleSource, SampleSourceProvider};
