pub mod audio_models;
pub mod config;
pub mod error;
pub mod metering;
pub mod recording_result;
pub mod state;
