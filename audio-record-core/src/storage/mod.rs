pub mod staging_writer;
pub mod wav_finalizer;
