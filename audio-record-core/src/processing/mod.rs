pub mod convert;
pub mod endian;
pub mod meter;
pub mod ring_buffer;
pub mod wav_format;
