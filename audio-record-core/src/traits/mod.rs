pub mod capture_delegate;
pub mod sample_source;
